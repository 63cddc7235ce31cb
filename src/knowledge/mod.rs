

pub mod context;
pub mod index;
pub mod models;
pub mod options;
pub mod scoring;
pub mod source;

pub use context::{augment_system_prompt, format_context, format_context_with_heading};
pub use index::KnowledgeIndex;
pub use models::{Citation, KnowledgeEntry, RetrievalResult};
pub use options::RetrieveOptions;
pub use scoring::{similarity, term_frequency, tokenize};
pub use source::{BundledSource, JsonlSource, KnowledgeSource, StaticSource};
