

pub mod core;
pub mod knowledge;
pub mod mcp;
pub mod utils;

pub use crate::core::config::RagConfig;
pub use crate::core::error::{RagError, Result};
pub use knowledge::{
    augment_system_prompt, format_context, similarity, tokenize, KnowledgeEntry, KnowledgeIndex,
    RetrievalResult, RetrieveOptions,
};


pub const DEFAULT_TOP_K: usize = 3;


pub const DEFAULT_MIN_SCORE: f64 = 0.1;
