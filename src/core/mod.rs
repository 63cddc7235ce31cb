

pub mod config;
pub mod error;

pub use config::RagConfig;
pub use error::{RagError, Result};
