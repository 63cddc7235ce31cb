

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K};


pub const ENV_PREFIX: &str = "LEXRAG";

/// Points at a TOML/JSON/YAML file layered under the `LEXRAG_*` variables.
pub const CONFIG_FILE_VAR: &str = "LEXRAG_CONFIG";


pub const DEFAULT_CONTEXT_HEADING: &str = "Relevant Nigerian Compliance Information";


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// JSONL file to load instead of the bundled knowledge base.
    pub knowledge_path: Option<PathBuf>,
    pub default_top_k: usize,
    pub default_min_score: f64,
    pub context_heading: String,
}

impl RagConfig {

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("LEXRAG_KNOWLEDGE_PATH") {
            if !path.trim().is_empty() {
                config.knowledge_path = Some(PathBuf::from(path));
            }
        }
        if let Some(top_k) = std::env::var("LEXRAG_DEFAULT_TOP_K")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.default_top_k = top_k;
        }
        if let Some(min_score) = std::env::var("LEXRAG_DEFAULT_MIN_SCORE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.default_min_score = min_score;
        }
        if let Ok(heading) = std::env::var("LEXRAG_CONTEXT_HEADING") {
            config.context_heading = heading;
        }

        config.normalized()
    }

    /// Layers an optional config file (format from its extension) under
    /// `LEXRAG_*` environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        Ok(config.normalized())
    }


    /// `load` when `LEXRAG_CONFIG` names a file, `from_env` otherwise.
    pub fn from_env_or_file() -> Result<Self> {
        match std::env::var_os(CONFIG_FILE_VAR) {
            Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
            _ => Ok(Self::from_env()),
        }
    }


    pub fn normalized(mut self) -> Self {
        if self
            .knowledge_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.knowledge_path = None;
        }
        self.default_min_score = if self.default_min_score.is_finite() {
            self.default_min_score.clamp(0.0, 1.0)
        } else {
            DEFAULT_MIN_SCORE
        };
        if self.context_heading.trim().is_empty() {
            self.context_heading = DEFAULT_CONTEXT_HEADING.to_string();
        }
        self
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_path: None,
            default_top_k: DEFAULT_TOP_K,
            default_min_score: DEFAULT_MIN_SCORE,
            context_heading: DEFAULT_CONTEXT_HEADING.to_string(),
        }
    }
}
