

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::models::KnowledgeEntry;
use crate::core::error::{RagError, Result};


const BUNDLED_KNOWLEDGE: &str = include_str!("../../data/compliance_kb.jsonl");


#[async_trait]
pub trait KnowledgeSource: Send + Sync {

    async fn load(&self) -> Result<Vec<KnowledgeEntry>>;


    fn name(&self) -> &str;
}


/// Parses one entry per non-blank line and rejects duplicate ids.
pub fn parse_jsonl(raw: &str) -> Result<Vec<KnowledgeEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: KnowledgeEntry =
            serde_json::from_str(line).map_err(|e| RagError::json(idx + 1, e))?;
        entries.push(entry);
    }
    ensure_unique_ids(&entries)?;
    Ok(entries)
}


pub fn ensure_unique_ids(entries: &[KnowledgeEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(RagError::DuplicateId(entry.id.clone()));
        }
    }
    Ok(())
}


#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSource;

#[async_trait]
impl KnowledgeSource for BundledSource {
    async fn load(&self) -> Result<Vec<KnowledgeEntry>> {
        parse_jsonl(BUNDLED_KNOWLEDGE)
    }

    fn name(&self) -> &str {
        "bundled"
    }
}


#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
    label: String,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("jsonl:{}", path.display());
        Self { path, label }
    }
}

#[async_trait]
impl KnowledgeSource for JsonlSource {
    async fn load(&self) -> Result<Vec<KnowledgeEntry>> {
        debug!("Reading knowledge base from {}", self.path.display());
        let raw = tokio::fs::read_to_string(&self.path).await?;
        parse_jsonl(&raw)
    }

    fn name(&self) -> &str {
        &self.label
    }
}


/// Dataset handed in directly, mostly for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: Vec<KnowledgeEntry>,
}

impl StaticSource {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl KnowledgeSource for StaticSource {
    async fn load(&self) -> Result<Vec<KnowledgeEntry>> {
        ensure_unique_ids(&self.entries)?;
        Ok(self.entries.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
