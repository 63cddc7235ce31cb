

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::models::{KnowledgeEntry, RetrievalResult};
use super::options::RetrieveOptions;
use super::scoring::{cosine_with_norms, magnitude, term_frequency, tokenize, TermFrequency};
use super::source::{ensure_unique_ids, BundledSource, JsonlSource, KnowledgeSource, StaticSource};
use crate::core::config::RagConfig;
use crate::core::error::Result;


struct IndexedEntry {
    entry: Arc<KnowledgeEntry>,
    terms: TermFrequency,
    norm: f64,
}

impl IndexedEntry {
    fn new(entry: KnowledgeEntry) -> Self {
        let terms = term_frequency(tokenize(&entry.searchable_text()));
        let norm = magnitude(&terms);
        Self {
            entry: Arc::new(entry),
            terms,
            norm,
        }
    }
}


/// In-memory lexical index over a fixed knowledge base.
///
/// The dataset is loaded at most once. `initialize` is single-flight: callers
/// racing on a cold index all await the same load. A failed load leaves the
/// index empty and is retried by the next call; retrieval never errors.
pub struct KnowledgeIndex {
    source: Arc<dyn KnowledgeSource>,
    entries: OnceCell<Vec<IndexedEntry>>,
}

impl KnowledgeIndex {

    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self {
            source,
            entries: OnceCell::new(),
        }
    }


    pub fn bundled() -> Self {
        Self::new(Arc::new(BundledSource))
    }


    pub fn with_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self::new(Arc::new(StaticSource::new(entries)))
    }


    pub fn from_config(config: &RagConfig) -> Self {
        match &config.knowledge_path {
            Some(path) => Self::new(Arc::new(JsonlSource::new(path.clone()))),
            None => Self::bundled(),
        }
    }

    async fn build(&self) -> Result<Vec<IndexedEntry>> {
        let entries = self.source.load().await?;
        ensure_unique_ids(&entries)?;

        let indexed: Vec<IndexedEntry> = entries.into_iter().map(IndexedEntry::new).collect();
        info!(
            "📚 Knowledge index ready: {} entries from {}",
            indexed.len(),
            self.source.name()
        );
        Ok(indexed)
    }


    pub async fn try_initialize(&self) -> Result<usize> {
        let entries = self.entries.get_or_try_init(|| self.build()).await?;
        Ok(entries.len())
    }

    /// Loads the dataset if needed and returns the entry count. Idempotent;
    /// a load failure is logged and reported as 0 entries.
    pub async fn initialize(&self) -> usize {
        self.loaded().await.len()
    }

    async fn loaded(&self) -> &[IndexedEntry] {
        match self.entries.get_or_try_init(|| self.build()).await {
            Ok(entries) => entries.as_slice(),
            Err(e) => {
                warn!(
                    "Knowledge base '{}' failed to load: {}, continuing without context",
                    self.source.name(),
                    e
                );
                &[]
            }
        }
    }


    pub fn is_ready(&self) -> bool {
        self.entries.initialized()
    }


    pub async fn len(&self) -> usize {
        self.loaded().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }


    pub async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Vec<RetrievalResult> {
        let entries = self.loaded().await;

        let query_terms = tokenize(query);
        if query_terms.is_empty() || options.top_k == 0 {
            debug!("Nothing to retrieve for query '{}'", crate::utils::preview(query, 40));
            return Vec::new();
        }

        let query_freq = term_frequency(&query_terms);
        let query_norm = magnitude(&query_freq);
        let min_score = options.effective_min_score();
        let audience = options.audience_filter();
        let tags = options.tag_filter();

        let mut results: Vec<RetrievalResult> = entries
            .iter()
            .filter(|indexed| audience.is_none_or(|a| indexed.entry.has_any_audience(a)))
            .filter(|indexed| tags.is_none_or(|t| indexed.entry.has_any_tag(t)))
            .filter_map(|indexed| {
                let score = cosine_with_norms(&query_freq, query_norm, &indexed.terms, indexed.norm);
                if score < min_score {
                    return None;
                }
                Some(RetrievalResult {
                    entry: Arc::clone(&indexed.entry),
                    relevance_score: score,
                    matched_terms: matched_terms(&query_terms, &indexed.terms),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        results.truncate(options.top_k);

        debug!(
            "Retrieved {} entries for '{}' (min_score={}, top_k={})",
            results.len(),
            crate::utils::preview(query, 40),
            min_score,
            options.top_k
        );
        results
    }


    pub async fn get_by_id(&self, id: &str) -> Option<Arc<KnowledgeEntry>> {
        self.loaded()
            .await
            .iter()
            .find(|indexed| indexed.entry.id == id)
            .map(|indexed| Arc::clone(&indexed.entry))
    }

    /// Every entry sharing at least one tag, in dataset order. No scoring.
    pub async fn search_by_tags(&self, tags: &[String]) -> Vec<Arc<KnowledgeEntry>> {
        self.loaded()
            .await
            .iter()
            .filter(|indexed| indexed.entry.has_any_tag(tags))
            .map(|indexed| Arc::clone(&indexed.entry))
            .collect()
    }


    pub async fn all_tags(&self) -> Vec<String> {
        self.loaded()
            .await
            .iter()
            .flat_map(|indexed| indexed.entry.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }


    pub async fn suggested_questions(&self) -> Vec<String> {
        self.loaded()
            .await
            .iter()
            .map(|indexed| indexed.entry.question.clone())
            .collect()
    }
}

fn matched_terms(query_terms: &[String], document: &TermFrequency) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    for term in query_terms {
        if document.contains_key(term) && seen.insert(term.as_str()) {
            matched.push(term.clone());
        }
    }
    matched
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("source", &self.source.name())
            .field("entries", &self.entries.get().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RagError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
        fail_first: usize,
        entries: Vec<KnowledgeEntry>,
    }

    #[async_trait]
    impl KnowledgeSource for CountingSource {
        async fn load(&self) -> Result<Vec<KnowledgeEntry>> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if attempt < self.fail_first {
                return Err(RagError::Validation("storage offline".into()));
            }
            Ok(self.entries.clone())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn sample_entries() -> Vec<KnowledgeEntry> {
        vec![
            KnowledgeEntry::new("vat-1", "When must I register for VAT?")
                .with_answer("VAT registration applies above the turnover threshold.")
                .with_audience(["freelancer", "sme_owner"])
                .with_tags(["vat", "firs"]),
            KnowledgeEntry::new("pen-1", "How do I register with PenCom?")
                .with_answer("Employers with five or more staff register for pension.")
                .with_audience(["hr_ops"])
                .with_tags(["pension", "pencom"]),
        ]
    }

    #[tokio::test]
    async fn test_initialize_is_single_flight() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail_first: 0,
            entries: sample_entries(),
        });
        let index = KnowledgeIndex::new(source.clone());
        assert!(!index.is_ready());

        let (a, b, c) = tokio::join!(index.initialize(), index.initialize(), index.initialize());
        assert_eq!((a, b, c), (2, 2, 2));
        assert_eq!(index.initialize().await, 2);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(index.is_ready());
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_empty_and_retries() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail_first: 1,
            entries: sample_entries(),
        });
        let index = KnowledgeIndex::new(source.clone());

        let results = index.retrieve("register for VAT", &RetrieveOptions::default()).await;
        assert!(results.is_empty());
        assert!(!index.is_ready());

        assert_eq!(index.initialize().await, 2);
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert!(!index.retrieve("register for VAT", &RetrieveOptions::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_try_initialize_surfaces_error() {
        let index = KnowledgeIndex::with_entries(vec![
            KnowledgeEntry::new("same", "one"),
            KnowledgeEntry::new("same", "two"),
        ]);
        assert!(matches!(index.try_initialize().await, Err(RagError::DuplicateId(_))));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let index = KnowledgeIndex::with_entries(vec![
            KnowledgeEntry::new("zeta", "annual returns filing"),
            KnowledgeEntry::new("alpha", "annual returns filing"),
            KnowledgeEntry::new("mid", "annual returns filing"),
        ]);

        let results = index
            .retrieve("annual returns", &RetrieveOptions::default().top_k(10))
            .await;
        let ids: Vec<&str> = results.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_matched_terms_are_deduplicated() {
        let index = KnowledgeIndex::with_entries(sample_entries());
        let results = index
            .retrieve("vat VAT register vat banana", &RetrieveOptions::default())
            .await;

        assert_eq!(results[0].entry.id, "vat-1");
        assert_eq!(results[0].matched_terms, vec!["vat", "register"]);
    }

    #[tokio::test]
    async fn test_zero_top_k_and_empty_query() {
        let index = KnowledgeIndex::with_entries(sample_entries());
        assert!(index.retrieve("vat", &RetrieveOptions::default().top_k(0)).await.is_empty());
        assert!(index.retrieve("", &RetrieveOptions::default().min_score(0.0)).await.is_empty());
        assert!(index.retrieve("?? a an", &RetrieveOptions::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_filters_are_hard_gates() {
        let index = KnowledgeIndex::with_entries(sample_entries());

        let results = index
            .retrieve("register", &RetrieveOptions::default().min_score(0.0).audience(["hr_ops"]))
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.id, "pen-1");

        let results = index
            .retrieve(
                "register",
                &RetrieveOptions::default().min_score(0.0).audience(["hr_ops"]).tags(["vat"]),
            )
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_filters_match_nothing() {
        let index = KnowledgeIndex::with_entries(sample_entries());
        let base = RetrieveOptions::default().min_score(0.0);

        assert_eq!(index.retrieve("register", &base).await.len(), 2);
        assert!(index
            .retrieve("register", &base.clone().audience(Vec::<String>::new()))
            .await
            .is_empty());
        assert!(index
            .retrieve("register", &base.tags(Vec::<String>::new()))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_secondary_lookups() {
        let index = KnowledgeIndex::with_entries(sample_entries());

        assert_eq!(index.get_by_id("pen-1").await.unwrap().question, "How do I register with PenCom?");
        assert!(index.get_by_id("missing").await.is_none());

        let found = index.search_by_tags(&["firs".to_string(), "pencom".to_string()]).await;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "vat-1");
        assert!(index.search_by_tags(&[]).await.is_empty());

        assert_eq!(index.all_tags().await, vec!["firs", "pencom", "pension", "vat"]);
        assert_eq!(index.suggested_questions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_from_config_uses_jsonl_path() {
        let config = RagConfig {
            knowledge_path: Some("/nonexistent/kb.jsonl".into()),
            ..Default::default()
        };
        let index = KnowledgeIndex::from_config(&config);
        assert_eq!(index.initialize().await, 0);
        assert!(index.try_initialize().await.is_err());

        let index = KnowledgeIndex::from_config(&RagConfig::default());
        assert_eq!(index.initialize().await, 7);
    }
}
