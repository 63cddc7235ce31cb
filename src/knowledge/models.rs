

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}


/// One compliance fact sheet. Immutable once loaded into an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub audience: Vec<String>,
    #[serde(default)]
    pub jurisdiction: String,
    pub question: String,
    #[serde(rename = "answer_markdown", alias = "answer_body", default)]
    pub answer_body: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub compliance_checklist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_cycle_days: Option<u32>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeEntry {

    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: String::new(),
            audience: Vec::new(),
            jurisdiction: String::new(),
            question: question.into(),
            answer_body: String::new(),
            key_points: Vec::new(),
            compliance_checklist: Vec::new(),
            effective_date: None,
            review_cycle_days: None,
            citations: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer_body = answer.into();
        self
    }

    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_points = points.into_iter().map(Into::into).collect();
        self
    }

    /// Question, answer, key points and tags joined into one string.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(2 + self.key_points.len() + self.tags.len());
        parts.push(&self.question);
        parts.push(&self.answer_body);
        parts.extend(self.key_points.iter().map(String::as_str));
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ")
    }

    pub fn has_any_audience(&self, wanted: &[String]) -> bool {
        self.audience.iter().any(|a| wanted.contains(a))
    }

    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        self.tags.iter().any(|t| wanted.contains(t))
    }


    pub fn review_due(&self) -> Option<NaiveDate> {
        let effective = self.effective_date?;
        let cycle = self.review_cycle_days?;
        effective.checked_add_days(Days::new(u64::from(cycle)))
    }

    /// Informational only; retrieval never filters on staleness.
    pub fn is_due_for_review(&self, today: NaiveDate) -> bool {
        self.review_due().is_some_and(|due| due <= today)
    }
}


#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub entry: Arc<KnowledgeEntry>,
    pub relevance_score: f64,
    pub matched_terms: Vec<String>,
}
