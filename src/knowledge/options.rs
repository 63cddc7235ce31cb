

use serde::{Deserialize, Serialize};

use crate::core::config::RagConfig;
use crate::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrieveOptions {
    pub top_k: usize,
    /// Inclusive similarity floor.
    pub min_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            audience: None,
            tags: None,
        }
    }
}

impl RetrieveOptions {

    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            top_k: config.default_top_k,
            min_score: config.default_min_score,
            ..Default::default()
        }
    }

    /// What the chat feature asks for before calling the LLM.
    pub fn for_chat() -> Self {
        Self {
            top_k: 2,
            min_score: 0.15,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Negative counts mean "return nothing".
    #[must_use]
    pub fn top_k_signed(self, top_k: i64) -> Self {
        self.top_k(usize::try_from(top_k).unwrap_or(0))
    }

    #[must_use]
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    #[must_use]
    pub fn audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = Some(audience.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }


    pub(crate) fn effective_min_score(&self) -> f64 {
        if self.min_score.is_finite() {
            self.min_score
        } else {
            DEFAULT_MIN_SCORE
        }
    }

    /// A present but empty filter matches nothing.
    pub(crate) fn audience_filter(&self) -> Option<&[String]> {
        self.audience.as_deref()
    }

    pub(crate) fn tag_filter(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }
}
