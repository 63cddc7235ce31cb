

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;


pub const MIN_TERM_CHARS: usize = 3;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
}


pub type TermFrequency = HashMap<String, usize>;


/// Lower-cases, blanks out punctuation, splits on whitespace and drops
/// terms shorter than [`MIN_TERM_CHARS`].
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, " ")
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_string)
        .collect()
}


pub fn term_frequency<I, S>(terms: I) -> TermFrequency
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut freq = TermFrequency::new();
    for term in terms {
        *freq.entry(term.into()).or_insert(0) += 1;
    }
    freq
}


pub fn magnitude(freq: &TermFrequency) -> f64 {
    freq.values()
        .map(|&c| (c * c) as f64)
        .sum::<f64>()
        .sqrt()
}

/// Cosine of two term-frequency vectors. Terms missing from either side
/// contribute nothing to the dot product, so iterating the smaller map is
/// enough.
pub fn cosine(a: &TermFrequency, b: &TermFrequency) -> f64 {
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    cosine_with_norms(a, norm_a, b, norm_b)
}

pub(crate) fn cosine_with_norms(a: &TermFrequency, norm_a: f64, b: &TermFrequency, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: usize = small
        .iter()
        .filter_map(|(term, &count)| large.get(term).map(|&other| count * other))
        .sum();

    (dot as f64 / (norm_a * norm_b)).min(1.0)
}


pub fn similarity(query: &str, document: &str) -> f64 {
    let q = term_frequency(tokenize(query));
    let d = term_frequency(tokenize(document));
    cosine(&q, &d)
}
