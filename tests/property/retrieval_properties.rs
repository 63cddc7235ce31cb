use lexrag::{similarity, tokenize, KnowledgeIndex, RetrieveOptions};
use proptest::prelude::*;

const VOCABULARY: &[&str] = &[
    "register", "business", "name", "cac", "tax", "vat", "paye", "pension", "pencom",
    "ndpa", "data", "protection", "freelancer", "employer", "threshold", "returns",
    "nigeria", "tin", "banana", "annual", "penalty", "the", "how", "what",
];

fn query_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..8).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn results_respect_threshold_top_k_and_order(
        query in query_strategy(),
        top_k in 0usize..10,
        min_score in 0.0f64..0.6,
    ) {
        let index = KnowledgeIndex::bundled();
        let options = RetrieveOptions::default().top_k(top_k).min_score(min_score);
        let results = tokio_test::block_on(index.retrieve(&query, &options));

        prop_assert!(results.len() <= top_k);
        for result in &results {
            prop_assert!(result.relevance_score >= min_score);
            prop_assert!(result.relevance_score <= 1.0);
        }
        for pair in results.windows(2) {
            prop_assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[test]
    fn retrieval_is_deterministic(query in query_strategy()) {
        let index = KnowledgeIndex::bundled();
        let options = RetrieveOptions::default().top_k(7).min_score(0.0);
        let first = tokio_test::block_on(index.retrieve(&query, &options));
        let second = tokio_test::block_on(index.retrieve(&query, &options));

        let first: Vec<(String, f64)> = first.iter().map(|r| (r.entry.id.clone(), r.relevance_score)).collect();
        let second: Vec<(String, f64)> = second.iter().map(|r| (r.entry.id.clone(), r.relevance_score)).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn matched_terms_come_from_query(query in query_strategy()) {
        let index = KnowledgeIndex::bundled();
        let results = tokio_test::block_on(index.retrieve(&query, &RetrieveOptions::default().top_k(7)));
        let query_terms = tokenize(&query);

        for result in &results {
            let mut seen = std::collections::HashSet::new();
            for term in &result.matched_terms {
                prop_assert!(query_terms.contains(term));
                prop_assert!(seen.insert(term.clone()), "duplicate matched term {}", term);
            }
        }
    }

    #[test]
    fn audience_filter_never_leaks(query in query_strategy(), audience in prop::sample::select(vec!["freelancer", "sme_owner", "hr_ops", "finance_ops"])) {
        let index = KnowledgeIndex::bundled();
        let options = RetrieveOptions::default().top_k(7).min_score(0.0).audience([audience]);
        let results = tokio_test::block_on(index.retrieve(&query, &options));

        for result in &results {
            prop_assert!(result.entry.audience.iter().any(|a| a == audience));
        }
    }

    #[test]
    fn similarity_is_bounded_and_symmetric(a in "[a-z ]{0,60}", b in "[a-z ]{0,60}") {
        let ab = similarity(&a, &b);
        let ba = similarity(&b, &a);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn self_similarity_is_one(text in "[a-z]{3,10}( [a-z]{1,10}){0,8}") {
        prop_assert!((similarity(&text, &text) - 1.0).abs() < 1e-9);
    }
}
