//! Property-based tests for the heuristic scorer, aggregation and response validation.

use proptest::prelude::*;

use revcheck_lib::models::{AnalysisResult, Review, ReviewSource, MAX_REVIEW_CHARS};
use revcheck_lib::services::detection::aggregation::DEFAULT_TRUST_PENALTY;
use revcheck_lib::services::detection::{
    fake_percentage, parse_analysis, summarize_verdicts, trust_score, HeuristicScorer,
};

fn corpus_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z!?. ]{1,300}", 0..12)
}

fn to_reviews(texts: &[String]) -> Vec<Review> {
    texts
        .iter()
        .filter_map(|t| Review::new(t, ReviewSource::Provided))
        .collect()
}

// --- Heuristic scorer properties ---

proptest! {
    #[test]
    fn heuristic_verdict_per_review_in_order(texts in corpus_strategy()) {
        let reviews = to_reviews(&texts);
        let result = HeuristicScorer::default().score(&reviews);
        let verdicts = result.reviews().unwrap();

        prop_assert_eq!(verdicts.len(), reviews.len());
        for (idx, verdict) in verdicts.iter().enumerate() {
            prop_assert_eq!(verdict.review_number, idx + 1);
            prop_assert!((30..=95).contains(&verdict.confidence));
            prop_assert!(!verdict.reason.is_empty());
        }
    }

    #[test]
    fn heuristic_scoring_is_deterministic(texts in corpus_strategy()) {
        let reviews = to_reviews(&texts);
        let scorer = HeuristicScorer::default();
        prop_assert_eq!(scorer.score(&reviews), scorer.score(&reviews));
    }

    #[test]
    fn heuristic_summary_counts_are_consistent(texts in corpus_strategy()) {
        let reviews = to_reviews(&texts);
        let AnalysisResult::Structured { reviews: verdicts, summary } =
            HeuristicScorer::default().score(&reviews)
        else {
            panic!("heuristic path must be structured");
        };

        let fakes = verdicts.iter().filter(|v| v.verdict.is_fake()).count();
        prop_assert_eq!(summary.total_reviews, verdicts.len());
        prop_assert_eq!(summary.fake_count, fakes);
        prop_assert_eq!(summary.fake_count + summary.genuine_count, summary.total_reviews);
        if summary.total_reviews == 0 {
            prop_assert_eq!(summary.trust_score, 50);
        } else {
            prop_assert_eq!(summary.fake_percentage, fake_percentage(fakes, verdicts.len()));
            prop_assert_eq!(
                summary.trust_score,
                trust_score(summary.fake_percentage, DEFAULT_TRUST_PENALTY)
            );
        }
    }

    #[test]
    fn review_text_is_bounded(text in "[a-z ]{0,1200}") {
        if let Some(review) = Review::new(&text, ReviewSource::Provided) {
            prop_assert!(review.char_count() <= MAX_REVIEW_CHARS);
            prop_assert!(review.char_count() > 0);
        }
    }
}

// --- Aggregation properties ---

proptest! {
    #[test]
    fn fake_percentage_matches_rounded_ratio(total in 1usize..500, fake_seed in 0usize..500) {
        let fake = fake_seed % (total + 1);
        let pct = fake_percentage(fake, total);
        prop_assert!(pct <= 100);
        prop_assert_eq!(pct, ((fake as f64 / total as f64) * 100.0).round() as u32);
    }

    #[test]
    fn trust_score_never_exceeds_penalized_ceiling(pct in 0u32..=100, penalty in 0u32..50) {
        let trust = trust_score(pct, penalty);
        prop_assert!(trust <= 100 - penalty);
    }

    #[test]
    fn summarize_empty_is_neutral(penalty in 0u32..50) {
        let summary = summarize_verdicts(&[], None, penalty);
        prop_assert_eq!(summary.total_reviews, 0);
        prop_assert_eq!(summary.trust_score, 50);
    }
}

// --- Response validation properties ---

proptest! {
    #[test]
    fn parse_analysis_never_panics(raw in ".{0,400}", corpus_len in 0usize..10) {
        let _ = parse_analysis(&raw, corpus_len, DEFAULT_TRUST_PENALTY);
    }

    #[test]
    fn parse_analysis_rejects_count_mismatch(corpus_len in 2usize..10) {
        let raw = r#"{"reviews": [{"reviewNumber": 1, "verdict": "FAKE", "confidence": 90, "reason": "spam"}]}"#;
        prop_assert!(parse_analysis(raw, corpus_len, DEFAULT_TRUST_PENALTY).is_err());
    }
}
