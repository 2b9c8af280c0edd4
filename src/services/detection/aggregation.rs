// Aggregation Logic
// Derives corpus-level summary statistics from per-review verdicts

use crate::models::{AnalysisResult, PartialSummary, ReviewVerdict, Summary};

/// Fixed skepticism penalty subtracted from the trust score regardless of sample size.
pub const DEFAULT_TRUST_PENALTY: u32 = 10;
pub const NEUTRAL_TRUST_SCORE: u32 = 50;
pub const NEUTRAL_RECOMMENDATION: &str = "No reviews were available to analyze.";

const TRUST_SAFE_MIN: u32 = 70;
const TRUST_CAUTION_MIN: u32 = 40;

const RECOMMEND_SAFE: &str = "✅ Reviews appear mostly genuine. Safe to trust.";
const RECOMMEND_CAUTION: &str = "⚠️ Mixed reviews detected. Read carefully before purchasing.";
const RECOMMEND_WARNING: &str = "❌ High fake review percentage. Be cautious!";

/// round(fake / total * 100); zero for an empty corpus.
pub fn fake_percentage(fake_count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((fake_count as f64 / total as f64) * 100.0).round() as u32
}

pub fn trust_score(fake_percentage: u32, penalty: u32) -> u32 {
    100u32.saturating_sub(fake_percentage).saturating_sub(penalty)
}

/// Tiered buyer message selected by trust score.
pub fn buyer_recommendation(trust_score: u32) -> &'static str {
    if trust_score >= TRUST_SAFE_MIN {
        RECOMMEND_SAFE
    } else if trust_score >= TRUST_CAUTION_MIN {
        RECOMMEND_CAUTION
    } else {
        RECOMMEND_WARNING
    }
}

/// All-zero counts with a neutral trust score, used for an empty corpus.
pub fn neutral_summary() -> Summary {
    Summary {
        total_reviews: 0,
        fake_count: 0,
        genuine_count: 0,
        fake_percentage: 0,
        trust_score: NEUTRAL_TRUST_SCORE,
        suspicious_patterns: Vec::new(),
        buyer_recommendation: NEUTRAL_RECOMMENDATION.to_string(),
    }
}

/// Build a summary from the verdict list.
/// Counts and percentage always come from `verdicts`; trust score, patterns and
/// recommendation are taken from `provided` when present and derived otherwise.
pub fn summarize_verdicts(
    verdicts: &[ReviewVerdict],
    provided: Option<&PartialSummary>,
    penalty: u32,
) -> Summary {
    if verdicts.is_empty() {
        return neutral_summary();
    }

    let total = verdicts.len();
    let fake_count = verdicts.iter().filter(|v| v.verdict.is_fake()).count();
    let fake_pct = fake_percentage(fake_count, total);

    let trust = provided
        .and_then(|s| s.trust_score)
        .unwrap_or_else(|| trust_score(fake_pct, penalty));
    let suspicious_patterns = provided
        .and_then(|s| s.suspicious_patterns.clone())
        .unwrap_or_default();
    let buyer_recommendation = provided
        .and_then(|s| s.buyer_recommendation.clone())
        .unwrap_or_else(|| buyer_recommendation(trust).to_string());

    Summary {
        total_reviews: total,
        fake_count,
        genuine_count: total - fake_count,
        fake_percentage: fake_pct,
        trust_score: trust,
        suspicious_patterns,
        buyer_recommendation,
    }
}

/// Re-derive counts for a structured result; degraded results pass through unchanged.
pub fn finalize(result: AnalysisResult, penalty: u32) -> AnalysisResult {
    match result {
        AnalysisResult::Structured { reviews, summary } => {
            let provided = PartialSummary {
                trust_score: Some(summary.trust_score),
                suspicious_patterns: Some(summary.suspicious_patterns),
                buyer_recommendation: Some(summary.buyer_recommendation),
                ..Default::default()
            };
            let summary = summarize_verdicts(&reviews, Some(&provided), penalty);
            AnalysisResult::Structured { reviews, summary }
        }
        degraded @ AnalysisResult::Degraded { .. } => degraded,
    }
}
