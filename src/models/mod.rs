// RevCheck Data Models
// Review corpus, per-review verdicts, summaries and the report envelope

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reviews longer than this are truncated on construction (Unicode scalar count).
pub const MAX_REVIEW_CHARS: usize = 500;
/// Upstream acceptance threshold: reviews must be strictly longer than this.
pub const MIN_REVIEW_CHARS: usize = 20;
pub const DEFAULT_MAX_REVIEWS: usize = 50;

// ============ Review Corpus ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSource {
    #[default]
    Provided,
    Retrieved,
    Sample,
}

/// A single review text. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    text: String,
    source: ReviewSource,
}

impl Review {
    /// Trims and truncates `text`; returns `None` for empty input.
    pub fn new(text: impl AsRef<str>, source: ReviewSource) -> Option<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        let text: String = trimmed.chars().take(MAX_REVIEW_CHARS).collect();
        Some(Self { text, source })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> ReviewSource {
        self.source
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

// ============ Verdicts ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Fake,
    Genuine,
    /// Heuristic path: same meaning as `Fake`, looser certainty.
    LikelyFake,
    /// Heuristic path: same meaning as `Genuine`, looser certainty.
    LikelyGenuine,
}

impl Verdict {
    pub fn is_fake(self) -> bool {
        matches!(self, Self::Fake | Self::LikelyFake)
    }

    /// Parse a service-provided label such as `FAKE`, `genuine` or `LIKELY FAKE`.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label
            .trim()
            .to_uppercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "FAKE" => Some(Self::Fake),
            "GENUINE" => Some(Self::Genuine),
            "LIKELY_FAKE" => Some(Self::LikelyFake),
            "LIKELY_GENUINE" => Some(Self::LikelyGenuine),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fake => "FAKE",
            Self::Genuine => "GENUINE",
            Self::LikelyFake => "LIKELY_FAKE",
            Self::LikelyGenuine => "LIKELY_GENUINE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewVerdict {
    /// 1-indexed position in the corpus; the only join key back to the review.
    pub review_number: usize,
    pub verdict: Verdict,
    pub confidence: u32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
}

// ============ Summary ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_reviews: usize,
    pub fake_count: usize,
    pub genuine_count: usize,
    pub fake_percentage: u32,
    pub trust_score: u32,
    pub suspicious_patterns: Vec<String>,
    pub buyer_recommendation: String,
}

/// Service-provided summary that may be missing any field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genuine_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_percentage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_recommendation: Option<String>,
}

// ============ Analysis Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Structured {
        reviews: Vec<ReviewVerdict>,
        summary: Summary,
    },
    /// The service answered with a summary but no per-review verdicts.
    Degraded {
        #[serde(rename = "rawAnalysis")]
        raw_analysis: String,
        summary: PartialSummary,
    },
}

impl AnalysisResult {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reviews(&self) -> Option<&[ReviewVerdict]> {
        match self {
            Self::Structured { reviews, .. } => Some(reviews),
            Self::Degraded { .. } => None,
        }
    }

    pub fn trust_score(&self) -> Option<u32> {
        match self {
            Self::Structured { summary, .. } => Some(summary.trust_score),
            Self::Degraded { summary, .. } => summary.trust_score,
        }
    }

    pub fn fake_percentage(&self) -> Option<u32> {
        match self {
            Self::Structured { summary, .. } => Some(summary.fake_percentage),
            Self::Degraded { summary, .. } => summary.fake_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMethod {
    #[serde(rename = "AI-powered")]
    AiPowered,
    #[serde(rename = "Pattern-based + AI")]
    PatternBased,
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AiPowered => f.write_str("AI-powered"),
            Self::PatternBased => f.write_str("Pattern-based + AI"),
        }
    }
}

// ============ Input ============

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewInput>,
    /// Corpus cap; the configured default applies when absent.
    #[serde(default)]
    pub max_reviews: Option<usize>,
    #[serde(default, skip_serializing)]
    pub service_credential: Option<String>,
}

impl fmt::Debug for AnalysisInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisInput")
            .field("product_url", &self.product_url)
            .field("reviews", &self.reviews.len())
            .field("max_reviews", &self.max_reviews)
            .field(
                "service_credential",
                &self.service_credential.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Reviews may be supplied as bare strings or as `{ text, source }` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewInput {
    Text(String),
    Record {
        text: String,
        #[serde(default)]
        source: Option<ReviewSource>,
    },
}

impl ReviewInput {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Record { text, .. } => text,
        }
    }

    pub fn source(&self) -> ReviewSource {
        match self {
            Self::Text(_) => ReviewSource::Provided,
            Self::Record { source, .. } => source.unwrap_or_default(),
        }
    }
}

// ============ Report ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub version: String,
    pub disclaimer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub request_id: String,
    pub product_url: String,
    pub analyzed_at: String,
    pub total_reviews_analyzed: usize,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub analysis_method: AnalysisMethod,
    pub metadata: ReportMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_trims_and_truncates() {
        let long = "a".repeat(MAX_REVIEW_CHARS + 40);
        let review = Review::new(format!("  {}  ", long), ReviewSource::Provided).unwrap();
        assert_eq!(review.char_count(), MAX_REVIEW_CHARS);
        assert!(Review::new("   ", ReviewSource::Sample).is_none());
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse("FAKE"), Some(Verdict::Fake));
        assert_eq!(Verdict::parse(" genuine "), Some(Verdict::Genuine));
        assert_eq!(Verdict::parse("LIKELY FAKE"), Some(Verdict::LikelyFake));
        assert_eq!(Verdict::parse("likely-genuine"), Some(Verdict::LikelyGenuine));
        assert_eq!(Verdict::parse("SUSPICIOUS"), None);
        assert!(Verdict::LikelyFake.is_fake());
        assert!(!Verdict::Genuine.is_fake());
    }

    #[test]
    fn test_degraded_result_serialization() {
        let result = AnalysisResult::Degraded {
            raw_analysis: "{\"summary\":{}}".to_string(),
            summary: PartialSummary {
                trust_score: Some(40),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("rawAnalysis").is_some());
        assert_eq!(json["summary"]["trustScore"], 40);
        assert!(json["summary"].get("fakeCount").is_none());
    }

    #[test]
    fn test_analysis_method_serialization() {
        assert_eq!(
            serde_json::to_string(&AnalysisMethod::PatternBased).unwrap(),
            "\"Pattern-based + AI\""
        );
        assert_eq!(AnalysisMethod::AiPowered.to_string(), "AI-powered");
    }

    #[test]
    fn test_input_accepts_strings_and_records() {
        let json = r#"{
            "reviews": ["plain text review", {"text": "record review", "source": "retrieved"}],
            "serviceCredential": "sk-test"
        }"#;
        let input: AnalysisInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.max_reviews, None);
        assert_eq!(input.reviews[0].source(), ReviewSource::Provided);
        assert_eq!(input.reviews[1].source(), ReviewSource::Retrieved);
        assert!(!format!("{:?}", input).contains("sk-test"));
    }
}
