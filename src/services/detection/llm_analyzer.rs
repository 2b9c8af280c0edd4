// LLM Analyzer
// Builds the whole-corpus classification request, sends it to the text-analysis
// service, and validates the response against the expected structure.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AnalysisResult, PartialSummary, Review, ReviewVerdict, Verdict};
use crate::services::providers::{ProviderClient, ProviderError};

use super::aggregation::{summarize_verdicts, DEFAULT_TRUST_PENALTY};

pub const SYSTEM_PROMPT: &str =
    "You are a fake review detection expert. Always respond with valid JSON only.";

const PROMPT_HEADER: &str = "You are an expert at detecting fake product reviews. Analyze these reviews and identify which ones are likely fake or suspicious.";

const PROMPT_INSTRUCTIONS: &str = r#"For each review, determine:
1. Is it likely FAKE or GENUINE?
2. Confidence score (0-100%)
3. Reason for your assessment

Also provide:
- Overall fake review percentage
- Trust score for this product (0-100)
- Key suspicious patterns found
- Recommendations for buyers

Respond in this exact JSON format:
{
    "reviews": [
        {
            "reviewNumber": 1,
            "verdict": "FAKE" or "GENUINE",
            "confidence": 85,
            "reason": "explanation"
        }
    ],
    "summary": {
        "totalReviews": number,
        "fakeCount": number,
        "genuineCount": number,
        "fakePercentage": number,
        "trustScore": number,
        "suspiciousPatterns": ["pattern1", "pattern2"],
        "buyerRecommendation": "recommendation text"
    }
}"#;

#[derive(Error, Debug)]
pub enum ClassificationError {
    /// Transport, HTTP status, auth, quota or timeout failure.
    #[error("classification service error: {0}")]
    Service(#[from] ProviderError),
    /// A response arrived but does not match the expected structure.
    #[error("classification response does not match schema: {0}")]
    Schema(String),
}

impl ClassificationError {
    fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "service",
            Self::Schema(_) => "schema",
        }
    }
}

/// Primary classification path. Implementations perform at most one external call.
pub trait ReviewClassifier {
    fn name(&self) -> &str;

    fn classify(
        &self,
        reviews: &[Review],
    ) -> impl Future<Output = Result<AnalysisResult, ClassificationError>> + Send;
}

/// Numbered listing of the corpus embedded in the fixed instruction template.
pub fn build_prompt(reviews: &[Review]) -> String {
    let listing = reviews
        .iter()
        .enumerate()
        .map(|(i, r)| format!("Review {}: \"{}\"", i + 1, r.text()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{}\n\n{}", PROMPT_HEADER, listing, PROMPT_INSTRUCTIONS)
}

/// Find the first balanced `{...}` substring that parses as a JSON object.
/// Braces inside string literals are ignored while matching.
pub fn extract_json_object(content: &str) -> Option<Map<String, Value>> {
    let bytes = content.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = content[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&content[start..=end]) {
                return Some(map);
            }
        }
        search_from = start + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

/// Non-negative number, rounded. Ranges are not re-validated.
fn as_score(value: &Value) -> Option<u32> {
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
        .map(|f| f.round() as u32)
}

/// `None` for absent or null fields, an error for present fields of the wrong type.
fn optional_field<T>(
    obj: &Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, ClassificationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => convert(v)
            .map(Some)
            .ok_or_else(|| {
                ClassificationError::schema(format!("summary.{} has the wrong type", key))
            }),
    }
}

fn parse_partial_summary(value: &Value) -> Result<PartialSummary, ClassificationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ClassificationError::schema("summary is not an object"))?;

    let count = |v: &Value| as_count(v).map(|n| n as usize);
    let text = |v: &Value| v.as_str().map(str::to_string);
    let patterns = |v: &Value| {
        v.as_array()?
            .iter()
            .map(|p| p.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
    };

    Ok(PartialSummary {
        total_reviews: optional_field(obj, "totalReviews", count)?,
        fake_count: optional_field(obj, "fakeCount", count)?,
        genuine_count: optional_field(obj, "genuineCount", count)?,
        fake_percentage: optional_field(obj, "fakePercentage", as_score)?,
        trust_score: optional_field(obj, "trustScore", as_score)?,
        suspicious_patterns: optional_field(obj, "suspiciousPatterns", patterns)?,
        buyer_recommendation: optional_field(obj, "buyerRecommendation", text)?,
    })
}

fn parse_verdict(item: &Value, index: usize) -> Result<ReviewVerdict, ClassificationError> {
    let obj = item
        .as_object()
        .ok_or_else(|| {
            ClassificationError::schema(format!("reviews[{}] is not an object", index))
        })?;
    let field = |key: &str| {
        obj.get(key)
            .ok_or_else(|| {
                ClassificationError::schema(format!("reviews[{}].{} is missing", index, key))
            })
    };
    let wrong = |key: &str| {
        ClassificationError::schema(format!("reviews[{}].{} is invalid", index, key))
    };

    let review_number =
        as_count(field("reviewNumber")?).ok_or_else(|| wrong("reviewNumber"))? as usize;
    let verdict = field("verdict")?
        .as_str()
        .and_then(Verdict::parse)
        .ok_or_else(|| wrong("verdict"))?;
    let confidence = as_score(field("confidence")?).ok_or_else(|| wrong("confidence"))?;
    let reason = field("reason")?
        .as_str()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| wrong("reason"))?
        .to_string();

    Ok(ReviewVerdict {
        review_number,
        verdict,
        confidence,
        reason,
        reasons: Vec::new(),
        text_preview: None,
    })
}

/// Verdicts must cover exactly `1..=corpus_len`; returned in review-number order.
fn parse_verdicts(
    items: &[Value],
    corpus_len: usize,
) -> Result<Vec<ReviewVerdict>, ClassificationError> {
    if items.len() != corpus_len {
        return Err(ClassificationError::schema(format!(
            "expected {} review verdicts, got {}",
            corpus_len,
            items.len()
        )));
    }

    let mut verdicts = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_verdict(item, i))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(verdicts.len());
    for v in &verdicts {
        if v.review_number == 0 || v.review_number > corpus_len || !seen.insert(v.review_number) {
            return Err(ClassificationError::schema(format!(
                "reviewNumber {} is out of range or duplicated",
                v.review_number
            )));
        }
    }

    verdicts.sort_by_key(|v| v.review_number);
    Ok(verdicts)
}

/// Validate a raw service answer.
///
/// - `reviews` array present: structured result, counts recomputed from the verdicts.
/// - `reviews` absent with a `summary` object: degraded result carrying the raw text.
/// - anything else: [`ClassificationError::Schema`].
pub fn parse_analysis(
    raw: &str,
    corpus_len: usize,
    trust_penalty: u32,
) -> Result<AnalysisResult, ClassificationError> {
    let root = extract_json_object(raw)
        .ok_or_else(|| ClassificationError::schema("no JSON object found in response"))?;

    let summary = match root.get("summary") {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_partial_summary(v)?),
    };

    match root.get("reviews") {
        Some(Value::Array(items)) => {
            let verdicts = parse_verdicts(items, corpus_len)?;
            let summary = summarize_verdicts(&verdicts, summary.as_ref(), trust_penalty);
            Ok(AnalysisResult::Structured {
                reviews: verdicts,
                summary,
            })
        }
        None | Some(Value::Null) => match summary {
            Some(summary) => Ok(AnalysisResult::Degraded {
                raw_analysis: raw.to_string(),
                summary,
            }),
            None => Err(ClassificationError::schema(
                "response has neither a reviews array nor a summary object",
            )),
        },
        Some(_) => Err(ClassificationError::schema("reviews is not an array")),
    }
}

/// Classification over an OpenAI-compatible chat completions service.
pub struct LlmClassifier {
    client: ProviderClient,
    trust_penalty: u32,
}

impl LlmClassifier {
    pub fn new(client: ProviderClient) -> Self {
        Self {
            client,
            trust_penalty: DEFAULT_TRUST_PENALTY,
        }
    }

    pub fn with_trust_penalty(mut self, trust_penalty: u32) -> Self {
        self.trust_penalty = trust_penalty;
        self
    }
}

impl ReviewClassifier for LlmClassifier {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn classify(&self, reviews: &[Review]) -> Result<AnalysisResult, ClassificationError> {
        let prompt = build_prompt(reviews);
        info!(
            "[LLM_ANALYZER] requesting classification model={} reviews={} prompt_chars={}",
            self.client.model(),
            reviews.len(),
            prompt.chars().count()
        );

        let chat = self.client.chat(SYSTEM_PROMPT, &prompt).await.map_err(|e| {
            if e.is_auth_or_quota() {
                warn!("[LLM_ANALYZER] service rejected credentials or quota: {}", e);
            }
            ClassificationError::from(e)
        })?;

        info!(
            "[LLM_ANALYZER] response received latency_ms={} chars={}",
            chat.latency_ms,
            chat.content.len()
        );
        parse_analysis(&chat.content, reviews.len(), self.trust_penalty)
    }
}
