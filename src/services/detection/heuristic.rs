// Heuristic Fallback Scorer
// Deterministic rule-table scoring used when the classification service is unusable.
// Rules are data (tag, weight, condition) and are evaluated in table order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{AnalysisResult, PartialSummary, Review, ReviewVerdict, Verdict};

use super::aggregation::{summarize_verdicts, DEFAULT_TRUST_PENALTY};

const NO_PATTERNS_REASON: &str = "No suspicious patterns detected";
const PREVIEW_CHARS: usize = 100;
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Reported in every heuristic summary, independent of which rules fired.
pub const CANONICAL_PATTERNS: [&str; 4] = [
    "Excessive punctuation",
    "Generic superlatives",
    "Repetitive patterns",
    "Unusually short reviews",
];

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{tag}' has an empty lexicon")]
    EmptyLexicon { tag: String },
    #[error("rule '{tag}' has an invalid lexicon: {source}")]
    InvalidLexicon {
        tag: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule '{tag}' ratio must be within 0..=1, got {ratio}")]
    InvalidRatio { tag: String, ratio: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// A run of `run_length` marks, or more than `max_total` marks overall.
    ExcessivePunctuation {
        mark: char,
        run_length: usize,
        max_total: usize,
    },
    /// Longer than `min_chars`, with upper-case letters and no lower-case ones.
    AllCaps { min_chars: usize },
    /// Any lexicon word and fewer than `max_words` words.
    LexiconFewWords {
        lexicon: Vec<String>,
        max_words: usize,
    },
    /// More than `min_words` words with a distinct/total ratio below `max_unique_ratio`.
    RepetitiveWords {
        min_words: usize,
        max_unique_ratio: f64,
    },
    /// Fewer than `max_chars` characters and any lexicon word.
    LexiconFewChars {
        lexicon: Vec<String>,
        max_chars: usize,
    },
    /// More than `min_chars` characters, a sentence terminator, and any lexicon word.
    BalancedDetail {
        lexicon: Vec<String>,
        min_chars: usize,
    },
}

impl RuleCondition {
    fn lexicon(&self) -> Option<&[String]> {
        match self {
            Self::LexiconFewWords { lexicon, .. }
            | Self::LexiconFewChars { lexicon, .. }
            | Self::BalancedDetail { lexicon, .. } => Some(lexicon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub tag: String,
    pub weight: i32,
    #[serde(flatten)]
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringThresholds {
    /// Scores at or above this are fake.
    #[serde(default = "default_fake_threshold")]
    pub fake_threshold: i32,
    #[serde(default = "default_base_confidence")]
    pub base_confidence: i32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: i32,
    #[serde(default = "default_max_confidence")]
    pub max_confidence: i32,
    #[serde(default = "default_trust_penalty")]
    pub trust_penalty: u32,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            fake_threshold: default_fake_threshold(),
            base_confidence: default_base_confidence(),
            min_confidence: default_min_confidence(),
            max_confidence: default_max_confidence(),
            trust_penalty: default_trust_penalty(),
        }
    }
}

fn default_fake_threshold() -> i32 { 30 }
fn default_base_confidence() -> i32 { 50 }
fn default_min_confidence() -> i32 { 30 }
fn default_max_confidence() -> i32 { 95 }
fn default_trust_penalty() -> u32 { DEFAULT_TRUST_PENALTY }

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Built-in rule table, in evaluation order.
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            tag: "Excessive exclamation marks".to_string(),
            weight: 20,
            condition: RuleCondition::ExcessivePunctuation {
                mark: '!',
                run_length: 3,
                max_total: 3,
            },
        },
        RuleSpec {
            tag: "ALL CAPS text".to_string(),
            weight: 25,
            condition: RuleCondition::AllCaps { min_chars: 20 },
        },
        RuleSpec {
            tag: "Generic superlatives with short length".to_string(),
            weight: 15,
            condition: RuleCondition::LexiconFewWords {
                lexicon: words(&["best", "amazing", "perfect", "excellent"]),
                max_words: 15,
            },
        },
        RuleSpec {
            tag: "Repetitive word patterns".to_string(),
            weight: 30,
            condition: RuleCondition::RepetitiveWords {
                min_words: 5,
                max_unique_ratio: 0.5,
            },
        },
        RuleSpec {
            tag: "Suspiciously short positive review".to_string(),
            weight: 15,
            condition: RuleCondition::LexiconFewChars {
                lexicon: words(&["great", "love", "best", "amazing", "perfect"]),
                max_chars: 50,
            },
        },
        RuleSpec {
            tag: "Detailed with balanced opinion (likely genuine)".to_string(),
            weight: -20,
            condition: RuleCondition::BalancedDetail {
                lexicon: words(&["but", "however", "although", "though"]),
                min_chars: 150,
            },
        },
    ]
}

/// Case-insensitive alternation over the lexicon. Entries match anywhere in the
/// text, so inflected forms ("perfectly", "greatest") count.
fn compile_lexicon(tag: &str, lexicon: &[String]) -> Result<Regex, RuleError> {
    let alternatives: Vec<String> = lexicon
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Err(RuleError::EmptyLexicon { tag: tag.to_string() });
    }
    let pattern = format!("(?i)(?:{})", alternatives.join("|"));
    Regex::new(&pattern).map_err(|source| RuleError::InvalidLexicon {
        tag: tag.to_string(),
        source,
    })
}

#[derive(Debug, Clone)]
struct CompiledRule {
    spec: RuleSpec,
    lexicon: Option<Regex>,
}

impl CompiledRule {
    fn compile(spec: RuleSpec) -> Result<Self, RuleError> {
        if let RuleCondition::RepetitiveWords { max_unique_ratio, .. } = spec.condition {
            if !(0.0..=1.0).contains(&max_unique_ratio) {
                return Err(RuleError::InvalidRatio {
                    tag: spec.tag.clone(),
                    ratio: max_unique_ratio,
                });
            }
        }
        let lexicon = match spec.condition.lexicon() {
            Some(list) => Some(compile_lexicon(&spec.tag, list)?),
            None => None,
        };
        Ok(Self { spec, lexicon })
    }

    fn lexicon_matches(&self, text: &str) -> bool {
        self.lexicon.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn matches(&self, features: &TextFeatures<'_>) -> bool {
        match &self.spec.condition {
            RuleCondition::ExcessivePunctuation {
                mark,
                run_length,
                max_total,
            } => {
                let run: String = std::iter::repeat(*mark).take(*run_length).collect();
                let total = features.text.chars().filter(|c| c == mark).count();
                (*run_length > 0 && features.text.contains(&run)) || total > *max_total
            }
            RuleCondition::AllCaps { min_chars } => {
                features.char_count > *min_chars
                    && features.text.chars().any(char::is_uppercase)
                    && !features.text.chars().any(char::is_lowercase)
            }
            RuleCondition::LexiconFewWords { max_words, .. } => {
                self.lexicon_matches(features.text) && features.words.len() < *max_words
            }
            RuleCondition::RepetitiveWords {
                min_words,
                max_unique_ratio,
            } => {
                let total = features.words.len();
                if total <= *min_words {
                    return false;
                }
                let unique: HashSet<&str> = features.words.iter().map(String::as_str).collect();
                (unique.len() as f64 / total as f64) < *max_unique_ratio
            }
            RuleCondition::LexiconFewChars { max_chars, .. } => {
                features.char_count < *max_chars && self.lexicon_matches(features.text)
            }
            RuleCondition::BalancedDetail { min_chars, .. } => {
                features.char_count > *min_chars
                    && features.text.contains(SENTENCE_TERMINATORS)
                    && self.lexicon_matches(features.text)
            }
        }
    }
}

struct TextFeatures<'a> {
    text: &'a str,
    char_count: usize,
    /// Lower-cased whitespace tokens with edge punctuation trimmed.
    words: Vec<String>,
}

impl<'a> TextFeatures<'a> {
    fn new(text: &'a str) -> Self {
        let words = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            text,
            char_count: text.chars().count(),
            words,
        }
    }
}

/// Score and triggered tags for a single text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub fake_score: i32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    rules: Vec<CompiledRule>,
    thresholds: ScoringThresholds,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::from_specs(default_rules(), ScoringThresholds::default())
            .expect("built-in rule table compiles")
    }
}

impl HeuristicScorer {
    pub fn from_specs(
        specs: Vec<RuleSpec>,
        thresholds: ScoringThresholds,
    ) -> Result<Self, RuleError> {
        let rules = specs
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules, thresholds })
    }

    pub fn specs(&self) -> Vec<RuleSpec> {
        self.rules.iter().map(|r| r.spec.clone()).collect()
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Apply every rule in table order.
    pub fn evaluate(&self, text: &str) -> RuleOutcome {
        let features = TextFeatures::new(text);
        let mut fake_score = 0;
        let mut reasons = Vec::new();
        for rule in &self.rules {
            if rule.matches(&features) {
                fake_score += rule.spec.weight;
                reasons.push(rule.spec.tag.clone());
            }
        }
        RuleOutcome { fake_score, reasons }
    }

    pub fn score_review(&self, review: &Review, review_number: usize) -> ReviewVerdict {
        let RuleOutcome {
            fake_score,
            mut reasons,
        } = self.evaluate(review.text());

        let verdict = if fake_score >= self.thresholds.fake_threshold {
            Verdict::LikelyFake
        } else {
            Verdict::LikelyGenuine
        };
        let confidence = (self.thresholds.base_confidence + fake_score)
            .clamp(self.thresholds.min_confidence, self.thresholds.max_confidence)
            .max(0) as u32;

        if reasons.is_empty() {
            reasons.push(NO_PATTERNS_REASON.to_string());
        }

        debug!(
            review_number,
            fake_score,
            verdict = %verdict,
            "[HEURISTIC] scored review"
        );

        ReviewVerdict {
            review_number,
            verdict,
            confidence,
            reason: reasons.join("; "),
            reasons,
            text_preview: Some(review.preview(PREVIEW_CHARS)),
        }
    }

    /// Score the whole corpus. Total and infallible; an empty corpus yields a neutral summary.
    pub fn score(&self, reviews: &[Review]) -> AnalysisResult {
        let verdicts: Vec<ReviewVerdict> = reviews
            .iter()
            .enumerate()
            .map(|(idx, review)| self.score_review(review, idx + 1))
            .collect();

        let canonical = PartialSummary {
            suspicious_patterns: Some(CANONICAL_PATTERNS.iter().map(|p| p.to_string()).collect()),
            ..Default::default()
        };
        let summary =
            summarize_verdicts(&verdicts, Some(&canonical), self.thresholds.trust_penalty);

        info!(
            "[HEURISTIC] scored {} reviews: fake={} trust={}",
            summary.total_reviews, summary.fake_count, summary.trust_score
        );

        AnalysisResult::Structured {
            reviews: verdicts,
            summary,
        }
    }
}
