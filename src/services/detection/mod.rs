// Detection Module
// Fake-review classification core organized into specialized submodules:
// - heuristic: Rule-table scorer used as the fallback path
// - llm_analyzer: Classification service client and strict response validation
// - orchestrator: Primary/Fallback path selection
// - aggregation: Corpus summary math and recommendation tiers

pub mod aggregation;
pub mod heuristic;
pub mod llm_analyzer;
pub mod orchestrator;

// Re-export commonly used items
pub use aggregation::{
    buyer_recommendation, fake_percentage, finalize, summarize_verdicts, trust_score,
};
pub use heuristic::{
    default_rules, HeuristicScorer, RuleCondition, RuleError, RuleSpec, ScoringThresholds,
};
pub use llm_analyzer::{parse_analysis, ClassificationError, LlmClassifier, ReviewClassifier};
pub use orchestrator::{Classification, ClassificationPath, Orchestrator, OrchestratorOptions};
