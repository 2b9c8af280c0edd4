// Classification Orchestrator
// Selects between the service path (Primary) and the heuristic path (Fallback).
// Primary -> Fallback is the only transition; a run never returns to Primary
// and the service is never retried.

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::models::{AnalysisMethod, AnalysisResult, Review};
use crate::services::providers::ProviderError;

use super::aggregation::finalize;
use super::heuristic::HeuristicScorer;
use super::llm_analyzer::{ClassificationError, ReviewClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPath {
    Primary,
    Fallback,
}

impl ClassificationPath {
    /// Next state after a Primary attempt. Depends only on the outcome's classification.
    pub fn after(
        self,
        outcome: &Result<AnalysisResult, ClassificationError>,
        accept_degraded: bool,
    ) -> Self {
        match (self, outcome) {
            (Self::Fallback, _) => Self::Fallback,
            (Self::Primary, Err(_)) => Self::Fallback,
            (Self::Primary, Ok(result)) if result.is_degraded() && !accept_degraded => {
                Self::Fallback
            }
            (Self::Primary, Ok(_)) => Self::Primary,
        }
    }

    pub fn method(self) -> AnalysisMethod {
        match self {
            Self::Primary => AnalysisMethod::AiPowered,
            Self::Fallback => AnalysisMethod::PatternBased,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub result: AnalysisResult,
    pub method: AnalysisMethod,
    pub path: ClassificationPath,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Upper bound on the service call; expiry counts as a service error.
    pub deadline: Option<Duration>,
    /// Keep a summary-only service answer rather than falling back.
    pub accept_degraded: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            deadline: None,
            accept_degraded: true,
        }
    }
}

pub struct Orchestrator<C> {
    classifier: Option<C>,
    scorer: HeuristicScorer,
    options: OrchestratorOptions,
}

impl<C: ReviewClassifier> Orchestrator<C> {
    /// Without a classifier every run goes straight to Fallback.
    pub fn new(classifier: Option<C>, scorer: HeuristicScorer) -> Self {
        Self {
            classifier,
            scorer,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Always returns a well-formed classification; failures only change the path.
    pub async fn classify(&self, reviews: &[Review]) -> Classification {
        let started = Instant::now();

        let primary = match &self.classifier {
            Some(classifier) if !reviews.is_empty() => Some(classifier),
            Some(_) => {
                info!("[ORCHESTRATOR] empty corpus, skipping classification service");
                None
            }
            None => {
                info!("[ORCHESTRATOR] no classification service configured, using heuristics");
                None
            }
        };

        if let Some(classifier) = primary {
            let outcome = self.attempt(classifier, reviews).await;
            let path = ClassificationPath::Primary.after(&outcome, self.options.accept_degraded);

            match (path, outcome) {
                (ClassificationPath::Primary, Ok(result)) => {
                    info!(
                        "[ORCHESTRATOR] service path succeeded classifier={} degraded={} elapsed_ms={}",
                        classifier.name(),
                        result.is_degraded(),
                        started.elapsed().as_millis()
                    );
                    return Classification {
                        result: finalize(result, self.scorer.thresholds().trust_penalty),
                        method: path.method(),
                        path,
                    };
                }
                (_, Err(e)) => {
                    warn!(
                        "[ORCHESTRATOR] {} error from classifier={}, falling back: {}",
                        e.kind(),
                        classifier.name(),
                        e
                    );
                }
                (_, Ok(_)) => {
                    warn!("[ORCHESTRATOR] degraded service answer rejected, falling back");
                }
            }
        }

        let path = ClassificationPath::Fallback;
        Classification {
            result: self.scorer.score(reviews),
            method: path.method(),
            path,
        }
    }

    async fn attempt(
        &self,
        classifier: &C,
        reviews: &[Review],
    ) -> Result<AnalysisResult, ClassificationError> {
        match self.options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, classifier.classify(reviews))
                .await
                .unwrap_or(Err(ClassificationError::Service(ProviderError::Timeout(deadline)))),
            None => classifier.classify(reviews).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewSource, Verdict};
    use crate::services::detection::aggregation::DEFAULT_TRUST_PENALTY;
    use crate::services::detection::llm_analyzer::parse_analysis;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Respond(&'static str),
        Fail(u16),
        Hang,
    }

    struct ScriptedClassifier {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ReviewClassifier for ScriptedClassifier {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn classify(
            &self,
            reviews: &[Review],
        ) -> Result<AnalysisResult, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Respond(raw) => parse_analysis(raw, reviews.len(), DEFAULT_TRUST_PENALTY),
                Script::Fail(status) => Err(ClassificationError::Service(ProviderError::ApiError {
                    status,
                    message: "unavailable".to_string(),
                })),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(ClassificationError::Schema("unreachable".to_string()))
                }
            }
        }
    }

    fn corpus() -> Vec<Review> {
        [
            "BEST PRODUCT EVER!!! BUY NOW!!! AMAZING!!! 5 STARS!!! PERFECT!!!",
            "Received the item last week. Packaging was good. The product works as described.",
        ]
        .iter()
        .map(|t| Review::new(t, ReviewSource::Sample).unwrap())
        .collect()
    }

    fn orchestrator(script: Script) -> Orchestrator<ScriptedClassifier> {
        Orchestrator::new(Some(ScriptedClassifier::new(script)), HeuristicScorer::default())
    }

    const STRUCTURED: &str = r#"{"reviews": [
        {"reviewNumber": 1, "verdict": "FAKE", "confidence": 95, "reason": "shouting"},
        {"reviewNumber": 2, "verdict": "GENUINE", "confidence": 80, "reason": "concrete"}
    ], "summary": {"trustScore": 45, "suspiciousPatterns": ["caps"], "buyerRecommendation": "Careful"}}"#;

    const SUMMARY_ONLY: &str = r#"Overall: {"summary": {"totalReviews": 2, "trustScore": 50}}"#;

    #[tokio::test]
    async fn test_service_error_falls_back() {
        let orch = orchestrator(Script::Fail(503));
        let reviews = corpus();
        let out = orch.classify(&reviews).await;
        assert_eq!(out.method, AnalysisMethod::PatternBased);
        assert_eq!(out.path, ClassificationPath::Fallback);
        assert_eq!(out.result.reviews().unwrap().len(), reviews.len());
        assert_eq!(orch.classifier.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_schema_error_falls_back() {
        let orch = orchestrator(Script::Respond("I think review 1 is fake."));
        let reviews = corpus();
        let out = orch.classify(&reviews).await;
        assert_eq!(out.method, AnalysisMethod::PatternBased);
        let verdicts = out.result.reviews().unwrap();
        assert_eq!(verdicts.len(), reviews.len());
        assert_eq!(verdicts[0].verdict, Verdict::LikelyFake);
    }

    #[tokio::test]
    async fn test_structured_service_answer_is_ai_powered() {
        let out = orchestrator(Script::Respond(STRUCTURED)).classify(&corpus()).await;
        assert_eq!(out.method, AnalysisMethod::AiPowered);
        let AnalysisResult::Structured { reviews, summary } = out.result else {
            panic!("expected structured result");
        };
        assert_eq!(reviews.len(), 2);
        assert_eq!(summary.fake_count, 1);
        assert_eq!(summary.trust_score, 45);
    }

    #[tokio::test]
    async fn test_degraded_answer_accepted_by_default() {
        let out = orchestrator(Script::Respond(SUMMARY_ONLY)).classify(&corpus()).await;
        assert_eq!(out.method, AnalysisMethod::AiPowered);
        assert!(out.result.is_degraded());
        assert_eq!(out.result.trust_score(), Some(50));
    }

    #[tokio::test]
    async fn test_degraded_answer_can_be_rejected() {
        let orch = orchestrator(Script::Respond(SUMMARY_ONLY)).with_options(OrchestratorOptions {
            deadline: None,
            accept_degraded: false,
        });
        let out = orch.classify(&corpus()).await;
        assert_eq!(out.method, AnalysisMethod::PatternBased);
        assert!(!out.result.is_degraded());
    }

    #[tokio::test]
    async fn test_deadline_expiry_falls_back() {
        let orch = orchestrator(Script::Hang).with_options(OrchestratorOptions {
            deadline: Some(Duration::from_millis(50)),
            accept_degraded: true,
        });
        let out = orch.classify(&corpus()).await;
        assert_eq!(out.path, ClassificationPath::Fallback);
        assert_eq!(out.result.reviews().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_classifier_uses_heuristics() {
        let orch: Orchestrator<ScriptedClassifier> =
            Orchestrator::new(None, HeuristicScorer::default());
        let out = orch.classify(&corpus()).await;
        assert_eq!(out.method, AnalysisMethod::PatternBased);
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_service() {
        let orch = orchestrator(Script::Respond(STRUCTURED));
        let out = orch.classify(&[]).await;
        assert_eq!(orch.classifier.as_ref().unwrap().calls.load(Ordering::SeqCst), 0);
        assert_eq!(out.method, AnalysisMethod::PatternBased);
        let AnalysisResult::Structured { reviews, summary } = out.result else {
            panic!("expected structured result");
        };
        assert!(reviews.is_empty());
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.fake_count + summary.genuine_count, 0);
    }

    #[test]
    fn test_transition_is_terminal_in_fallback() {
        let ok = parse_analysis(STRUCTURED, 2, DEFAULT_TRUST_PENALTY);
        assert_eq!(ClassificationPath::Fallback.after(&ok, true), ClassificationPath::Fallback);
        assert_eq!(ClassificationPath::Primary.after(&ok, true), ClassificationPath::Primary);

        let err: Result<AnalysisResult, ClassificationError> =
            Err(ClassificationError::Schema("bad".to_string()));
        assert_eq!(ClassificationPath::Primary.after(&err, true), ClassificationPath::Fallback);

        let degraded = parse_analysis(SUMMARY_ONLY, 2, DEFAULT_TRUST_PENALTY);
        assert_eq!(ClassificationPath::Primary.after(&degraded, true), ClassificationPath::Primary);
        assert_eq!(
            ClassificationPath::Primary.after(&degraded, false),
            ClassificationPath::Fallback
        );
    }
}
