// Analysis API
// Runs one analysis: corpus construction, classification, report envelope

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::models::{AnalysisInput, AnalysisReport, Review, ReportMetadata};
use crate::services::config_store::{AppConfig, ConfigError, ConfigStore};
use crate::services::corpus::CorpusBuilder;
use crate::services::detection::{
    Classification, LlmClassifier, Orchestrator, OrchestratorOptions,
};
use crate::services::providers::{get_api_key, ProviderClient};

pub const DISCLAIMER: &str =
    "This analysis is for informational purposes only. Results are based on pattern recognition and AI analysis.";
pub const DIRECT_INPUT_URL: &str = "N/A (reviews provided directly)";

/// Build the classification service client, or `None` when the run must stay offline.
fn build_classifier(
    input: &AnalysisInput,
    config: &AppConfig,
    store: Option<&ConfigStore>,
    trust_penalty: u32,
) -> Option<LlmClassifier> {
    let Some(api_key) = get_api_key(input.service_credential.as_deref(), store) else {
        info!("[API] no service credential configured");
        return None;
    };

    match ProviderClient::new(&config.provider, api_key) {
        Ok(client) => {
            info!("[API] classification service url={} model={}", client.url(), client.model());
            Some(LlmClassifier::new(client).with_trust_penalty(trust_penalty))
        }
        Err(e) => {
            warn!("[API] failed to create provider client: {}", e);
            None
        }
    }
}

/// Analyze one request end to end. Service failures never surface here;
/// only configuration problems do.
pub async fn analyze_reviews(
    input: AnalysisInput,
    config: &AppConfig,
    store: Option<&ConfigStore>,
    offline: bool,
) -> Result<AnalysisReport, ConfigError> {
    let started = Instant::now();
    let max_reviews = input.max_reviews.unwrap_or(config.analysis.max_reviews);

    let corpus = CorpusBuilder::new(max_reviews)
        .provided(input.reviews.clone())
        .build();

    let scorer = config.build_scorer()?;
    let classifier = if offline {
        info!("[API] offline run, classification service disabled");
        None
    } else {
        build_classifier(&input, config, store, scorer.thresholds().trust_penalty)
    };

    let orchestrator = Orchestrator::new(classifier, scorer).with_options(OrchestratorOptions {
        deadline: config.analysis.deadline_secs.map(Duration::from_secs),
        accept_degraded: config.analysis.accept_degraded,
    });

    let classification = orchestrator.classify(&corpus).await;
    let report = build_report(input.product_url.as_deref(), &corpus, classification);

    info!(
        "[API] analysis complete: reviews={} trust_score={} fake_percentage={} method={} elapsed_ms={}",
        report.total_reviews_analyzed,
        report.result.trust_score().map_or("n/a".to_string(), |v| v.to_string()),
        report.result.fake_percentage().map_or("n/a".to_string(), |v| format!("{}%", v)),
        report.analysis_method,
        started.elapsed().as_millis()
    );

    Ok(report)
}

/// Wrap a classification in the report envelope.
pub fn build_report(
    product_url: Option<&str>,
    corpus: &[Review],
    classification: Classification,
) -> AnalysisReport {
    let product_url = product_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DIRECT_INPUT_URL)
        .to_string();

    AnalysisReport {
        request_id: uuid::Uuid::new_v4().to_string(),
        product_url,
        analyzed_at: chrono::Utc::now().to_rfc3339(),
        total_reviews_analyzed: corpus.len(),
        result: classification.result,
        analysis_method: classification.method,
        metadata: ReportMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            disclaimer: DISCLAIMER.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMethod, ReviewInput};
    use crate::services::config_store::ProviderConfig;

    fn input(texts: &[&str]) -> AnalysisInput {
        AnalysisInput {
            reviews: texts.iter().map(|t| ReviewInput::Text(t.to_string())).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_offline_run_uses_pattern_path() {
        let report = analyze_reviews(
            input(&[
                "BEST PRODUCT EVER!!! BUY NOW!!! AMAZING!!! 5 STARS!!! PERFECT!!!",
                "Received the item last week. Packaging was good. The product works as described.",
            ]),
            &AppConfig::default(),
            None,
            true,
        )
        .await
        .unwrap();

        assert_eq!(report.analysis_method, AnalysisMethod::PatternBased);
        assert_eq!(report.total_reviews_analyzed, 2);
        assert_eq!(report.product_url, DIRECT_INPUT_URL);
        assert_eq!(report.result.reviews().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_uses_sample_corpus() {
        let report = analyze_reviews(AnalysisInput::default(), &AppConfig::default(), None, true)
            .await
            .unwrap();
        assert_eq!(report.total_reviews_analyzed, 8);
    }

    #[tokio::test]
    async fn test_max_reviews_override() {
        let mut request = input(&[
            "First review with enough text in it.",
            "Second review with enough text in it.",
            "Third review with enough text in it.",
        ]);
        request.max_reviews = Some(2);
        let report = analyze_reviews(request, &AppConfig::default(), None, true).await.unwrap();
        assert_eq!(report.total_reviews_analyzed, 2);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let mut config = AppConfig::default();
        config.provider = ProviderConfig {
            base_url: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            timeout_secs: 5,
            ..Default::default()
        };
        let mut request = input(&["Received the item last week. Packaging was good."]);
        request.service_credential = Some("sk-test".to_string());

        let report = analyze_reviews(request, &config, None, false).await.unwrap();
        assert_eq!(report.analysis_method, AnalysisMethod::PatternBased);
        assert_eq!(report.total_reviews_analyzed, 1);
    }

    #[test]
    fn test_report_serializes_camel_case_envelope() {
        let scorer = crate::services::detection::HeuristicScorer::default();
        let corpus = vec![Review::new(
            "Great value and it works as described after a month.",
            crate::models::ReviewSource::Provided,
        )
        .unwrap()];
        let classification = Classification {
            result: scorer.score(&corpus),
            method: AnalysisMethod::PatternBased,
            path: crate::services::detection::ClassificationPath::Fallback,
        };
        let report = build_report(Some("https://shop.example/item/1"), &corpus, classification);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["productUrl"], "https://shop.example/item/1");
        assert_eq!(json["totalReviewsAnalyzed"], 1);
        assert_eq!(json["analysisMethod"], "Pattern-based + AI");
        assert!(json["reviews"].is_array());
        assert!(json["summary"]["trustScore"].is_number());
        assert_eq!(
            json["metadata"]["disclaimer"],
            "This analysis is for informational purposes only. \
             Results are based on pattern recognition and AI analysis."
        );
        assert!(json.get("rawAnalysis").is_none());
    }
}
