//! Integration tests for the legal purity gateway
//!
//! These tests drive the whole pipeline: a mocked chat-completions engine,
//! the gateway with its cleaner, validator, terminology store and cache, and
//! the feedback loop deploying rule changes back into it.

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use legal_purity_gateway::{
    config::Config,
    engine::{EnginePrompt, OpenAiEngine, TranslationEngine},
    error::EngineError,
    feedback::{FeedbackLoop, Issue, IssueKind, ReportStatus},
    gateway::{Pipeline, TranslationGateway},
    i18n::Language,
    purity::{ContentCleaner, PatternKind, PurityValidator, RuleSet, DEFAULT_THRESHOLD},
    terminology::{BuiltinDataset, JsonDataset, TerminologyStore},
    translation::{TranslationMethod, TranslationRequest},
};

// ==================== Test Helpers ====================

/// Create a test config pointing the engine at a mock server
fn create_test_config(api_url: &str) -> Config {
    Config {
        openai_api_key: "test-openai-key".to_string(),
        openai_api_url: api_url.to_string(),
        engine_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

fn create_openai_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn mock_engine_answering(content: &str, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-openai-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response(content)))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

/// Gateway and feedback loop sharing one pipeline, backed by the mock engine
fn build(server: &MockServer) -> (TranslationGateway, Arc<FeedbackLoop>) {
    let config = create_test_config(&format!("{}/v1/chat/completions", server.uri()));
    let terminology = TerminologyStore::bootstrap(&BuiltinDataset).expect("seed");
    let pipeline = Pipeline::new(&config, terminology);
    let engine = Arc::new(OpenAiEngine::new(reqwest::Client::new(), &config));
    let gateway = TranslationGateway::new(engine, pipeline.clone(), &config);
    let feedback = Arc::new(FeedbackLoop::new(pipeline, &config));
    (gateway, feedback)
}

/// In-process engine returning a fixed answer
struct FixedEngine(String);

#[async_trait]
impl TranslationEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate_or_translate(&self, _prompt: &EnginePrompt) -> Result<String, EngineError> {
        Ok(self.0.clone())
    }
}

fn fixed_gateway(output: &str) -> TranslationGateway {
    let config = Config::default();
    let terminology = TerminologyStore::bootstrap(&BuiltinDataset).expect("seed");
    TranslationGateway::new(
        Arc::new(FixedEngine(output.to_string())),
        Pipeline::new(&config, terminology),
        &config,
    )
}

fn request(text: &str, source: &str, target: &str) -> TranslationRequest {
    TranslationRequest::new(text, source, target, None).expect("valid request")
}

fn passes_at_default(text: &str, target: Language) -> bool {
    PurityValidator::score_with(&RuleSet::builtin(), text, target, DEFAULT_THRESHOLD).passes
}

// ==================== Contamination Scenario Tests ====================

#[tokio::test]
async fn test_interface_artifacts_never_reach_output() {
    let server = mock_engine_answering("Lawyer Pro V2 AUTO-TRANSLATE", 1).await;
    let (gateway, _) = build(&server);

    let result = gateway
        .translate(&request("محامي Pro V2 AUTO-TRANSLATE", "ar", "en"))
        .await
        .expect("translate");

    assert_eq!(result.method, TranslationMethod::Primary);
    for token in ["Pro", "V2", "AUTO-TRANSLATE"] {
        assert!(!result.text.contains(token), "{} leaked into {:?}", token, result.text);
    }
    assert!(result.purity.target_script_ratio >= 0.90);
    assert!(passes_at_default(&result.text, Language::ENGLISH));
}

#[test]
fn test_stray_cyrillic_word_is_removed_alone() {
    let rules = RuleSet::builtin();
    let text = "The court dismissed дело the appeal.";

    let findings = rules.detect(text, Language::ENGLISH);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, PatternKind::ForeignScript);
    assert_eq!(findings[0].pattern, "дело");
    assert_eq!(&text[findings[0].position..findings[0].end()], "дело");

    let report = ContentCleaner::clean_with(&rules, text, Language::ENGLISH);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.cleaned_text, "The court dismissed the appeal.");
}

// ==================== Cache Tests ====================

#[tokio::test]
async fn test_identical_requests_hit_cache() {
    let server = mock_engine_answering("The lease agreement is terminated.", 1).await;
    let (gateway, _) = build(&server);

    let first = gateway
        .translate(&request("فسخ عقد الكراء", "ar", "en"))
        .await
        .unwrap();
    let second = gateway
        .translate(&request("فسخ عقد الكراء", "ar", "en"))
        .await
        .unwrap();

    assert_eq!(first.method, TranslationMethod::Primary);
    assert_eq!(second.method, TranslationMethod::CacheHit);
    assert_eq!(first.text, second.text);
    // MockServer verifies the single engine call on drop
}

// ==================== Fallback Tests ====================

#[tokio::test]
async fn test_fallback_under_saturated_engine() {
    let server = mock_engine_answering("Суд отклонил апелляцию 法院驳回上诉", 3).await;
    let (gateway, _) = build(&server);

    let requests = vec![
        request("The employer dismissed the employee", "en", "ar"),
        request("قام المشغل بطرد الأجير", "ar", "en"),
        request("The tenant stopped paying rent", "en", "ar"),
    ];
    for result in gateway.translate_batch(&requests).await {
        let result = result.expect("fallback, not an error");
        assert_eq!(result.method, TranslationMethod::Fallback);
        assert!(result.purity.passes);
        assert!(result.quality_score < 0.5);
    }
    assert_eq!(gateway.monitor().snapshot().fallbacks, 3);
}

#[tokio::test]
async fn test_engine_errors_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (gateway, _) = build(&server);

    let result = gateway
        .translate(&request("The court of appeal ruled", "en", "ar"))
        .await
        .unwrap();
    assert_eq!(result.method, TranslationMethod::Fallback);
    assert!(passes_at_default(&result.text, Language::ARABIC));
}

// ==================== Terminology Tests ====================

#[tokio::test]
async fn test_longest_term_wins_in_repair() {
    // The engine leaves the named code untranslated; the dictionary must
    // translate it as one unit rather than word by word
    let server = mock_engine_answering("code of civil procedure", 1).await;
    let (gateway, _) = build(&server);

    let result = gateway
        .translate(&request("code of civil procedure", "en", "ar"))
        .await
        .unwrap();
    assert_eq!(result.method, TranslationMethod::Primary);
    assert_eq!(result.text, "قانون المسطرة المدنية");
}

#[tokio::test]
async fn test_terminology_seed_from_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let seed_path = temp_dir.path().join("seed.json");
    std::fs::write(
        &seed_path,
        r#"[{"source_term":"usufruct","target_term":"حق الانتفاع","domain":"property","source_language":"en","target_language":"ar"}]"#,
    )
    .unwrap();

    let store = TerminologyStore::bootstrap(&JsonDataset::new(&seed_path)).unwrap();
    assert_eq!(
        store.bulk_apply("the usufruct", Language::ENGLISH, Language::ARABIC),
        "the حق الانتفاع"
    );
}

// ==================== Feedback Loop Tests ====================

#[tokio::test]
async fn test_reported_pattern_is_denied_afterwards() {
    let server = mock_engine_answering("The court dismissed the appeal. Share this answer", 2).await;
    let (gateway, feedback) = build(&server);
    let req = request("رفضت المحكمة الاستئناف", "ar", "en");

    let before = gateway.translate(&req).await.unwrap();
    assert!(before.text.contains("Share this answer"));

    let id = feedback.submit(
        "رفضت المحكمة الاستئناف",
        before.text.clone(),
        Issue::new(IssueKind::UiArtifact, "share button leaked").citing("Share this answer"),
        Some(Language::ENGLISH),
    );
    let summary = feedback.run_cycle().await;
    assert_eq!(summary.deployed, 1);
    assert_eq!(feedback.report(id).unwrap().status, ReportStatus::Closed);

    // The cached answer no longer validates under the new rules, so the
    // engine is asked again and its output cleaned
    let after = gateway.translate(&req).await.unwrap();
    assert_eq!(after.method, TranslationMethod::Primary);
    assert_eq!(after.text, "The court dismissed the appeal.");
}

#[tokio::test]
async fn test_rollback_restores_previous_behaviour() {
    let server = mock_engine_answering("The appeal is dismissed. Share this answer", 1).await;
    let (gateway, feedback) = build(&server);

    feedback.submit(
        "x",
        "The appeal is dismissed. Share this answer",
        Issue::new(IssueKind::UiArtifact, "").citing("Share this answer"),
        Some(Language::ENGLISH),
    );
    feedback.run_cycle().await;
    let enhancement = feedback.enhancements()[0].id;
    feedback.rollback(enhancement).await.unwrap();

    let result = gateway
        .translate(&request("رفض الاستئناف", "ar", "en"))
        .await
        .unwrap();
    assert!(result.text.ends_with("Share this answer"));
}

// ==================== Property Tests ====================

fn mixed_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex(
        "[a-zA-Z0-9 .,:;!?()\\-\\n\u{0627}\u{0628}\u{062A}\u{062D}\u{062F}\u{0631}\u{0633}\u{0639}\u{0641}\u{0642}\u{0643}\u{0644}\u{0645}\u{0646}\u{0647}\u{0648}\u{064A}\u{0434}\u{0436}\u{043B}\u{03B1}\u{00E9}\u{FFFD}\u{1F600}]{0,80}",
    )
    .expect("valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cleaning_is_idempotent(text in mixed_text(), arabic in any::<bool>()) {
        let rules = RuleSet::builtin();
        let target = if arabic { Language::ARABIC } else { Language::ENGLISH };

        let once = ContentCleaner::clean_with(&rules, &text, target);
        let twice = ContentCleaner::clean_with(&rules, &once.cleaned_text, target);

        prop_assert!(twice.removed.is_empty());
        prop_assert_eq!(&twice.cleaned_text, &once.cleaned_text);
        prop_assert!(rules.detect(&once.cleaned_text, target).is_empty());
        prop_assert!(once.confidence >= 0.0 && once.confidence <= 1.0);
    }

    #[test]
    fn prop_every_result_is_pure(output in mixed_text(), arabic in any::<bool>()) {
        let (source, target, text) = if arabic {
            ("en", Language::ARABIC, "The tenant shall pay the rent")
        } else {
            ("ar", Language::ENGLISH, "يؤدي المكتري الكراء")
        };
        let gateway = fixed_gateway(&output);
        let req = request(text, source, target.code());

        let result = tokio_test::block_on(gateway.translate(&req)).unwrap();

        prop_assert!(result.purity.passes);
        prop_assert!(passes_at_default(&result.text, target));
        prop_assert!(RuleSet::builtin().detect(&result.text, target).is_empty());
    }
}
