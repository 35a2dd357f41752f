// Integration tests for the tutoring services
//
// Tests cover:
// - Assessment feedback: generation, persistence, live push and pull delivery
// - Tutor chat: history carried between turns, fallback on model failure
// - Hints grounded in whitelisted course material
// - Assembly from configuration

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mentor::config::AppConfig;
use mentor::error::Result;
use mentor::llm::OllamaGateway;
use mentor::models::{PlayerType, PlayerTypeProfile, PlayerTypeScores, SearchSegment};
use mentor::services::{
    AssessmentCompleted, CHAT_FALLBACK, ContentProvider, InMemoryPlayerTypes, InMemorySkillLevels,
    Providers, SemanticSearchProvider, TutoringServices,
};
use mentor::storage::{Repositories, StorageFactory};

struct CourseContent;

#[async_trait]
impl ContentProvider for CourseContent {
    async fn content_ids(&self, course_id: &str) -> Result<Vec<String>> {
        Ok(vec![format!("{}_slides", course_id), format!("{}_lecture", course_id)])
    }
}

struct LectureSearch;

#[async_trait]
impl SemanticSearchProvider for LectureSearch {
    async fn search(&self, _query: &str, content_ids: &[String]) -> Result<Vec<SearchSegment>> {
        Ok(content_ids
            .iter()
            .filter(|id| id.ends_with("_lecture"))
            .map(|id| SearchSegment::Media {
                content_id: id.clone(),
                start_seconds: 95,
                text: "Every recursive call must move towards the base case".into(),
            })
            .collect())
    }
}

fn providers(player_types: Arc<InMemoryPlayerTypes>) -> Providers {
    Providers {
        player_types,
        skill_levels: Arc::new(InMemorySkillLevels::new()),
        content: Arc::new(CourseContent),
        search: Arc::new(LectureSearch),
    }
}

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::development();
    config.llm.base_url = server.uri();
    config
}

fn services(server: &MockServer, player_types: Arc<InMemoryPlayerTypes>) -> TutoringServices {
    let config = config_for(server);
    let gateway = OllamaGateway::new(&config.llm).unwrap();
    TutoringServices::build(
        &config,
        Repositories::in_memory(),
        providers(player_types),
        Arc::new(gateway),
    )
    .unwrap()
}

fn model_says(output: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "llama3.1",
        "response": output.to_string(),
        "done": true,
        "total_duration": 1200000,
        "eval_count": 42
    }))
}

// ============ Assessment Feedback ============

#[tokio::test]
async fn test_feedback_is_pushed_to_subscriber_and_pullable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("completed assignment"))
        .respond_with(model_says(json!({"feedback": "Great job on recursion!"})))
        .expect(1)
        .mount(&server)
        .await;

    let player_types = Arc::new(InMemoryPlayerTypes::new());
    player_types.upsert(PlayerTypeProfile::new(
        "u1",
        PlayerType::Socialiser,
        PlayerTypeScores::default(),
    ));
    let services = services(&server, player_types);

    let mut subscription = services.hub.subscribe("u1");
    let saved = services
        .feedback
        .on_assessment_completed(&AssessmentCompleted {
            user_id: "u1".into(),
            course_id: "c1".into(),
            assessment_id: "quiz_7".into(),
            assessment_title: "Recursion quiz".into(),
            correctness: 0.85,
            success: true,
        })
        .await
        .unwrap();

    let pushed = subscription.next().await.unwrap();
    assert_eq!(Some(pushed.id.clone()), saved.id);
    assert_eq!(pushed.feedback_text, "Great job on recursion!");
    assert_eq!(pushed.assessment_id, "quiz_7");

    assert_eq!(
        services.hub.fetch_and_delete_latest("u1").await.unwrap().as_deref(),
        Some("Great job on recursion!")
    );
    assert!(services.hub.fetch_and_delete_latest("u1").await.unwrap().is_none());
    assert_eq!(services.metrics.feedback_saved_total.load(Ordering::SeqCst), 1);
    assert_eq!(services.metrics.feedback_live_deliveries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_feedback_survives_model_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let services = services(&server, Arc::new(InMemoryPlayerTypes::new()));
    let saved = services
        .feedback
        .on_assessment_completed(&AssessmentCompleted {
            user_id: "u2".into(),
            course_id: "c1".into(),
            assessment_id: "quiz_1".into(),
            assessment_title: "Loops".into(),
            correctness: 0.3,
            success: false,
        })
        .await
        .unwrap();

    assert_eq!(saved.feedback_text, AppConfig::development().feedback.fallback_text);
    assert_eq!(services.metrics.fallbacks_total(), 1);
    assert_eq!(services.hub.all_for_user("u2").await.unwrap().len(), 1);
}

// ============ Tutor Chat ============

#[tokio::test]
async fn test_chat_remembers_answered_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Tutor: A function that calls itself."))
        .respond_with(model_says(json!({"answer": "For example factorial."})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("patient tutor"))
        .respond_with(model_says(json!({"answer": "A function that calls itself."})))
        .with_priority(2)
        .mount(&server)
        .await;

    let services = services(&server, Arc::new(InMemoryPlayerTypes::new()));

    let first = services.chat.answer("u1", "c1", "What is recursion?").await.unwrap();
    assert_eq!(first, "A function that calls itself.");

    let second = services.chat.answer("u1", "c1", "An example?").await.unwrap();
    assert_eq!(second, "For example factorial.");

    let recent = services.memory.recent("u1", "c1").await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].user_message, "An example?");

    // 其他课程的对话互不影响
    assert!(services.memory.recent("u1", "c2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_fallback_on_garbled_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "I think the answer is 42",
            "done": true
        })))
        .mount(&server)
        .await;

    let services = services(&server, Arc::new(InMemoryPlayerTypes::new()));
    let answer = services.chat.answer("u1", "c1", "What is 6 * 7?").await.unwrap();

    assert_eq!(answer, CHAT_FALLBACK);
    assert!(services.memory.recent("u1", "c1").await.unwrap().is_empty());
    assert_eq!(services.metrics.llm_fallback_parse.load(Ordering::SeqCst), 1);
}

// ============ Hints ============

#[tokio::test]
async fn test_hint_cites_course_material() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("[video c1_lecture at 1:35]"))
        .respond_with(model_says(json!({"hint": "Check your base case."})))
        .expect(1)
        .mount(&server)
        .await;

    let services = services(&server, Arc::new(InMemoryPlayerTypes::new()));
    let result = services
        .hints
        .hint("u1", "c1", "Why does my recursion overflow?")
        .await
        .unwrap();

    assert_eq!(result.hint, "Check your base case.");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].content_id(), "c1_lecture");
}

// ============ Assembly ============

#[tokio::test]
async fn test_services_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Classify the following"))
        .respond_with(model_says(json!({
            "category": "technical",
            "summary": "Cannot log in to the platform"
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let repositories = StorageFactory::create(&config.database).await.unwrap();
    let services = TutoringServices::from_config(
        &config,
        repositories,
        providers(Arc::new(InMemoryPlayerTypes::new())),
    )
    .unwrap();

    let categorized = services.chat.categorize("The login page is broken").await.unwrap();
    assert_eq!(categorized.summary, "Cannot log in to the platform");
    assert_eq!(services.metrics.llm_answered_total.load(Ordering::SeqCst), 1);
}
