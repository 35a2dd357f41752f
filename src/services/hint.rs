//! 基于课程材料的学习提示

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::{QueryOrchestrator, TemplateArg, prompts};
use crate::models::{HintAnswer, SearchSegment};
use crate::services::providers::{ContentProvider, SemanticSearchProvider};

/// 无法生成提示时的回复
pub const HINT_FALLBACK: &str =
    "Sorry, I can't come up with a hint right now. Please try again in a moment.";

const NO_MATERIAL: &str = "No matching course material was found.";

/// 提示结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintResult {
    pub hint: String,
    /// 提示所依据的课程片段
    pub sources: Vec<SearchSegment>,
}

/// 提示服务
pub struct HintService {
    orchestrator: Arc<QueryOrchestrator>,
    content: Arc<dyn ContentProvider>,
    search: Arc<dyn SemanticSearchProvider>,
}

impl HintService {
    pub fn new(
        orchestrator: Arc<QueryOrchestrator>,
        content: Arc<dyn ContentProvider>,
        search: Arc<dyn SemanticSearchProvider>,
    ) -> Self {
        Self {
            orchestrator,
            content,
            search,
        }
    }

    /// 检索课程材料并生成提示；上游失败时按没有材料处理
    pub async fn hint(&self, user_id: &str, course_id: &str, question: &str) -> Result<HintResult> {
        let sources = self.relevant_segments(course_id, question).await;
        debug!(user_id, course_id, segments = sources.len(), "Retrieved hint material");

        let material = if sources.is_empty() {
            NO_MATERIAL.to_string()
        } else {
            sources
                .iter()
                .map(SearchSegment::render)
                .collect::<Vec<_>>()
                .join("\n")
        };

        let args = [
            TemplateArg::new("material", material),
            TemplateArg::new("question", question),
        ];
        let fallback = HintAnswer {
            hint: HINT_FALLBACK.to_string(),
        };
        let answer = self.orchestrator.ask(&prompts::HINT, &args, fallback).await?;

        Ok(HintResult {
            hint: answer.hint,
            sources,
        })
    }

    async fn relevant_segments(&self, course_id: &str, question: &str) -> Vec<SearchSegment> {
        let content_ids = match self.content.content_ids(course_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(course_id, "Content lookup failed: {}", e);
                return Vec::new();
            }
        };
        if content_ids.is_empty() {
            return Vec::new();
        }

        self.search
            .search(question, &content_ids)
            .await
            .unwrap_or_else(|e| {
                warn!(course_id, "Semantic search failed: {}", e);
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::llm::SchemaRegistry;
    use crate::llm::gateway::{GenerateResponse, MockLanguageModel};
    use async_trait::async_trait;

    struct FixedContent(Vec<String>);

    #[async_trait]
    impl ContentProvider for FixedContent {
        async fn content_ids(&self, _course_id: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct WhitelistSearch;

    #[async_trait]
    impl SemanticSearchProvider for WhitelistSearch {
        async fn search(&self, _query: &str, content_ids: &[String]) -> Result<Vec<SearchSegment>> {
            Ok(content_ids
                .iter()
                .map(|id| SearchSegment::Document {
                    content_id: id.clone(),
                    page: 3,
                    text: "A recursive function needs a base case".into(),
                })
                .collect())
        }
    }

    struct BrokenSearch;

    #[async_trait]
    impl SemanticSearchProvider for BrokenSearch {
        async fn search(&self, _query: &str, _content_ids: &[String]) -> Result<Vec<SearchSegment>> {
            Err(AppError::Provider("search index offline".into()))
        }
    }

    fn orchestrator(model: MockLanguageModel) -> Arc<QueryOrchestrator> {
        Arc::new(QueryOrchestrator::new(
            Arc::new(model),
            Arc::new(SchemaRegistry::new()),
        ))
    }

    #[tokio::test]
    async fn test_hint_uses_whitelisted_material() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .withf(|prompt, _| {
                prompt.contains("[document slides_1 p.3] A recursive function needs a base case")
                    && prompt.contains("Student question: Why does my function never stop?")
            })
            .times(1)
            .returning(|_, _| Ok(GenerateResponse::text(r#"{"hint":"What stops the recursion?"}"#)));

        let service = HintService::new(
            orchestrator(model),
            Arc::new(FixedContent(vec!["slides_1".into()])),
            Arc::new(WhitelistSearch),
        );
        let result = service
            .hint("u1", "c1", "Why does my function never stop?")
            .await
            .unwrap();

        assert_eq!(result.hint, "What stops the recursion?");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].content_id(), "slides_1");
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_no_material() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .withf(|prompt, _| prompt.contains(NO_MATERIAL))
            .times(1)
            .returning(|_, _| Ok(GenerateResponse::text(r#"{"hint":"Start from the definition."}"#)));

        let service = HintService::new(
            orchestrator(model),
            Arc::new(FixedContent(vec!["slides_1".into()])),
            Arc::new(BrokenSearch),
        );
        let result = service.hint("u1", "c1", "q").await.unwrap();

        assert_eq!(result.hint, "Start from the definition.");
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_output_returns_apology() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .returning(|_, _| Ok(GenerateResponse::text("Sure! Here is a hint: think about it.")));

        let service = HintService::new(
            orchestrator(model),
            Arc::new(FixedContent(Vec::new())),
            Arc::new(BrokenSearch),
        );
        let result = service.hint("u1", "c1", "q").await.unwrap();
        assert_eq!(result.hint, HINT_FALLBACK);
    }
}
