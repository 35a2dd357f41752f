//! 服务模块
//!
//! 对话记忆、个性化策略、反馈推送以及基于它们的反馈、提示与对话功能。

pub mod chat;
pub mod conversation_memory;
pub mod feedback;
pub mod feedback_hub;
pub mod hint;
pub mod personalization;
pub mod providers;

pub use chat::{CHAT_FALLBACK, ChatService};
pub use conversation_memory::ConversationMemory;
pub use feedback::{AssessmentCompleted, FeedbackService};
pub use feedback_hub::{FeedbackStreamHub, FeedbackSubscription};
pub use hint::{HINT_FALLBACK, HintResult, HintService};
pub use personalization::PersonalizationPolicy;
pub use providers::{
    ContentProvider, InMemoryPlayerTypes, InMemorySkillLevels, PlayerTypeProvider,
    SemanticSearchProvider, SkillLevelProvider,
};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::{LanguageModel, OllamaGateway, QueryOrchestrator, SchemaRegistry};
use crate::observability::AppMetrics;
use crate::storage::Repositories;

/// 上游服务集合
#[derive(Clone)]
pub struct Providers {
    pub player_types: Arc<dyn PlayerTypeProvider>,
    pub skill_levels: Arc<dyn SkillLevelProvider>,
    pub content: Arc<dyn ContentProvider>,
    pub search: Arc<dyn SemanticSearchProvider>,
}

/// 组装好的全部服务
pub struct TutoringServices {
    pub memory: Arc<ConversationMemory>,
    pub hub: Arc<FeedbackStreamHub>,
    pub feedback: FeedbackService,
    pub hints: HintService,
    pub chat: ChatService,
    pub metrics: AppMetrics,
}

impl TutoringServices {
    /// 使用配置中的 Ollama 端点组装服务
    pub fn from_config(
        config: &AppConfig,
        repositories: Repositories,
        providers: Providers,
    ) -> Result<Self> {
        let gateway: Arc<dyn LanguageModel> = Arc::new(OllamaGateway::new(&config.llm)?);
        Self::build(config, repositories, providers, gateway)
    }

    /// 使用任意语言模型实现组装服务
    pub fn build(
        config: &AppConfig,
        repositories: Repositories,
        providers: Providers,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let metrics = AppMetrics::default();
        let orchestrator = Arc::new(
            QueryOrchestrator::new(model, Arc::new(SchemaRegistry::new()))
                .with_metrics(metrics.clone()),
        );
        let policy = PersonalizationPolicy::new(&config.personalization);

        let memory = Arc::new(
            ConversationMemory::new(repositories.conversations, &config.memory)?
                .with_metrics(metrics.clone()),
        );
        let hub = Arc::new(
            FeedbackStreamHub::new(repositories.feedback).with_metrics(metrics.clone()),
        );

        let feedback = FeedbackService::new(
            orchestrator.clone(),
            hub.clone(),
            providers.player_types,
            policy.clone(),
            &config.feedback,
        );
        let hints = HintService::new(orchestrator.clone(), providers.content, providers.search);
        let chat = ChatService::new(orchestrator, memory.clone(), providers.skill_levels, policy);

        Ok(Self {
            memory,
            hub,
            feedback,
            hints,
            chat,
            metrics,
        })
    }
}
