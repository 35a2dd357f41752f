//! 导师对话与问题分类

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::{QueryOrchestrator, QueryOutcome, TemplateArg, prompts};
use crate::models::{CategorizedQuestion, ChatAnswer};
use crate::services::conversation_memory::ConversationMemory;
use crate::services::personalization::PersonalizationPolicy;
use crate::services::providers::SkillLevelProvider;

/// 无法回答时的回复
pub const CHAT_FALLBACK: &str =
    "Sorry, I can't answer right now. Please try again in a moment.";

/// 对话服务
pub struct ChatService {
    orchestrator: Arc<QueryOrchestrator>,
    memory: Arc<ConversationMemory>,
    skills: Arc<dyn SkillLevelProvider>,
    policy: PersonalizationPolicy,
}

impl ChatService {
    pub fn new(
        orchestrator: Arc<QueryOrchestrator>,
        memory: Arc<ConversationMemory>,
        skills: Arc<dyn SkillLevelProvider>,
        policy: PersonalizationPolicy,
    ) -> Self {
        Self {
            orchestrator,
            memory,
            skills,
            policy,
        }
    }

    /// 回答学生的问题
    ///
    /// 只有模型真正给出的回答才写入对话记忆，兜底回复不会进入后续上下文。
    pub async fn answer(&self, user_id: &str, course_id: &str, question: &str) -> Result<String> {
        let history = self.memory.format_for_prompt(user_id, course_id).await?;
        let language = self.language_guidance(user_id).await;

        let args = [
            TemplateArg::new("language", language),
            TemplateArg::new("history", history),
            TemplateArg::new("question", question),
        ];
        let fallback = ChatAnswer {
            answer: CHAT_FALLBACK.to_string(),
        };

        match self
            .orchestrator
            .try_ask(&prompts::TUTOR_CHAT, &args, fallback)
            .await?
        {
            QueryOutcome::Answered(answer) => {
                self.memory
                    .append(user_id, course_id, question, &answer.answer)
                    .await?;
                Ok(answer.answer)
            }
            QueryOutcome::Fallback { value, .. } => {
                debug!(user_id, course_id, "Chat answered with fallback, history unchanged");
                Ok(value.answer)
            }
        }
    }

    /// 对学生问题分类
    pub async fn categorize(&self, question: &str) -> Result<CategorizedQuestion> {
        let args = [TemplateArg::new("question", question)];
        self.orchestrator
            .ask(
                &prompts::CATEGORIZE_QUESTION,
                &args,
                CategorizedQuestion::uncategorized(question),
            )
            .await
    }

    async fn language_guidance(&self, user_id: &str) -> &'static str {
        match self.skills.average_skill(user_id).await {
            Ok(Some(level)) => self.policy.skill_guidance(level),
            Ok(None) => "",
            Err(e) => {
                warn!(user_id, "Skill level lookup failed: {}", e);
                ""
            }
        }
    }
}
