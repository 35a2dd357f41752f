//! 作业完成后的主动反馈

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::config::FeedbackConfig;
use crate::error::Result;
use crate::llm::{QueryOrchestrator, TemplateArg, prompts};
use crate::models::{FeedbackAnswer, FeedbackRecord, PlayerTypeProfile};
use crate::services::feedback_hub::FeedbackStreamHub;
use crate::services::personalization::PersonalizationPolicy;
use crate::services::providers::PlayerTypeProvider;

/// 作业完成事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentCompleted {
    pub user_id: String,
    pub course_id: String,
    pub assessment_id: String,
    /// 作业标题或简介，原样放入提示词
    pub assessment_title: String,
    pub correctness: f64,
    pub success: bool,
}

/// 反馈服务
pub struct FeedbackService {
    orchestrator: Arc<QueryOrchestrator>,
    hub: Arc<FeedbackStreamHub>,
    player_types: Arc<dyn PlayerTypeProvider>,
    policy: PersonalizationPolicy,
    fallback_text: String,
}

impl FeedbackService {
    pub fn new(
        orchestrator: Arc<QueryOrchestrator>,
        hub: Arc<FeedbackStreamHub>,
        player_types: Arc<dyn PlayerTypeProvider>,
        policy: PersonalizationPolicy,
        config: &FeedbackConfig,
    ) -> Self {
        Self {
            orchestrator,
            hub,
            player_types,
            policy,
            fallback_text: config.fallback_text.clone(),
        }
    }

    /// 生成反馈、保存并推送
    ///
    /// 模型失败时使用配置的通用反馈；只有存储失败会返回错误。
    pub async fn on_assessment_completed(&self, event: &AssessmentCompleted) -> Result<FeedbackRecord> {
        let correctness = event.correctness.clamp(0.0, 1.0);
        let profile = self.profile_or_none(&event.user_id).await;

        let args = [
            TemplateArg::new("assessment", event.assessment_title.as_str()),
            TemplateArg::new("correctness", format!("{:.0}%", correctness * 100.0)),
            TemplateArg::new("outcome", if event.success { "passed" } else { "not passed" }),
            TemplateArg::new(
                "performance",
                self.policy.performance_context(correctness, event.success),
            ),
            TemplateArg::new(
                "guidance",
                self.policy.individualized_guidance(profile.as_ref(), correctness),
            ),
        ];

        let fallback = FeedbackAnswer {
            feedback: self.fallback_text.clone(),
        };
        let answer = self
            .orchestrator
            .ask(&prompts::ASSESSMENT_FEEDBACK, &args, fallback)
            .await?;

        let record = FeedbackRecord::new(
            &event.user_id,
            &event.assessment_id,
            &answer.feedback,
            correctness,
            event.success,
        );
        let saved = self.hub.save_and_publish(&record).await?;

        info!(
            user_id = %event.user_id,
            course_id = %event.course_id,
            assessment_id = %event.assessment_id,
            "Generated assessment feedback"
        );
        Ok(saved)
    }

    async fn profile_or_none(&self, user_id: &str) -> Option<PlayerTypeProfile> {
        match self.player_types.profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, "Player type lookup failed, continuing without profile: {}", e);
                None
            }
        }
    }
}
