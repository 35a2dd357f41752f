//! 反馈记录数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化的反馈记录
///
/// 每个触发事件创建一次，创建后不可修改，只能通过“取出即删除”移除。
/// `id` 与 `created_at` 由存储在保存时分配。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// 记录唯一标识
    pub id: Option<String>,
    /// 用户 ID
    pub user_id: String,
    /// 作业/测验 ID
    pub assessment_id: String,
    /// 反馈文本
    pub feedback_text: String,
    /// 正确率，范围 [0, 1]
    pub correctness: f64,
    /// 是否通过
    pub success: bool,
    /// 创建时间
    pub created_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    /// 创建尚未保存的记录，正确率被限制在 [0, 1]
    pub fn new(
        user_id: &str,
        assessment_id: &str,
        feedback_text: &str,
        correctness: f64,
        success: bool,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            assessment_id: assessment_id.to_string(),
            feedback_text: feedback_text.to_string(),
            correctness: correctness.clamp(0.0, 1.0),
            success,
            created_at: None,
        }
    }

    /// 是否已被存储分配标识
    pub fn is_persisted(&self) -> bool {
        self.id.is_some() && self.created_at.is_some()
    }
}

/// 推送给订阅者的反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackDto {
    pub id: String,
    pub assessment_id: String,
    pub feedback_text: String,
    pub correctness: f64,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&FeedbackRecord> for FeedbackDto {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            id: record.id.clone().unwrap_or_default(),
            assessment_id: record.assessment_id.clone(),
            feedback_text: record.feedback_text.clone(),
            correctness: record.correctness,
            success: record.success,
            created_at: record.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_record_creation() {
        let record = FeedbackRecord::new("user_1", "quiz_1", "Well done", 1.4, true);
        assert_eq!(record.correctness, 1.0);
        assert!(!record.is_persisted());
    }

    #[test]
    fn test_dto_from_record() {
        let mut record = FeedbackRecord::new("user_1", "quiz_1", "Keep going", 0.5, false);
        record.id = Some("fb_1".into());
        record.created_at = Some(Utc::now());

        let dto = FeedbackDto::from(&record);
        assert_eq!(dto.id, "fb_1");
        assert_eq!(dto.assessment_id, "quiz_1");
        assert_eq!(Some(dto.created_at), record.created_at);
    }
}
