use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 对话窗口的复合键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    /// 用户 ID
    pub user_id: String,
    /// 课程 ID
    pub course_id: String,
}

impl ConversationKey {
    pub fn new(user_id: &str, course_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
        }
    }
}

/// 一次学生提问与导师回答
///
/// 每次成功的对话都会创建一条记录，超过保留时间或窗口容量时被淘汰。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExchange {
    /// 记录唯一标识
    pub id: String,
    /// 用户 ID
    pub user_id: String,
    /// 课程 ID
    pub course_id: String,
    /// 学生消息
    pub user_message: String,
    /// 导师回答
    pub tutor_response: String,
    /// 记录时间
    pub timestamp: DateTime<Utc>,
}

impl ConversationExchange {
    /// 创建新记录
    pub fn new(
        key: &ConversationKey,
        user_message: &str,
        tutor_response: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: key.user_id.clone(),
            course_id: key.course_id.clone(),
            user_message: user_message.to_string(),
            tutor_response: tutor_response.to_string(),
            timestamp,
        }
    }

    /// 记录所属的复合键
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.user_id, &self.course_id)
    }
}
