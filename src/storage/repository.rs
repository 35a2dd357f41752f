//! 仓储接口
//!
//! 对话窗口与反馈记录的持久化契约。任何可按键检索的持久化存储都可以实现这些接口，
//! 实现返回的错误统一为 [`AppError::Store`](crate::error::AppError::Store)。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ConversationExchange, ConversationKey, FeedbackRecord};

/// 对话记录仓储
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 按时间倒序返回键下的所有记录
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Vec<ConversationExchange>>;

    /// 删除键下早于 `cutoff` 的记录，返回删除数量
    async fn delete_older_than(&self, key: &ConversationKey, cutoff: DateTime<Utc>)
    -> Result<usize>;

    /// 删除单条记录
    async fn delete(&self, id: &str) -> Result<bool>;

    /// 保存记录
    async fn save(&self, exchange: &ConversationExchange) -> Result<ConversationExchange>;

    /// 删除键下的所有记录
    async fn delete_all(&self, key: &ConversationKey) -> Result<usize>;
}

/// 反馈记录仓储
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// 保存记录，分配 `id` 与 `created_at`
    async fn save(&self, record: &FeedbackRecord) -> Result<FeedbackRecord>;

    /// 用户在某次作业上的最新记录
    async fn latest(&self, user_id: &str, assessment_id: &str) -> Result<Option<FeedbackRecord>>;

    /// 用户的所有记录，按创建时间倒序
    async fn all_for_user(&self, user_id: &str) -> Result<Vec<FeedbackRecord>>;

    /// 原子地取出并删除用户最新的一条记录，返回其反馈文本
    async fn fetch_and_delete_latest(&self, user_id: &str) -> Result<Option<String>>;
}
