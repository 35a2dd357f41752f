use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use uuid::Uuid;

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{ConversationExchange, ConversationKey, FeedbackRecord};
use crate::storage::repository::{ConversationRepository, FeedbackRepository};

const EXCHANGE_TABLE: &str = "conversation_exchange";
const FEEDBACK_TABLE: &str = "feedback";

/// SurrealDB 连接
#[derive(Clone)]
pub struct SurrealPool {
    db: Surreal<Any>,
}

impl SurrealPool {
    /// 建立连接并选择命名空间和数据库
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db: Surreal<Any> = connect(config.url.as_str()).await?;

        // 认证（内存引擎无需认证）
        if !config.username.is_empty() {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        Ok(Self { db })
    }

    /// 获取内部数据库实例
    pub fn inner(&self) -> Surreal<Any> {
        self.db.clone()
    }
}

fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Store(format!("Invalid stored timestamp: {}", millis)))
}

// 时间以毫秒整数存储，便于比较与排序
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExchangeRow {
    exchange_id: String,
    user_id: String,
    course_id: String,
    user_message: String,
    tutor_response: String,
    timestamp_ms: i64,
}

impl From<&ConversationExchange> for ExchangeRow {
    fn from(exchange: &ConversationExchange) -> Self {
        Self {
            exchange_id: exchange.id.clone(),
            user_id: exchange.user_id.clone(),
            course_id: exchange.course_id.clone(),
            user_message: exchange.user_message.clone(),
            tutor_response: exchange.tutor_response.clone(),
            timestamp_ms: to_millis(exchange.timestamp),
        }
    }
}

impl TryFrom<ExchangeRow> for ConversationExchange {
    type Error = AppError;

    fn try_from(row: ExchangeRow) -> Result<Self> {
        Ok(Self {
            id: row.exchange_id,
            user_id: row.user_id,
            course_id: row.course_id,
            user_message: row.user_message,
            tutor_response: row.tutor_response,
            timestamp: from_millis(row.timestamp_ms)?,
        })
    }
}

/// SurrealDB 对话记录仓储
#[derive(Clone)]
pub struct SurrealConversationRepository {
    db: Surreal<Any>,
}

impl SurrealConversationRepository {
    pub fn new(pool: &SurrealPool) -> Self {
        Self { db: pool.inner() }
    }
}

#[async_trait]
impl ConversationRepository for SurrealConversationRepository {
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Vec<ConversationExchange>> {
        let query = "
            SELECT * FROM conversation_exchange
            WHERE user_id = $user_id AND course_id = $course_id
            ORDER BY timestamp_ms DESC
        ";
        let rows: Vec<ExchangeRow> = self
            .db
            .query(query)
            .bind(("user_id", key.user_id.clone()))
            .bind(("course_id", key.course_id.clone()))
            .await?
            .take(0)?;
        rows.into_iter().map(ConversationExchange::try_from).collect()
    }

    async fn delete_older_than(
        &self,
        key: &ConversationKey,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let query = "
            DELETE conversation_exchange
            WHERE user_id = $user_id AND course_id = $course_id AND timestamp_ms < $cutoff
            RETURN BEFORE
        ";
        let removed: Vec<ExchangeRow> = self
            .db
            .query(query)
            .bind(("user_id", key.user_id.clone()))
            .bind(("course_id", key.course_id.clone()))
            .bind(("cutoff", to_millis(cutoff)))
            .await?
            .take(0)?;
        Ok(removed.len())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed: Option<ExchangeRow> = self.db.delete((EXCHANGE_TABLE, id.to_string())).await?;
        Ok(removed.is_some())
    }

    async fn save(&self, exchange: &ConversationExchange) -> Result<ConversationExchange> {
        let created: Option<ExchangeRow> = self
            .db
            .create((EXCHANGE_TABLE, exchange.id.clone()))
            .content(ExchangeRow::from(exchange))
            .await?;

        created
            .ok_or_else(|| AppError::Store(format!("Failed to create exchange: {}", exchange.id)))
            .and_then(ConversationExchange::try_from)
    }

    async fn delete_all(&self, key: &ConversationKey) -> Result<usize> {
        let query = "
            DELETE conversation_exchange
            WHERE user_id = $user_id AND course_id = $course_id
            RETURN BEFORE
        ";
        let removed: Vec<ExchangeRow> = self
            .db
            .query(query)
            .bind(("user_id", key.user_id.clone()))
            .bind(("course_id", key.course_id.clone()))
            .await?
            .take(0)?;
        Ok(removed.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedbackRow {
    record_id: String,
    user_id: String,
    assessment_id: String,
    feedback_text: String,
    correctness: f64,
    success: bool,
    created_ms: i64,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = AppError;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(Self {
            id: Some(row.record_id),
            user_id: row.user_id,
            assessment_id: row.assessment_id,
            feedback_text: row.feedback_text,
            correctness: row.correctness,
            success: row.success,
            created_at: Some(from_millis(row.created_ms)?),
        })
    }
}

/// SurrealDB 反馈记录仓储
#[derive(Clone)]
pub struct SurrealFeedbackRepository {
    db: Surreal<Any>,
}

impl SurrealFeedbackRepository {
    pub fn new(pool: &SurrealPool) -> Self {
        Self { db: pool.inner() }
    }

    async fn latest_row(&self, user_id: &str) -> Result<Option<FeedbackRow>> {
        let query = "
            SELECT * FROM feedback
            WHERE user_id = $user_id
            ORDER BY created_ms DESC
            LIMIT 1
        ";
        let rows: Vec<FeedbackRow> = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl FeedbackRepository for SurrealFeedbackRepository {
    async fn save(&self, record: &FeedbackRecord) -> Result<FeedbackRecord> {
        let record_id = Uuid::new_v4().to_string();
        let row = FeedbackRow {
            record_id: record_id.clone(),
            user_id: record.user_id.clone(),
            assessment_id: record.assessment_id.clone(),
            feedback_text: record.feedback_text.clone(),
            correctness: record.correctness,
            success: record.success,
            created_ms: to_millis(Utc::now()),
        };

        let created: Option<FeedbackRow> = self
            .db
            .create((FEEDBACK_TABLE, record_id.clone()))
            .content(row)
            .await?;

        created
            .ok_or_else(|| AppError::Store(format!("Failed to create feedback: {}", record_id)))
            .and_then(FeedbackRecord::try_from)
    }

    async fn latest(&self, user_id: &str, assessment_id: &str) -> Result<Option<FeedbackRecord>> {
        let query = "
            SELECT * FROM feedback
            WHERE user_id = $user_id AND assessment_id = $assessment_id
            ORDER BY created_ms DESC
            LIMIT 1
        ";
        let rows: Vec<FeedbackRow> = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("assessment_id", assessment_id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter().next().map(FeedbackRecord::try_from).transpose()
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        let query = "
            SELECT * FROM feedback
            WHERE user_id = $user_id
            ORDER BY created_ms DESC
        ";
        let rows: Vec<FeedbackRow> = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }

    async fn fetch_and_delete_latest(&self, user_id: &str) -> Result<Option<String>> {
        // 删除成功者才返回记录；并发调用方删除失败时重新选择
        loop {
            let Some(row) = self.latest_row(user_id).await? else {
                return Ok(None);
            };
            let removed: Option<FeedbackRow> =
                self.db.delete((FEEDBACK_TABLE, row.record_id.clone())).await?;
            if let Some(removed) = removed {
                return Ok(Some(removed.feedback_text));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn pool() -> SurrealPool {
        SurrealPool::new(&DatabaseConfig {
            url: "mem://".into(),
            namespace: "mentor".into(),
            database: "test".into(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_conversation_round_trip_and_pruning() {
        let repo = SurrealConversationRepository::new(&pool().await);
        let key = ConversationKey::new("u1", "c1");
        let now = Utc::now();

        for minutes in [1, 5, 45] {
            let exchange = ConversationExchange::new(
                &key,
                &format!("{} minutes ago", minutes),
                "ok",
                now - Duration::minutes(minutes),
            );
            repo.save(&exchange).await.unwrap();
        }

        let found = repo.find_by_key(&key).await.unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].user_message, "1 minutes ago");

        let removed = repo
            .delete_older_than(&key, now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        assert!(repo.delete(&found[1].id).await.unwrap());
        assert_eq!(repo.delete_all(&key).await.unwrap(), 1);
        assert!(repo.find_by_key(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_fetch_and_delete() {
        let repo = SurrealFeedbackRepository::new(&pool().await);
        let saved = repo
            .save(&FeedbackRecord::new("u1", "a1", "Nice work", 0.9, true))
            .await
            .unwrap();
        assert!(saved.is_persisted());
        assert_eq!(
            repo.latest("u1", "a1").await.unwrap().map(|r| r.feedback_text),
            Some("Nice work".to_string())
        );

        assert_eq!(
            repo.fetch_and_delete_latest("u1").await.unwrap().as_deref(),
            Some("Nice work")
        );
        assert!(repo.fetch_and_delete_latest("u1").await.unwrap().is_none());
        assert!(repo.all_for_user("u1").await.unwrap().is_empty());
    }
}
