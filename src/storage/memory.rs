//! 进程内存储
//!
//! 测试与单机部署使用，进程退出后数据丢失。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ConversationExchange, ConversationKey, FeedbackRecord};
use crate::storage::repository::{ConversationRepository, FeedbackRepository};

/// 进程内对话记录仓储
#[derive(Default)]
pub struct InMemoryConversationRepository {
    exchanges: DashMap<ConversationKey, Vec<ConversationExchange>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 键下的记录数量（不做时间过滤）
    pub fn stored_count(&self, key: &ConversationKey) -> usize {
        self.exchanges.get(key).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Vec<ConversationExchange>> {
        let mut found = self
            .exchanges
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    async fn delete_older_than(
        &self,
        key: &ConversationKey,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let Some(mut entry) = self.exchanges.get_mut(key) else {
            return Ok(0);
        };
        let before = entry.len();
        entry.retain(|exchange| exchange.timestamp >= cutoff);
        Ok(before - entry.len())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        for mut entry in self.exchanges.iter_mut() {
            if let Some(pos) = entry.iter().position(|exchange| exchange.id == id) {
                entry.remove(pos);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn save(&self, exchange: &ConversationExchange) -> Result<ConversationExchange> {
        self.exchanges
            .entry(exchange.key())
            .or_default()
            .push(exchange.clone());
        Ok(exchange.clone())
    }

    async fn delete_all(&self, key: &ConversationKey) -> Result<usize> {
        Ok(self
            .exchanges
            .remove(key)
            .map(|(_, exchanges)| exchanges.len())
            .unwrap_or(0))
    }
}

/// 进程内反馈记录仓储
#[derive(Default)]
pub struct InMemoryFeedbackRepository {
    // 按保存顺序排列；创建时间相同时后保存者视为更新
    records: Mutex<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn latest_index<'a>(
    records: impl Iterator<Item = (usize, &'a FeedbackRecord)>,
) -> Option<usize> {
    records
        .max_by_key(|(_, record)| record.created_at)
        .map(|(index, _)| index)
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn save(&self, record: &FeedbackRecord) -> Result<FeedbackRecord> {
        let mut saved = record.clone();
        saved.id = Some(Uuid::new_v4().to_string());
        saved.created_at = Some(Utc::now());
        self.records.lock().push(saved.clone());
        Ok(saved)
    }

    async fn latest(&self, user_id: &str, assessment_id: &str) -> Result<Option<FeedbackRecord>> {
        let records = self.records.lock();
        let index = latest_index(records.iter().enumerate().filter(|(_, r)| {
            r.user_id == user_id && r.assessment_id == assessment_id
        }));
        Ok(index.map(|i| records[i].clone()))
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        let mut found: Vec<FeedbackRecord> = self
            .records
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // 稳定排序后反转：同一时间戳下后保存者在前
        found.sort_by_key(|r| r.created_at);
        found.reverse();
        Ok(found)
    }

    async fn fetch_and_delete_latest(&self, user_id: &str) -> Result<Option<String>> {
        let mut records = self.records.lock();
        let index = latest_index(records.iter().enumerate().filter(|(_, r)| r.user_id == user_id));
        Ok(index.map(|i| records.remove(i).feedback_text))
    }
}
