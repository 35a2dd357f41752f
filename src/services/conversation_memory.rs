//! 对话记忆
//!
//! 按 (用户, 课程) 维护有界的滑动窗口：最多保留 `max_history_pairs` 轮，
//! 且不保留早于 `max_age_minutes` 的记录。两个上限在每次写入时执行。
//!
//! 写入是“先删过期、再删最旧、最后插入”的读改写序列，同一个键上的 `append`
//! 与 `clear` 通过键级互斥锁串行执行，避免并发写入同时判断“未满”而越界。

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::config::MemoryConfig;
use crate::error::{AppError, Result};
use crate::models::{ConversationExchange, ConversationKey};
use crate::observability::AppMetrics;
use crate::storage::repository::ConversationRepository;

/// 提示词中历史对话的标题
pub const HISTORY_HEADER: &str = "Previous conversation with this student:";

/// 对话记忆
pub struct ConversationMemory {
    repository: Arc<dyn ConversationRepository>,
    max_history_pairs: usize,
    max_age: Duration,
    // 键级写锁，条目不会被回收
    write_locks: DashMap<ConversationKey, Arc<Mutex<()>>>,
    metrics: AppMetrics,
}

impl ConversationMemory {
    /// 保留时间超出 `chrono` 可表示的范围时返回 [`AppError::Config`]
    pub fn new(repository: Arc<dyn ConversationRepository>, config: &MemoryConfig) -> Result<Self> {
        let max_age = Duration::try_minutes(config.max_age_minutes).ok_or_else(|| {
            AppError::Config(format!(
                "memory.max_age_minutes out of range: {}",
                config.max_age_minutes
            ))
        })?;

        Ok(Self {
            repository,
            max_history_pairs: config.max_history_pairs,
            max_age,
            write_locks: DashMap::new(),
            metrics: AppMetrics::default(),
        })
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn max_history_pairs(&self) -> usize {
        self.max_history_pairs
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.max_age
    }

    fn write_lock(&self, key: &ConversationKey) -> Arc<Mutex<()>> {
        self.write_locks.entry(key.clone()).or_default().clone()
    }

    /// 最近的对话，新的在前
    pub async fn recent(&self, user_id: &str, course_id: &str) -> Result<Vec<ConversationExchange>> {
        self.recent_at(user_id, course_id, Utc::now()).await
    }

    /// 以 `now` 为当前时间计算最近的对话
    pub async fn recent_at(
        &self,
        user_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ConversationExchange>> {
        let key = ConversationKey::new(user_id, course_id);
        let cutoff = self.cutoff(now);

        let recent: Vec<ConversationExchange> = self
            .repository
            .find_by_key(&key)
            .await?
            .into_iter()
            .filter(|exchange| exchange.timestamp >= cutoff)
            .take(self.max_history_pairs)
            .collect();

        Ok(recent)
    }

    /// 记录一轮对话
    pub async fn append(
        &self,
        user_id: &str,
        course_id: &str,
        user_message: &str,
        tutor_response: &str,
    ) -> Result<ConversationExchange> {
        self.append_at(user_id, course_id, user_message, tutor_response, Utc::now())
            .await
    }

    /// 以 `now` 为记录时间写入一轮对话
    pub async fn append_at(
        &self,
        user_id: &str,
        course_id: &str,
        user_message: &str,
        tutor_response: &str,
        now: DateTime<Utc>,
    ) -> Result<ConversationExchange> {
        let key = ConversationKey::new(user_id, course_id);
        let lock = self.write_lock(&key);
        let _guard = lock.lock().await;

        let mut evicted = self
            .repository
            .delete_older_than(&key, self.cutoff(now))
            .await?;

        // 通常只需删除一条；窗口配置被调小时一次删到容量以下
        let remaining = self.repository.find_by_key(&key).await?;
        if remaining.len() >= self.max_history_pairs {
            let overflow = remaining.len() + 1 - self.max_history_pairs;
            for oldest in remaining.iter().rev().take(overflow) {
                if self.repository.delete(&oldest.id).await? {
                    evicted += 1;
                }
            }
        }

        let exchange = ConversationExchange::new(&key, user_message, tutor_response, now);
        let saved = self.repository.save(&exchange).await?;

        debug!(
            user_id,
            course_id, evicted, "Appended conversation exchange {}", saved.id
        );
        self.metrics.record_exchange(evicted);
        Ok(saved)
    }

    /// 渲染为提示词片段，旧的在前；没有历史时返回空字符串
    pub async fn format_for_prompt(&self, user_id: &str, course_id: &str) -> Result<String> {
        self.format_for_prompt_at(user_id, course_id, Utc::now())
            .await
    }

    pub async fn format_for_prompt_at(
        &self,
        user_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let recent = self.recent_at(user_id, course_id, now).await?;
        Ok(render_history(&recent))
    }

    /// 清空键下的所有对话
    pub async fn clear(&self, user_id: &str, course_id: &str) -> Result<usize> {
        let key = ConversationKey::new(user_id, course_id);
        let lock = self.write_lock(&key);
        let _guard = lock.lock().await;

        let removed = self.repository.delete_all(&key).await?;
        info!(user_id, course_id, removed, "Cleared conversation history");
        Ok(removed)
    }
}

/// `recent` 为新的在前，渲染时反转为旧的在前
fn render_history(recent: &[ConversationExchange]) -> String {
    if recent.is_empty() {
        return String::new();
    }

    let mut rendered = format!("{}\n", HISTORY_HEADER);
    for (index, exchange) in recent.iter().rev().enumerate() {
        rendered.push_str(&format!(
            "Exchange {}:\nStudent: {}\nTutor: {}\n\n",
            index + 1,
            exchange.user_message,
            exchange.tutor_response
        ));
    }
    rendered
}
