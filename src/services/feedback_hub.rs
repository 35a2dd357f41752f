//! 反馈推送中心
//!
//! 每个用户一个多播通道，首次订阅时创建，进程内一直存在，不做回收。
//! 每个订阅者持有独立的无界队列，慢消费者不会丢消息。
//!
//! 只有 `subscribe` 会创建通道；在用户订阅之前 `publish` 不做实时推送，
//! 记录仍保存在存储中，可通过 `fetch_and_delete_latest` 拉取。

use futures_util::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{FeedbackDto, FeedbackRecord};
use crate::observability::AppMetrics;
use crate::storage::repository::FeedbackRepository;

/// 单个用户的通道
#[derive(Default)]
struct UserChannel {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<FeedbackDto>)>>,
}

impl UserChannel {
    fn attach(&self) -> (u64, mpsc::UnboundedReceiver<FeedbackDto>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((id, tx));
        (id, rx)
    }

    fn detach(&self, id: u64) {
        self.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
    }

    /// 投递给所有订阅者，顺带清理已关闭的订阅
    fn send(&self, dto: &FeedbackDto) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, tx)| tx.send(dto.clone()).is_ok());
        subscribers.len()
    }

    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// 一个订阅
///
/// 作为 `Stream` 读取推送的反馈。`cancel` 或 drop 只移除自身，不影响同一用户的其他订阅。
pub struct FeedbackSubscription {
    id: u64,
    user_id: String,
    channel: Arc<UserChannel>,
    inner: UnboundedReceiverStream<FeedbackDto>,
}

impl FeedbackSubscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// 取消订阅
    pub fn cancel(self) {
        debug!(user_id = %self.user_id, "Feedback subscription {} cancelled", self.id);
    }
}

impl Stream for FeedbackSubscription {
    type Item = FeedbackDto;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for FeedbackSubscription {
    fn drop(&mut self) {
        self.channel.detach(self.id);
    }
}

/// 反馈推送中心
pub struct FeedbackStreamHub {
    store: Arc<dyn FeedbackRepository>,
    channels: DashMap<String, Arc<UserChannel>>,
    metrics: AppMetrics,
}

impl FeedbackStreamHub {
    pub fn new(store: Arc<dyn FeedbackRepository>) -> Self {
        Self {
            store,
            channels: DashMap::new(),
            metrics: AppMetrics::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// 订阅用户的反馈推送，必要时创建通道
    pub fn subscribe(&self, user_id: &str) -> FeedbackSubscription {
        let channel = self
            .channels
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user_id, "Created feedback channel");
                Arc::new(UserChannel::default())
            })
            .clone();

        let (id, rx) = channel.attach();
        debug!(user_id, "Feedback subscription {} attached", id);

        FeedbackSubscription {
            id,
            user_id: user_id.to_string(),
            channel,
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// 实时推送一条已保存的记录，返回收到推送的订阅者数量
    ///
    /// 用户没有通道时不做任何事。
    pub fn publish(&self, user_id: &str, record: &FeedbackRecord) -> usize {
        let Some(channel) = self.channels.get(user_id).map(|c| c.value().clone()) else {
            debug!(user_id, "No feedback channel, skipping live delivery");
            return 0;
        };
        channel.send(&FeedbackDto::from(record))
    }

    /// 先写存储再推送；存储失败时不推送
    pub async fn save_and_publish(&self, record: &FeedbackRecord) -> Result<FeedbackRecord> {
        let saved = self.store.save(record).await?;
        let deliveries = self.publish(&saved.user_id, &saved);
        self.metrics.record_feedback(deliveries);

        info!(
            user_id = %saved.user_id,
            assessment_id = %saved.assessment_id,
            deliveries,
            "Feedback saved"
        );
        Ok(saved)
    }

    pub async fn latest(&self, user_id: &str, assessment_id: &str) -> Result<Option<FeedbackRecord>> {
        self.store.latest(user_id, assessment_id).await
    }

    pub async fn all_for_user(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        self.store.all_for_user(user_id).await
    }

    /// 拉取并删除最新的一条反馈
    pub async fn fetch_and_delete_latest(&self, user_id: &str) -> Result<Option<String>> {
        self.store.fetch_and_delete_latest(user_id).await
    }

    /// 用户当前的订阅者数量
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.channels.get(user_id).map(|c| c.len()).unwrap_or(0)
    }

    /// 已创建的通道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryFeedbackRepository;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    fn hub() -> FeedbackStreamHub {
        FeedbackStreamHub::new(Arc::new(InMemoryFeedbackRepository::new()))
    }

    fn record(user_id: &str, text: &str) -> FeedbackRecord {
        FeedbackRecord::new(user_id, "quiz_1", text, 0.9, true)
    }

    #[tokio::test]
    async fn test_publish_before_subscribe_is_pull_only() {
        let hub = hub();
        let saved = hub.save_and_publish(&record("u1", "Nice work")).await.unwrap();
        assert!(saved.is_persisted());
        assert_eq!(hub.channel_count(), 0);

        let mut late = hub.subscribe("u1");
        assert!(
            timeout(Duration::from_millis(50), late.next())
                .await
                .is_err()
        );

        assert_eq!(
            hub.fetch_and_delete_latest("u1").await.unwrap().as_deref(),
            Some("Nice work")
        );
        assert!(hub.fetch_and_delete_latest("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let hub = hub();
        let mut first = hub.subscribe("u1");
        let mut second = hub.subscribe("u1");

        hub.save_and_publish(&record("u1", "one")).await.unwrap();
        hub.save_and_publish(&record("u1", "two")).await.unwrap();
        hub.save_and_publish(&record("u2", "not for u1")).await.unwrap();

        for subscription in [&mut first, &mut second] {
            assert_eq!(subscription.next().await.unwrap().feedback_text, "one");
            assert_eq!(subscription.next().await.unwrap().feedback_text, "two");
        }
        assert_eq!(hub.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_does_not_affect_other_subscribers() {
        let hub = hub();
        let first = hub.subscribe("u1");
        let mut second = hub.subscribe("u1");
        assert_eq!(hub.subscriber_count("u1"), 2);

        first.cancel();
        assert_eq!(hub.subscriber_count("u1"), 1);

        hub.save_and_publish(&record("u1", "still delivered")).await.unwrap();
        let dto = second.next().await.unwrap();
        assert_eq!(dto.feedback_text, "still delivered");

        // 存储不受取消影响
        assert_eq!(hub.all_for_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_keeps_every_record() {
        let hub = hub();
        let subscription = hub.subscribe("u1");

        for i in 0..100 {
            let saved = FeedbackRecord {
                id: Some(format!("fb_{}", i)),
                created_at: Some(chrono::Utc::now()),
                ..record("u1", &format!("feedback {}", i))
            };
            assert_eq!(hub.publish("u1", &saved), 1);
        }

        let received: Vec<FeedbackDto> = subscription.take(100).collect().await;
        assert_eq!(received.len(), 100);
        assert_eq!(received[99].feedback_text, "feedback 99");
    }

    #[tokio::test]
    async fn test_channel_survives_last_unsubscribe() {
        let hub = hub();
        drop(hub.subscribe("u1"));

        assert_eq!(hub.channel_count(), 1);
        assert_eq!(hub.subscriber_count("u1"), 0);
        assert_eq!(hub.publish("u1", &record("u1", "nobody listening")), 0);
    }
}
