//! 存储工厂模块
//!
//! 根据配置创建相应的仓储实例。

use std::sync::Arc;
use tracing::info;

use crate::config::config::{DatabaseConfig, StorageBackend};
use crate::error::Result;
use crate::storage::memory::{InMemoryConversationRepository, InMemoryFeedbackRepository};
use crate::storage::repository::{ConversationRepository, FeedbackRepository};

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::{
    SurrealConversationRepository, SurrealFeedbackRepository, SurrealPool,
};

/// 仓储集合
#[derive(Clone)]
pub struct Repositories {
    pub conversations: Arc<dyn ConversationRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
}

impl Repositories {
    /// 进程内仓储
    pub fn in_memory() -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationRepository::new()),
            feedback: Arc::new(InMemoryFeedbackRepository::new()),
        }
    }
}

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建仓储
    pub async fn create(config: &DatabaseConfig) -> Result<Repositories> {
        match config.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Repositories::in_memory())
            }
            StorageBackend::Surrealdb => Self::create_surrealdb(config).await,
        }
    }

    #[cfg(feature = "surrealdb")]
    async fn create_surrealdb(config: &DatabaseConfig) -> Result<Repositories> {
        let pool = SurrealPool::new(config).await?;
        info!("Connected to SurrealDB at {}", config.url);
        Ok(Repositories {
            conversations: Arc::new(SurrealConversationRepository::new(&pool)),
            feedback: Arc::new(SurrealFeedbackRepository::new(&pool)),
        })
    }

    #[cfg(not(feature = "surrealdb"))]
    async fn create_surrealdb(_config: &DatabaseConfig) -> Result<Repositories> {
        Err(crate::error::AppError::Config(
            "SurrealDB feature is not enabled. Enable the 'surrealdb' feature to use it.".into(),
        ))
    }
}
