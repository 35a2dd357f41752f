//! 上游服务接口
//!
//! 玩家类型、技能水平、课程内容与语义检索由外部服务提供，这里只定义输入输出契约。
//! 实现失败时返回 [`AppError::Provider`](crate::error::AppError::Provider)。

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::models::{PlayerTypeProfile, SearchSegment};

/// 玩家类型画像查询；用户没有画像是正常情况
#[async_trait]
pub trait PlayerTypeProvider: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<PlayerTypeProfile>>;
}

/// 平均技能水平查询，范围 [0, 1]
#[async_trait]
pub trait SkillLevelProvider: Send + Sync {
    async fn average_skill(&self, user_id: &str) -> Result<Option<f64>>;
}

/// 课程内容 ID 查询
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn content_ids(&self, course_id: &str) -> Result<Vec<String>>;
}

/// 语义检索，只在白名单内容中检索
#[async_trait]
pub trait SemanticSearchProvider: Send + Sync {
    async fn search(&self, query: &str, content_ids: &[String]) -> Result<Vec<SearchSegment>>;
}

/// 进程内玩家类型画像，后写覆盖先写
#[derive(Default)]
pub struct InMemoryPlayerTypes {
    profiles: DashMap<String, PlayerTypeProfile>,
}

impl InMemoryPlayerTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入画像，返回被覆盖的旧画像
    pub fn upsert(&self, profile: PlayerTypeProfile) -> Option<PlayerTypeProfile> {
        self.profiles.insert(profile.user_id.clone(), profile)
    }
}

#[async_trait]
impl PlayerTypeProvider for InMemoryPlayerTypes {
    async fn profile(&self, user_id: &str) -> Result<Option<PlayerTypeProfile>> {
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }
}

/// 进程内技能水平
#[derive(Default)]
pub struct InMemorySkillLevels {
    levels: DashMap<String, f64>,
}

impl InMemorySkillLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: &str, level: f64) {
        self.levels.insert(user_id.to_string(), level.clamp(0.0, 1.0));
    }
}

#[async_trait]
impl SkillLevelProvider for InMemorySkillLevels {
    async fn average_skill(&self, user_id: &str) -> Result<Option<f64>> {
        Ok(self.levels.get(user_id).map(|entry| *entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerType, PlayerTypeScores};

    #[tokio::test]
    async fn test_player_type_last_write_wins() {
        let provider = InMemoryPlayerTypes::new();
        assert!(provider.profile("u1").await.unwrap().is_none());

        provider.upsert(PlayerTypeProfile::new(
            "u1",
            PlayerType::Achiever,
            PlayerTypeScores::default(),
        ));
        let previous = provider.upsert(PlayerTypeProfile::new(
            "u1",
            PlayerType::Player,
            PlayerTypeScores::default(),
        ));

        assert_eq!(previous.map(|p| p.primary_type), Some(PlayerType::Achiever));
        let current = provider.profile("u1").await.unwrap().unwrap();
        assert_eq!(current.primary_type, PlayerType::Player);
    }

    #[tokio::test]
    async fn test_skill_levels_are_clamped() {
        let provider = InMemorySkillLevels::new();
        provider.set("u1", 1.7);
        assert_eq!(provider.average_skill("u1").await.unwrap(), Some(1.0));
        assert_eq!(provider.average_skill("u2").await.unwrap(), None);
    }
}
