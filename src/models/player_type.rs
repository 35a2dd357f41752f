//! Hexad 玩家类型画像
//!
//! 六种玩家类型的百分比得分，用于调整反馈的语气和内容。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hexad 玩家类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerType {
    Achiever,
    Player,
    Socialiser,
    FreeSpirit,
    Philanthropist,
    Disruptor,
}

impl PlayerType {
    /// 所有类型
    pub const ALL: [PlayerType; 6] = [
        PlayerType::Achiever,
        PlayerType::Player,
        PlayerType::Socialiser,
        PlayerType::FreeSpirit,
        PlayerType::Philanthropist,
        PlayerType::Disruptor,
    ];

    /// 拥有直接指导规则的类型
    pub fn has_direct_guidance(&self) -> bool {
        !matches!(self, PlayerType::Disruptor | PlayerType::FreeSpirit)
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerType::Achiever => "ACHIEVER",
            PlayerType::Player => "PLAYER",
            PlayerType::Socialiser => "SOCIALISER",
            PlayerType::FreeSpirit => "FREE_SPIRIT",
            PlayerType::Philanthropist => "PHILANTHROPIST",
            PlayerType::Disruptor => "DISRUPTOR",
        };
        f.write_str(name)
    }
}

/// 六项得分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTypeScores {
    pub achiever: f64,
    pub player: f64,
    pub socialiser: f64,
    pub free_spirit: f64,
    pub philanthropist: f64,
    pub disruptor: f64,
}

impl PlayerTypeScores {
    /// 获取指定类型的得分
    pub fn get(&self, player_type: PlayerType) -> f64 {
        match player_type {
            PlayerType::Achiever => self.achiever,
            PlayerType::Player => self.player,
            PlayerType::Socialiser => self.socialiser,
            PlayerType::FreeSpirit => self.free_spirit,
            PlayerType::Philanthropist => self.philanthropist,
            PlayerType::Disruptor => self.disruptor,
        }
    }

    /// 得分最高的类型
    pub fn dominant(&self) -> PlayerType {
        PlayerType::ALL
            .into_iter()
            .fold(PlayerType::Achiever, |best, candidate| {
                if self.get(candidate) > self.get(best) {
                    candidate
                } else {
                    best
                }
            })
    }
}

/// 用户的玩家类型画像，每个用户一份，后写覆盖先写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTypeProfile {
    pub user_id: String,
    pub primary_type: PlayerType,
    pub scores: PlayerTypeScores,
}

impl PlayerTypeProfile {
    pub fn new(user_id: &str, primary_type: PlayerType, scores: PlayerTypeScores) -> Self {
        Self {
            user_id: user_id.to_string(),
            primary_type,
            scores,
        }
    }

    /// 由得分推导主类型
    pub fn from_scores(user_id: &str, scores: PlayerTypeScores) -> Self {
        let primary_type = scores.dominant();
        Self::new(user_id, primary_type, scores)
    }

    pub fn score(&self, player_type: PlayerType) -> f64 {
        self.scores.get(player_type)
    }
}
