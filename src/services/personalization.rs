//! 个性化策略
//!
//! 根据 Hexad 玩家类型画像、正确率与技能水平生成插入提示词的指导语句。纯函数，无副作用。

use crate::config::config::PersonalizationConfig;
use crate::models::{PlayerType, PlayerTypeProfile};

pub const NEARLY_PERFECT: &str = "nearly perfect performance";
pub const SOLID_UNDERSTANDING: &str = "solid understanding demonstrated";
pub const SIGNIFICANT_GAPS: &str = "significant gaps in understanding";

pub const ACHIEVER_NEXT_CHALLENGE: &str = "Congratulate the student on mastering this assignment and suggest taking on the next challenge.";
pub const ACHIEVER_REPEAT: &str =
    "Encourage the student to repeat the assignment to reach a perfect result.";
pub const SOCIAL_HELP_PEERS: &str = "Congratulate the student and suggest helping fellow students who are still working on this topic.";
pub const SOCIAL_REVIEW_WITH_PEERS: &str =
    "Suggest reviewing the material together with fellow students.";
pub const PLAYER_UNLOCK_NEXT: &str = "Congratulate the student and suggest tackling the next challenge to unlock more rewards.";
pub const PLAYER_REPEAT_FOR_REWARDS: &str =
    "Suggest repeating the assignment to unlock the full rewards.";

pub const SKILL_SIMPLE: &str =
    "Use encouraging, simple language and avoid technical jargon.";
pub const SKILL_BALANCED: &str =
    "Give balanced feedback using moderately technical language.";
pub const SKILL_ADVANCED: &str = "Use advanced terminology and go into technical depth.";

/// 没有直接规则的类型改用得分最高的类型；得分相同时按此顺序取靠前者
const FALLBACK_ORDER: [PlayerType; 4] = [
    PlayerType::Achiever,
    PlayerType::Socialiser,
    PlayerType::Philanthropist,
    PlayerType::Player,
];

/// 个性化策略
#[derive(Debug, Clone)]
pub struct PersonalizationPolicy {
    correctness_max: f64,
    correctness_high: f64,
    skill_low: f64,
    skill_high: f64,
}

impl Default for PersonalizationPolicy {
    fn default() -> Self {
        Self::new(&PersonalizationConfig::default())
    }
}

impl PersonalizationPolicy {
    pub fn new(config: &PersonalizationConfig) -> Self {
        Self {
            correctness_max: config.correctness_max,
            correctness_high: config.correctness_high,
            skill_low: config.skill_low,
            skill_high: config.skill_high,
        }
    }

    /// 表现描述
    pub fn performance_context(&self, correctness: f64, success: bool) -> &'static str {
        if success && correctness >= self.correctness_max {
            NEARLY_PERFECT
        } else if success && correctness >= self.correctness_high {
            SOLID_UNDERSTANDING
        } else {
            SIGNIFICANT_GAPS
        }
    }

    /// 按玩家类型给出的个性化指导；没有画像时返回空字符串
    pub fn individualized_guidance(
        &self,
        profile: Option<&PlayerTypeProfile>,
        correctness: f64,
    ) -> &'static str {
        let Some(profile) = profile else {
            return "";
        };

        match Self::guidance_type(profile) {
            PlayerType::Achiever if correctness >= self.correctness_max => ACHIEVER_NEXT_CHALLENGE,
            PlayerType::Achiever => ACHIEVER_REPEAT,
            PlayerType::Philanthropist | PlayerType::Socialiser
                if correctness >= self.correctness_high =>
            {
                SOCIAL_HELP_PEERS
            }
            PlayerType::Philanthropist | PlayerType::Socialiser => SOCIAL_REVIEW_WITH_PEERS,
            PlayerType::Player if correctness >= self.correctness_max => PLAYER_UNLOCK_NEXT,
            PlayerType::Player => PLAYER_REPEAT_FOR_REWARDS,
            // guidance_type 不会返回这两种类型
            PlayerType::Disruptor | PlayerType::FreeSpirit => "",
        }
    }

    /// 实际使用哪种类型的指导规则
    ///
    /// DISRUPTOR 与 FREE_SPIRIT 没有直接规则，取 ACHIEVER、SOCIALISER、PHILANTHROPIST、
    /// PLAYER 四项中得分最高者。
    pub fn guidance_type(profile: &PlayerTypeProfile) -> PlayerType {
        if profile.primary_type.has_direct_guidance() {
            return profile.primary_type;
        }

        FALLBACK_ORDER
            .into_iter()
            .fold(FALLBACK_ORDER[0], |best, candidate| {
                if profile.score(candidate) > profile.score(best) {
                    candidate
                } else {
                    best
                }
            })
    }

    /// 按平均技能水平调整语言难度
    pub fn skill_guidance(&self, avg_skill_level: f64) -> &'static str {
        if avg_skill_level <= self.skill_low {
            SKILL_SIMPLE
        } else if avg_skill_level < self.skill_high {
            SKILL_BALANCED
        } else {
            SKILL_ADVANCED
        }
    }
}
