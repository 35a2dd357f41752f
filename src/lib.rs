//! Mentor - 辅导后端的语言模型编排与个性化核心
//!
//! 将模板化提示词发送给本地语言模型并解析为类型化结果，失败时回退到调用方给定的兜底值；
//! 维护按 (用户, 课程) 划分的有界对话记忆；按玩家类型与技能水平调整反馈语气；
//! 并把生成的反馈持久化后实时推送给订阅者。

pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use error::{AppError, Result};
