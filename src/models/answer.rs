//! 模型输出的目标结构
//!
//! 每个结构都派生 `JsonSchema`，其结构描述会随请求发送给模型以约束生成，
//! 并用于校验模型返回的文本。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 作业完成后的主动反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackAnswer {
    /// 给学生的反馈文本
    pub feedback: String,
}

/// 学习提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HintAnswer {
    /// 提示文本，不直接给出答案
    pub hint: String,
}

/// 导师对话回答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatAnswer {
    pub answer: String,
}

/// 问题类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    // 课程内容相关
    Content,
    // 课程组织（截止日期、评分等）
    Organisational,
    // 平台或技术问题
    Technical,
    Other,
}

/// 分类后的学生问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategorizedQuestion {
    pub category: QuestionCategory,
    /// 一句话概括
    pub summary: String,
}

impl CategorizedQuestion {
    /// 无法分类时的结果
    pub fn uncategorized(question: &str) -> Self {
        Self {
            category: QuestionCategory::Other,
            summary: question.to_string(),
        }
    }
}
