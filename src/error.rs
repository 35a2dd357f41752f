//! 错误处理模块
//!
//! 定义应用程序的错误类型。模板与结构描述错误属于编程错误，会一路向上传播；
//! 传输、模型与解析错误只在查询编排器内部出现，并被降级为调用方提供的兜底值。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 模板中缺少参数对应的占位符
    #[error("模板错误: 模板 '{template}' 中不存在占位符 {{{{{name}}}}}")]
    Template { template: String, name: String },

    /// 结果类型无法生成结构描述
    #[error("结构描述错误: {0}")]
    Schema(String),

    /// 与模型端点通信失败（连接、超时、中断）
    #[error("传输错误: {0}")]
    Transport(String),

    /// 模型端点显式返回的错误
    #[error("模型错误: {0}")]
    Model(String),

    /// 模型输出无法解析为目标结构
    #[error("解析错误: {0}")]
    Parse(String),

    /// 上游内容/检索服务错误
    #[error("上游服务错误: {0}")]
    Provider(String),

    /// 存储错误
    #[error("存储错误: {0}")]
    Store(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 是否可以在查询路径内部以兜底值恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::Model(_) | AppError::Parse(_)
        )
    }

    /// 错误代码，用于日志与指标标签
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Template { .. } => "TEMPLATE_ERROR",
            AppError::Schema(_) => "SCHEMA_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Model(_) => "MODEL_ERROR",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Validation(_) => "BAD_REQUEST",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Serialization(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(feature = "surrealdb")]
impl From<surrealdb::Error> for AppError {
    fn from(e: surrealdb::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::Transport("timeout".into()).is_recoverable());
        assert!(AppError::Model("overloaded".into()).is_recoverable());
        assert!(AppError::Parse("eof".into()).is_recoverable());
        assert!(!AppError::Schema("String".into()).is_recoverable());
        assert!(!AppError::Store("down".into()).is_recoverable());
        assert!(
            !AppError::Template {
                template: "hint".into(),
                name: "question".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_template_error_names_placeholder() {
        let err = AppError::Template {
            template: "hint".into(),
            name: "question".into(),
        };
        assert!(err.to_string().contains("{{question}}"));
        assert_eq!(err.code(), "TEMPLATE_ERROR");
    }
}
