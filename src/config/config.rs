use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 语言模型端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// 模型服务地址（Ollama 兼容）
    pub base_url: String,
    /// 模型标识
    pub model: String,
    /// 请求超时（秒）。默认不设置，由调用方自行约束延迟
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
            timeout_secs: None,
        }
    }
}

/// 对话记忆窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// 每个 (用户, 课程) 保留的最大对话轮数
    pub max_history_pairs: usize,
    /// 对话最长保留时间（分钟）
    pub max_age_minutes: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: 3,
            max_age_minutes: 30,
        }
    }
}

/// 个性化阈值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    /// 视为满分的正确率
    pub correctness_max: f64,
    /// 视为掌握良好的正确率
    pub correctness_high: f64,
    /// 低技能水平上限
    pub skill_low: f64,
    /// 高技能水平下限
    pub skill_high: f64,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            correctness_max: 0.99,
            correctness_high: 0.8,
            skill_low: 0.3,
            skill_high: 0.7,
        }
    }
}

/// 反馈生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// 模型不可用时使用的反馈文本
    pub fallback_text: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            fallback_text: "Thanks for submitting your assignment! Detailed feedback is not available right now, please check your results in the course overview.".into(),
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储
    #[default]
    Memory,
    /// SurrealDB
    Surrealdb,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名（为空时跳过认证）
    pub username: String,
    /// 密码
    pub password: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 语言模型配置
    pub llm: LlmConfig,
    /// 对话记忆配置
    pub memory: MemoryConfig,
    /// 个性化配置
    pub personalization: PersonalizationConfig,
    /// 反馈配置
    pub feedback: FeedbackConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            personalization: PersonalizationConfig::default(),
            feedback: FeedbackConfig::default(),
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: "mem://".into(),
                namespace: "mentor".into(),
                database: "tutoring".into(),
                username: String::new(),
                password: String::new(),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "mentor".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config.database.backend = StorageBackend::Surrealdb;
        config.database.url = "ws://localhost:8000".into();
        config
    }
}
