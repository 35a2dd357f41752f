use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀
const ENV_PREFIX: &str = "MENTOR_";

/// 对话最长保留时间上限（一年）
pub const MAX_AGE_MINUTES_LIMIT: i64 = 60 * 24 * 365;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 搜索路径：
    /// 1. 内置默认值
    /// 2. ./config.yaml
    /// 3. 环境变量（`MENTOR_LLM__MODEL=...`）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.llm.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingModelEndpoint);
        }

        if config.llm.model.trim().is_empty() {
            return Err(ConfigValidationError::MissingModel);
        }

        if config.memory.max_history_pairs == 0 {
            return Err(ConfigValidationError::InvalidHistoryWindow);
        }

        if config.memory.max_age_minutes <= 0
            || config.memory.max_age_minutes > MAX_AGE_MINUTES_LIMIT
        {
            return Err(ConfigValidationError::InvalidMaxAge);
        }

        let p = &config.personalization;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(p.correctness_high) && in_unit(p.correctness_max))
            || p.correctness_high > p.correctness_max
        {
            return Err(ConfigValidationError::InvalidThresholds(
                "correctness_high <= correctness_max, both within [0, 1]".into(),
            ));
        }
        if !(in_unit(p.skill_low) && in_unit(p.skill_high)) || p.skill_low > p.skill_high {
            return Err(ConfigValidationError::InvalidThresholds(
                "skill_low <= skill_high, both within [0, 1]".into(),
            ));
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("模型服务地址未配置")]
    MissingModelEndpoint,

    #[error("模型标识未配置")]
    MissingModel,

    #[error("对话窗口大小无效，必须大于 0")]
    InvalidHistoryWindow,

    #[error("对话最长保留时间无效，必须在 1 到 525600 分钟（一年）之间")]
    InvalidMaxAge,

    #[error("阈值配置无效: 需要 {0}")]
    InvalidThresholds(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.yaml")
}
