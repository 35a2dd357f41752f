//! 语言模型网关
//!
//! 与 Ollama 兼容的 `/api/generate` 端点进行一次非流式请求/响应交换。网关本身不做重试。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};

/// 生成请求
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    /// 输出结构描述，或字符串 "json"
    pub format: &'a Value,
}

/// 生成响应信封
///
/// 除 `response`/`done`/`error` 外的字段仅作记录用途。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl GenerateResponse {
    /// 仅包含生成文本的响应
    pub fn text(response: &str) -> Self {
        Self {
            response: response.to_string(),
            done: true,
            ..Default::default()
        }
    }
}

/// 语言模型
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 发送填充后的提示词与输出结构描述，返回生成结果
    ///
    /// 传输失败返回 [`AppError::Transport`]，端点显式报错返回 [`AppError::Model`]。
    async fn generate(&self, prompt: &str, format: &Value) -> Result<GenerateResponse>;
}

/// Ollama 模型客户端
pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGateway {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OllamaGateway {
    async fn generate(&self, prompt: &str, format: &Value) -> Result<GenerateResponse> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
        };

        let response = self.client.post(self.endpoint()).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: GenerateResponse = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(AppError::Model(format!("Malformed generate response: {}", e)));
            }
            Err(_) => {
                return Err(AppError::Transport(format!(
                    "Model endpoint returned {}: {}",
                    status, body
                )));
            }
        };

        if let Some(error) = envelope.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(AppError::Model(error.to_string()));
        }

        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "Model endpoint returned {}",
                status
            )));
        }

        debug!(
            model = %self.model,
            done = envelope.done,
            eval_count = envelope.eval_count,
            total_duration = envelope.total_duration,
            "Model generation finished"
        );

        Ok(envelope)
    }
}
