//! 查询编排器
//!
//! 组合模板填充、结构描述与模型网关，向模型请求一个类型化的结果。
//!
//! 模板或结构描述错误是编程错误，直接返回 `Err`；模型调用或输出解析失败时，
//! 返回调用方提供的兜底值，并在 [`QueryOutcome::Fallback`] 中保留原因。

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::llm::gateway::LanguageModel;
use crate::llm::schema::SchemaRegistry;
use crate::llm::template::{Template, TemplateArg};
use crate::observability::AppMetrics;

/// 查询结果
#[derive(Debug)]
pub enum QueryOutcome<T> {
    /// 模型返回并成功解析
    Answered(T),
    /// 使用了兜底值
    Fallback { value: T, reason: AppError },
}

impl<T> QueryOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            QueryOutcome::Answered(value) | QueryOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            QueryOutcome::Answered(value) | QueryOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, QueryOutcome::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&AppError> {
        match self {
            QueryOutcome::Answered(_) => None,
            QueryOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// 查询编排器
#[derive(Clone)]
pub struct QueryOrchestrator {
    model: Arc<dyn LanguageModel>,
    schemas: Arc<SchemaRegistry>,
    metrics: AppMetrics,
}

impl QueryOrchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            model,
            schemas,
            metrics: AppMetrics::default(),
        }
    }

    /// 使用共享的指标实例
    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    /// 向模型请求 `T`，失败时返回 `fallback`
    pub async fn ask<T>(&self, template: &Template, args: &[TemplateArg], fallback: T) -> Result<T>
    where
        T: JsonSchema + DeserializeOwned + Send + 'static,
    {
        Ok(self.try_ask(template, args, fallback).await?.into_value())
    }

    /// 与 [`ask`](Self::ask) 相同，但保留走了哪条路径
    pub async fn try_ask<T>(
        &self,
        template: &Template,
        args: &[TemplateArg],
        fallback: T,
    ) -> Result<QueryOutcome<T>>
    where
        T: JsonSchema + DeserializeOwned + Send + 'static,
    {
        let prompt = template.fill(args)?;
        let schema = self.schemas.schema_for::<T>()?;

        let outcome = match self.query::<T>(&prompt, &schema).await {
            Ok(value) => {
                debug!("Template '{}' answered as {}", template.name(), type_name::<T>());
                QueryOutcome::Answered(value)
            }
            Err(reason) => {
                warn!(
                    template = template.name(),
                    code = reason.code(),
                    "Model query failed, using fallback: {}",
                    reason
                );
                QueryOutcome::Fallback {
                    value: fallback,
                    reason,
                }
            }
        };

        self.metrics.record_query(outcome.fallback_reason());
        Ok(outcome)
    }

    async fn query<T: DeserializeOwned>(&self, prompt: &str, schema: &Value) -> Result<T> {
        let envelope = self.model.generate(prompt, schema).await?;
        serde_json::from_str::<T>(envelope.response.trim()).map_err(|e| {
            AppError::Parse(format!(
                "Output does not match {}: {}",
                type_name::<T>(),
                e
            ))
        })
    }
}
