//! 可观测性模块
//!
//! 提供结构化日志初始化和简单的进程内指标。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Simple Metrics (using atomics for zero-dep implementation) =====

/// 简单应用指标
#[derive(Clone, Default)]
pub struct AppMetrics {
    pub llm_requests_total: Arc<AtomicU64>,
    pub llm_answered_total: Arc<AtomicU64>,
    pub llm_fallback_transport: Arc<AtomicU64>,
    pub llm_fallback_model: Arc<AtomicU64>,
    pub llm_fallback_parse: Arc<AtomicU64>,
    pub feedback_saved_total: Arc<AtomicU64>,
    pub feedback_live_deliveries: Arc<AtomicU64>,
    pub exchanges_appended_total: Arc<AtomicU64>,
    pub exchanges_evicted_total: Arc<AtomicU64>,
}

impl AppMetrics {
    /// 记录一次模型请求及其结果
    pub fn record_query(&self, fallback: Option<&AppError>) {
        self.llm_requests_total.fetch_add(1, Ordering::SeqCst);
        let counter = match fallback {
            None => &self.llm_answered_total,
            Some(AppError::Transport(_)) => &self.llm_fallback_transport,
            Some(AppError::Model(_)) => &self.llm_fallback_model,
            Some(_) => &self.llm_fallback_parse,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录反馈持久化与实时投递数量
    pub fn record_feedback(&self, deliveries: usize) {
        self.feedback_saved_total.fetch_add(1, Ordering::SeqCst);
        self.feedback_live_deliveries
            .fetch_add(deliveries as u64, Ordering::SeqCst);
    }

    /// 记录对话窗口写入
    pub fn record_exchange(&self, evicted: usize) {
        self.exchanges_appended_total.fetch_add(1, Ordering::SeqCst);
        self.exchanges_evicted_total
            .fetch_add(evicted as u64, Ordering::SeqCst);
    }

    /// 兜底总次数
    pub fn fallbacks_total(&self) -> u64 {
        self.llm_fallback_transport.load(Ordering::SeqCst)
            + self.llm_fallback_model.load(Ordering::SeqCst)
            + self.llm_fallback_parse.load(Ordering::SeqCst)
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP llm_requests_total Total language model queries
# TYPE llm_requests_total counter
llm_requests_total {}
# HELP llm_answered_total Queries answered with a parsed model result
# TYPE llm_answered_total counter
llm_answered_total {}
# HELP llm_fallback_total Queries answered with the caller fallback
# TYPE llm_fallback_total counter
llm_fallback_total{{reason="transport"}} {}
llm_fallback_total{{reason="model"}} {}
llm_fallback_total{{reason="parse"}} {}
# HELP feedback_saved_total Feedback records persisted
# TYPE feedback_saved_total counter
feedback_saved_total {}
# HELP feedback_live_deliveries_total Feedback records pushed to live subscribers
# TYPE feedback_live_deliveries_total counter
feedback_live_deliveries_total {}
# HELP conversation_exchanges_total Conversation exchanges appended
# TYPE conversation_exchanges_total counter
conversation_exchanges_total {}
# HELP conversation_evictions_total Conversation exchanges evicted by age or capacity
# TYPE conversation_evictions_total counter
conversation_evictions_total {}
"#,
            self.llm_requests_total.load(Ordering::SeqCst),
            self.llm_answered_total.load(Ordering::SeqCst),
            self.llm_fallback_transport.load(Ordering::SeqCst),
            self.llm_fallback_model.load(Ordering::SeqCst),
            self.llm_fallback_parse.load(Ordering::SeqCst),
            self.feedback_saved_total.load(Ordering::SeqCst),
            self.feedback_live_deliveries.load(Ordering::SeqCst),
            self.exchanges_appended_total.load(Ordering::SeqCst),
            self.exchanges_evicted_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Structured Logging =====

/// 构建日志过滤器：`RUST_LOG` 优先，其次使用配置中的级别
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let level = if config.level.is_empty() {
        "info"
    } else {
        config.level.as_str()
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化结构化日志
///
/// 配置了 `log_dir` 时额外写入按天滚动的日志文件，返回的 guard 需要在进程生命周期内持有。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mentor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (json_layer, plain_layer) = if config.structured {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(true).with_line_number(true)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(guard)
}
