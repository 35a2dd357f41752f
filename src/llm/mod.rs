//! 语言模型查询管线
//!
//! 模板填充 → 结构描述 → 模型网关 → 类型化解析。

pub mod gateway;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod template;

pub use gateway::{GenerateResponse, LanguageModel, OllamaGateway};
pub use orchestrator::{QueryOrchestrator, QueryOutcome};
pub use schema::SchemaRegistry;
pub use template::{Template, TemplateArg};
