//! 输出结构描述注册表
//!
//! 为每个目标结果类型生成一次 JSON Schema 并缓存，后续请求直接返回同一份缓存值。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::{InstanceType, RootSchema, SingleOrVec};
use serde_json::Value;
use std::any::{TypeId, type_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// 结构描述缓存
#[derive(Default)]
pub struct SchemaRegistry {
    cache: DashMap<TypeId, Arc<Value>>,
    derivations: AtomicUsize,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取结果类型的结构描述
    ///
    /// 类型不是带字段的对象结构时返回 [`AppError::Schema`]。
    pub fn schema_for<T: JsonSchema + 'static>(&self) -> Result<Arc<Value>> {
        let key = TypeId::of::<T>();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Schema cache hit for {}", type_name::<T>());
            return Ok(cached.clone());
        }

        match self.cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let schema = Arc::new(derive_schema::<T>()?);
                self.derivations.fetch_add(1, Ordering::SeqCst);
                info!("Derived output schema for {}", type_name::<T>());
                entry.insert(schema.clone());
                Ok(schema)
            }
        }
    }

    /// 已缓存的结构数量
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 实际执行过的推导次数
    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::SeqCst)
    }
}

fn derive_schema<T: JsonSchema>() -> Result<Value> {
    let generator = SchemaSettings::draft07()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    if !is_object_shape(&root) {
        return Err(AppError::Schema(format!(
            "{} is not an introspectable object shape",
            type_name::<T>()
        )));
    }

    serde_json::to_value(&root).map_err(|e| AppError::Schema(e.to_string()))
}

fn is_object_shape(root: &RootSchema) -> bool {
    let is_object = matches!(
        &root.schema.instance_type,
        Some(SingleOrVec::Single(instance)) if **instance == InstanceType::Object
    );
    let has_fields = root
        .schema
        .object
        .as_ref()
        .is_some_and(|object| !object.properties.is_empty());
    is_object && has_fields
}
