//! 环境变量来源。
//!
//! # 设计目的（Why）
//! - 部署环境最常见的配置通道；键名由 `key` 属性稳定推导，嵌套记录以段名前缀区分。
//!
//! # 逻辑解析（How）
//! - 只有声明了 `key` 属性的叶子参与填充，未声明的叶子连同其默认值一起被忽略；
//! - 键 = 前缀 + 各级嵌套段 + `key` 属性，全部经 [`to_env_var`] 规范化后以 `_` 连接；
//!   嵌套段取 `segment` 属性或字段名；
//! - 嵌套记录总是进入，缺席的可选子记录先分配默认实例；
//! - 序列字段在转换前按字段分隔符（或来源默认分隔符）改写为逗号分隔；
//! - 变量在每次 `load` 时取一次快照，也可以通过 [`EnvSource::with_vars`] 注入。
//!
//! # 契约说明（What）
//! - 变量存在但为空串时视为“有值”，优先于默认值；
//! - `Override` 模式下，变量缺席且声明了非空默认值时，默认值会覆盖已有的非零值；
//!   `FillMissing` 模式从不覆盖非零值；
//! - 失败消息形如 `env APP_PORT=x field port: ...`。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use spark_config_core::{
    CastError, CastRegistry, Field, FieldDescriptor, FieldProvider, Input, LoadError, LoadMode,
    Lookup, Nested, Slot, Source, Traversal, TypeInfo, ensure_target_record, should_assign,
};

use crate::naming::{normalize_delimited, resolve_delimiter, to_env_var};

const DEFAULT_DELIMITER: &str = ",";

/// 从环境变量填充记录的来源。
#[derive(Clone)]
pub struct EnvSource {
    prefix: String,
    delimiter: String,
    vars: Option<Arc<HashMap<String, String>>>,
    registry: Arc<CastRegistry>,
}

impl EnvSource {
    /// 以前缀与默认分隔符构造；前缀为空表示不加前缀，分隔符为空时取 `,`。
    pub fn new(prefix: &str, delimiter: &str) -> Self {
        let delimiter = if delimiter.is_empty() {
            DEFAULT_DELIMITER
        } else {
            delimiter
        };
        Self {
            prefix: to_env_var(prefix),
            delimiter: delimiter.to_owned(),
            vars: None,
            registry: CastRegistry::shared(),
        }
    }

    /// 以固定的变量集合代替进程环境。
    pub fn with_vars<K, V, I>(mut self, vars: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.vars = Some(Arc::new(vars));
        self
    }

    /// 使用自定义的转换注册表。
    pub fn with_registry(mut self, registry: Arc<CastRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// 规范化后的前缀。
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn snapshot(&self) -> Arc<HashMap<String, String>> {
        if let Some(vars) = &self.vars {
            return Arc::clone(vars);
        }
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Arc::new(vars)
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new("", DEFAULT_DELIMITER)
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource")
            .field("prefix", &self.prefix)
            .field("delimiter", &self.delimiter)
            .field("injected", &self.vars.is_some())
            .finish()
    }
}

impl Source for EnvSource {
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        let record = ensure_target_record(target)?;
        let vars = self.snapshot();
        tracing::debug!(prefix = %self.prefix, vars = vars.len(), "env snapshot taken");
        let provider = EnvProvider {
            source: self,
            vars: &vars,
        };
        Traversal::new(&self.registry, mode).run(record, &provider)
    }
}

struct EnvProvider<'a> {
    source: &'a EnvSource,
    vars: &'a HashMap<String, String>,
}

impl EnvProvider<'_> {
    fn key(segments: &[String], tag: &str) -> String {
        let leaf = to_env_var(tag);
        segments
            .iter()
            .map(String::as_str)
            .chain((!leaf.is_empty()).then_some(leaf.as_str()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

fn is_delimited(target: &TypeInfo) -> bool {
    target.is_sequence() || target.pointee().is_some_and(|pointee| pointee.is_sequence())
}

impl FieldProvider for EnvProvider<'_> {
    type Scope<'s>
        = Vec<String>
    where
        Self: 's;

    fn origin(&self) -> &'static str {
        "env"
    }

    fn root(&self) -> Vec<String> {
        if self.source.prefix.is_empty() {
            Vec::new()
        } else {
            vec![self.source.prefix.clone()]
        }
    }

    fn nested<'s>(&'s self, scope: &Vec<String>, field: &FieldDescriptor) -> Nested<Vec<String>> {
        let mut next = scope.clone();
        let segment = to_env_var(field.attrs.segment.unwrap_or(field.name));
        if !segment.is_empty() {
            next.push(segment);
        }
        Nested::Enter(next)
    }

    fn lookup<'s>(&'s self, scope: &Vec<String>, field: &FieldDescriptor, _target: &TypeInfo) -> Lookup {
        let Some(tag) = field.attrs.key.filter(|tag| !tag.is_empty()) else {
            return Lookup::new(field.name);
        };
        let key = Self::key(scope, tag);
        let value = self.vars.get(&key).cloned();
        let lookup = Lookup::new(key).with_default(field.default_value());
        match value {
            Some(value) => lookup.with_value(Input::Text(value)),
            None => lookup,
        }
    }

    fn should_assign(&self, slot: &dyn Slot, lookup: &Lookup, mode: LoadMode) -> bool {
        match mode {
            LoadMode::Override => lookup.is_present() || lookup.default.is_some(),
            LoadMode::FillMissing => should_assign(slot, lookup.is_present(), mode, lookup.default),
        }
    }

    fn prepare(&self, field: &FieldDescriptor, input: Input, target: &TypeInfo) -> Result<Input, CastError> {
        match input {
            Input::Text(text) if is_delimited(target) => {
                let delimiter = resolve_delimiter(field.attrs.delimiter, &self.source.delimiter);
                Ok(Input::Text(normalize_delimited(&text, delimiter)))
            }
            other => Ok(other),
        }
    }

    fn keyed_failures(&self) -> bool {
        true
    }
}
