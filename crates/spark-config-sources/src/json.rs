//! JSON 文档来源。
//!
//! # 设计目的（Why）
//! - 配置文件是部署时最常见的持久化形式；文档一次性解析为 [`Value`] 树，再走与字典相同的赋值路径。
//!
//! # 逻辑解析（How）
//! 1. 读取文件（或使用内存中的文本/文档）并解析，根节点必须是对象；
//! 2. 数值按“有符号整数 → 无符号整数 → 浮点”的顺序映射，对象映射为 `Value::Map`，数组映射为 `Value::List`；
//! 3. 叶子只按 `key` 属性取成员，未声明 `key` 的叶子不参与；子记录总是进入，成员名取 `key` 属性或字段名，缺席的可选子记录先分配，对应成员不是对象时其下字段全部视为缺席；
//! 4. 叶子成员经 `assign_from_any` 写入，字符串成员仍会经过转换注册表。
//!
//! # 契约说明（What）
//! - 文件不可读、语法错误或根节点不是对象时返回 [`LoadError::Document`]，目标保持原样；
//! - `null` 成员清空可空槽位，对不可空槽位报 `UnsupportedType`；
//! - 不支持默认值，失败消息形如 `json field server.port: ...`。

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use spark_config_core::{
    CastRegistry, Field, FieldDescriptor, FieldProvider, Input, LoadError, LoadMode, Lookup,
    Nested, Source, Traversal, TypeInfo, Value, ensure_target_record,
};
use thiserror::Error;

const ORIGIN: &str = "json";

/// 文档根节点不是对象。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("document root must be an object, found {found}")]
pub struct RootNotObject {
    /// 实际的根节点种类。
    pub found: &'static str,
}

/// 文档文件读取失败。
#[derive(Debug, Error)]
#[error("failed to read {}: {source}", path.display())]
pub struct ReadFailed {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone)]
enum Document {
    Path(PathBuf),
    Text(Arc<str>),
    Parsed(Arc<serde_json::Value>),
}

/// 从 JSON 文档填充记录的来源。
#[derive(Debug, Clone)]
pub struct JsonSource {
    document: Document,
    registry: Arc<CastRegistry>,
}

impl JsonSource {
    /// 每次 `load` 时读取指定文件。
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::with_document(Document::Path(path.as_ref().to_path_buf()))
    }

    /// 使用内存中的 JSON 文本。
    pub fn from_text(text: impl Into<Arc<str>>) -> Self {
        Self::with_document(Document::Text(text.into()))
    }

    /// 使用已解析的文档。
    pub fn from_value(document: serde_json::Value) -> Self {
        Self::with_document(Document::Parsed(Arc::new(document)))
    }

    fn with_document(document: Document) -> Self {
        Self {
            document,
            registry: CastRegistry::shared(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<CastRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn read(&self) -> Result<BTreeMap<String, Value>, LoadError> {
        let parsed = match &self.document {
            Document::Path(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    LoadError::document(
                        ORIGIN,
                        ReadFailed {
                            path: path.clone(),
                            source,
                        },
                    )
                })?;
                parse(&text)?
            }
            Document::Text(text) => parse(text)?,
            Document::Parsed(document) => convert(document),
        };
        match parsed {
            Value::Map(root) => Ok(root),
            other => Err(LoadError::document(
                ORIGIN,
                RootNotObject {
                    found: other.kind_name(),
                },
            )),
        }
    }
}

fn parse(text: &str) -> Result<Value, LoadError> {
    let document: serde_json::Value =
        serde_json::from_str(text).map_err(|err| LoadError::document(ORIGIN, err))?;
    Ok(convert(&document))
}

/// 把 JSON 值映射为动态值。
fn convert(document: &serde_json::Value) -> Value {
    match document {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(*flag),
        serde_json::Value::Number(number) => {
            if let Some(signed) = number.as_i64() {
                Value::Int(signed)
            } else if let Some(unsigned) = number.as_u64() {
                Value::Uint(unsigned)
            } else {
                number.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        serde_json::Value::String(text) => Value::Text(text.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(convert).collect()),
        serde_json::Value::Object(members) => Value::Map(
            members
                .iter()
                .map(|(key, member)| (key.clone(), convert(member)))
                .collect(),
        ),
    }
}

impl Source for JsonSource {
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        let record = ensure_target_record(target)?;
        let root = self.read()?;
        tracing::debug!(members = root.len(), "json document parsed");
        Traversal::new(&self.registry, mode).run(record, &JsonProvider { root: &root })
    }
}

struct JsonProvider<'a> {
    root: &'a BTreeMap<String, Value>,
}

fn segment_key(field: &FieldDescriptor) -> &'static str {
    field.attrs.key.unwrap_or(field.name)
}

impl FieldProvider for JsonProvider<'_> {
    type Scope<'s>
        = Option<&'s BTreeMap<String, Value>>
    where
        Self: 's;

    fn origin(&self) -> &'static str {
        ORIGIN
    }

    fn root(&self) -> Option<&BTreeMap<String, Value>> {
        Some(self.root)
    }

    fn nested<'s>(
        &'s self,
        scope: &Option<&'s BTreeMap<String, Value>>,
        field: &FieldDescriptor,
    ) -> Nested<Option<&'s BTreeMap<String, Value>>> {
        let member = scope.and_then(|members| members.get(segment_key(field)));
        Nested::Enter(member.and_then(Value::as_map))
    }

    fn lookup<'s>(
        &'s self,
        scope: &Option<&'s BTreeMap<String, Value>>,
        field: &FieldDescriptor,
        _target: &TypeInfo,
    ) -> Lookup {
        let Some(key) = field.attrs.key.filter(|key| !key.is_empty()) else {
            return Lookup::new(field.name);
        };
        let lookup = Lookup::new(key);
        match scope.and_then(|members| members.get(key)) {
            Some(member) => lookup.with_value(Input::Value(member.clone())),
            None => lookup,
        }
    }
}
