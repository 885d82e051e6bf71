//! 进程内字典来源。
//!
//! # 设计目的（Why）
//! - 测试、嵌入式默认值以及由其他格式解析出的中间结果，都可以表达为一棵 [`Value`] 映射树；
//! - 值已带类型，经 `assign_from_any` 写入，字符串仍会经过转换注册表。
//!
//! # 逻辑解析（How）
//! - 键按顺序尝试：`key` 属性、字段名、小写蛇形、大写蛇形；
//! - 子记录字段遇到映射时递归进入（缺席的可选子记录先分配），键缺席时跳过；
//! - 叶子字段遇到映射时忽略该键，映射形状与动态值形状的叶子除外。
//!
//! # 契约说明（What）
//! - 不支持默认值；
//! - 记录字段收到非映射值报告 `UnsupportedType`，但 `Null` 会清空可选子记录；
//! - 失败消息形如 `dict field server.port: ...`。

use std::collections::BTreeMap;
use std::sync::Arc;

use spark_config_core::{
    CastRegistry, Field, FieldDescriptor, FieldProvider, Input, LoadError, LoadMode, Lookup,
    Nested, Shape, Source, Traversal, TypeInfo, Value, ensure_target_record,
};

use crate::naming::{to_lower_snake, to_upper_snake};

/// 以动态值映射填充记录的来源。
#[derive(Debug, Clone)]
pub struct DictSource {
    entries: BTreeMap<String, Value>,
    registry: Arc<CastRegistry>,
}

impl DictSource {
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries,
            registry: CastRegistry::shared(),
        }
    }

    /// 以任意值构造；非映射值视为空字典。
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Map(entries) => Self::new(entries),
            _ => Self::new(BTreeMap::new()),
        }
    }

    pub fn with_registry(mut self, registry: Arc<CastRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }
}

impl Default for DictSource {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl Source for DictSource {
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        let record = ensure_target_record(target)?;
        Traversal::new(&self.registry, mode).run(record, &DictProvider { root: &self.entries })
    }
}

struct DictProvider<'a> {
    root: &'a BTreeMap<String, Value>,
}

/// 按约定的键顺序查找字段，返回命中的键与值。
fn find<'m>(entries: &'m BTreeMap<String, Value>, field: &FieldDescriptor) -> Option<(String, &'m Value)> {
    let candidates = field
        .attrs
        .key
        .map(str::to_owned)
        .into_iter()
        .chain([
            field.name.to_owned(),
            to_lower_snake(field.name),
            to_upper_snake(field.name),
        ]);
    for key in candidates {
        if let Some(value) = entries.get(&key) {
            return Some((key, value));
        }
    }
    None
}

/// 映射、动态值及其可选形式的叶子可以整体接收一个映射。
fn accepts_map(target: &TypeInfo) -> bool {
    match target.shape() {
        Shape::Mapping(_) | Shape::Dynamic => true,
        Shape::Optional(pointee) => matches!(pointee().shape(), Shape::Mapping(_) | Shape::Dynamic),
        _ => false,
    }
}

impl FieldProvider for DictProvider<'_> {
    type Scope<'s>
        = &'s BTreeMap<String, Value>
    where
        Self: 's;

    fn origin(&self) -> &'static str {
        "dict"
    }

    fn root(&self) -> &BTreeMap<String, Value> {
        self.root
    }

    fn nested<'s>(
        &'s self,
        scope: &&'s BTreeMap<String, Value>,
        field: &FieldDescriptor,
    ) -> Nested<&'s BTreeMap<String, Value>> {
        let entries: &'s BTreeMap<String, Value> = *scope;
        match find(entries, field) {
            Some((_, Value::Map(nested))) => Nested::Enter(nested),
            Some((key, value)) => Nested::Direct {
                key,
                value: value.clone(),
            },
            None => Nested::Skip,
        }
    }

    fn lookup<'s>(
        &'s self,
        scope: &&'s BTreeMap<String, Value>,
        field: &FieldDescriptor,
        target: &TypeInfo,
    ) -> Lookup {
        match find(scope, field) {
            Some((key, Value::Map(_))) if !accepts_map(target) => Lookup::new(key),
            Some((key, value)) => Lookup::new(key).with_value(Input::Value(value.clone())),
            None => Lookup::new(field.name),
        }
    }
}
