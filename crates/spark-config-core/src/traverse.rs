//! 遍历驱动：逐字段走过记录，把来源的取值交给模式判定与赋值引擎。
//!
//! # 设计目的（Why）
//! - 每个来源都要“走一遍目标记录”，差别只在于如何取值、如何命名；
//!   遍历本身（递归、按需分配可选子记录、路径拼接、失败收集）只需写一次；
//! - 来源通过实现 [`FieldProvider`] 接入，核心不理解任何命名约定。
//!
//! # 逻辑解析（How）
//! 1. 按描述表顺序访问字段，跳过 `skip` 字段（私有字段从不出现在描述表中）；
//! 2. 子记录字段询问来源 [`FieldProvider::nested`]：进入、跳过，或是来源给了一个非结构的值；
//!    进入缺席的可选子记录之前先分配默认实例；
//! 3. 叶子字段向来源 [`FieldProvider::lookup`]，经模式判定后选择来源值或默认值，
//!    必要时由来源预处理（如空值布尔视为 `true`），再交给赋值引擎；
//! 4. 任何字段失败都记入列表后继续，结束时折叠为一个聚合错误。
//!
//! # 契约说明（What）
//! - 单次遍历在调用线程上同步执行，不做 I/O；
//! - 失败字段保持原值，失败记录携带来源短名与 `.` 连接的字段路径。

use std::fmt;

use crate::assign::{assign_from_any, assign_from_string};
use crate::cast::CastRegistry;
use crate::error::{CastError, FieldFailure, LoadError};
use crate::policy::{self, LoadMode};
use crate::record::{FieldDescriptor, FieldMut, OptionalRecord, Record};
use crate::slot::Slot;
use crate::types::TypeInfo;
use crate::value::Value;

/// 来源对某个字段给出的原始输入。
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// 只能经注册表转换的字符串。
    Text(String),
    /// 已带类型的值。
    Value(Value),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Value(value) => write!(f, "{value}"),
        }
    }
}

/// 一次叶子取值的结果。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lookup {
    /// 来源侧的键，用于错误消息。
    pub key: String,
    /// 来源值；`None` 表示来源没有该字段。
    pub value: Option<Input>,
    /// 来源无值时可用的默认字符串。
    pub default: Option<&'static str>,
}

impl Lookup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            default: None,
        }
    }

    pub fn with_value(mut self, value: Input) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_default(mut self, default: Option<&'static str>) -> Self {
        self.default = default;
        self
    }

    /// 来源是否提供了值。
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// 来源对子记录字段的处理意见。
#[derive(Debug)]
pub enum Nested<S> {
    /// 以新的作用域递归进入。
    Enter(S),
    /// 不处理该子记录。
    Skip,
    /// 来源在该位置给出了非结构的值。
    Direct { key: String, value: Value },
}

/// 由各来源实现，向遍历驱动提供逐字段的取值。
pub trait FieldProvider {
    /// 遍历上下文，例如键前缀或当前所在的子文档。
    type Scope<'s>
    where
        Self: 's;

    /// 来源短名，出现在字段失败的消息中。
    fn origin(&self) -> &'static str;

    /// 顶层作用域。
    fn root(&self) -> Self::Scope<'_>;

    /// 子记录字段的处理方式。
    fn nested<'s>(&'s self, scope: &Self::Scope<'s>, field: &FieldDescriptor) -> Nested<Self::Scope<'s>>;

    /// 叶子字段的取值。
    fn lookup<'s>(&'s self, scope: &Self::Scope<'s>, field: &FieldDescriptor, target: &TypeInfo) -> Lookup;

    /// 是否写入该叶子；默认遵循 [`policy::should_assign`]。
    fn should_assign(&self, slot: &dyn Slot, lookup: &Lookup, mode: LoadMode) -> bool {
        policy::should_assign(slot, lookup.is_present(), mode, lookup.default)
    }

    /// 赋值前的预处理；默认原样返回。
    fn prepare(&self, _field: &FieldDescriptor, input: Input, _target: &TypeInfo) -> Result<Input, CastError> {
        Ok(input)
    }

    /// 字段失败是否附带 `key=value`。
    fn keyed_failures(&self) -> bool {
        false
    }
}

/// 以 `.` 拼接字段路径。
pub fn make_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

/// 一次遍历的配置：注册表与合并模式。
#[derive(Debug, Clone, Copy)]
pub struct Traversal<'r> {
    registry: &'r CastRegistry,
    mode: LoadMode,
}

impl<'r> Traversal<'r> {
    pub fn new(registry: &'r CastRegistry, mode: LoadMode) -> Self {
        Self { registry, mode }
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// 遍历整条记录，返回全部字段失败的聚合。
    pub fn run<P: FieldProvider>(&self, record: &mut dyn Record, provider: &P) -> Result<(), LoadError> {
        tracing::debug!(
            origin = provider.origin(),
            record = record.schema().name,
            mode = %self.mode,
            "traversal started"
        );
        let root = provider.root();
        let mut failures = Vec::new();
        self.visit(record, provider, &root, "", &mut failures);
        if !failures.is_empty() {
            tracing::debug!(
                origin = provider.origin(),
                failures = failures.len(),
                "traversal finished with failures"
            );
        }
        LoadError::aggregate(failures)
    }

    fn visit<'s, P: FieldProvider>(
        &self,
        record: &mut dyn Record,
        provider: &'s P,
        scope: &P::Scope<'s>,
        prefix: &str,
        failures: &mut Vec<LoadError>,
    ) {
        let schema = record.schema();
        for (index, field) in schema.fields.iter().enumerate() {
            if field.attrs.skip {
                continue;
            }
            let Some(view) = record.field_mut(index) else {
                continue;
            };
            let path = make_path(prefix, field.name);
            match view {
                FieldMut::Leaf(slot) => {
                    self.assign_leaf(slot, provider, scope, field, &path, failures);
                }
                FieldMut::Record(nested) => match provider.nested(scope, field) {
                    Nested::Enter(inner) => self.visit(nested, provider, &inner, &path, failures),
                    Nested::Skip => {}
                    Nested::Direct { key, value } => {
                        if policy::decide(nested.is_zero(), true, self.mode, None) {
                            let cause = CastError::UnsupportedType {
                                target: nested.schema().name,
                            };
                            failures.push(self.failure(provider, &path, Some((key, value.to_string())), cause));
                        }
                    }
                },
                FieldMut::OptionalRecord(optional) => match provider.nested(scope, field) {
                    Nested::Enter(inner) => {
                        self.visit(optional.materialize(), provider, &inner, &path, failures)
                    }
                    Nested::Skip => {}
                    Nested::Direct { key, value } => {
                        self.direct_optional(optional, provider, &path, key, value, failures);
                    }
                },
                FieldMut::Unsupported(target) => {
                    let lookup = provider.lookup(scope, field, &target);
                    if let Some(input) = lookup.value {
                        let entry = Some((lookup.key, input.to_string()));
                        failures.push(self.failure(provider, &path, entry, CastError::unsupported(&target)));
                    }
                }
            }
        }
    }

    fn assign_leaf<'s, P: FieldProvider>(
        &self,
        slot: &mut dyn Slot,
        provider: &'s P,
        scope: &P::Scope<'s>,
        field: &FieldDescriptor,
        path: &str,
        failures: &mut Vec<LoadError>,
    ) {
        let target = slot.slot_type();
        let lookup = provider.lookup(scope, field, &target);
        if !provider.should_assign(&*slot, &lookup, self.mode) {
            return;
        }
        let input = match lookup.value {
            Some(input) => input,
            None => match lookup.default.filter(|value| !value.is_empty()) {
                Some(default) => Input::Text(default.to_owned()),
                None => return,
            },
        };
        let entry = provider
            .keyed_failures()
            .then(|| (lookup.key.clone(), input.to_string()));

        let outcome = provider
            .prepare(field, input, &target)
            .and_then(|input| match input {
                Input::Text(text) => assign_from_string(self.registry, slot, &text),
                Input::Value(value) => assign_from_any(self.registry, slot, value),
            });
        if let Err(cause) = outcome {
            failures.push(self.failure(provider, path, entry, cause));
        }
    }

    fn direct_optional<P: FieldProvider>(
        &self,
        optional: &mut dyn OptionalRecord,
        provider: &P,
        path: &str,
        key: String,
        value: Value,
        failures: &mut Vec<LoadError>,
    ) {
        if !policy::decide(optional.is_absent(), true, self.mode, None) {
            return;
        }
        if value.is_absent() {
            optional.clear();
            return;
        }
        let cause = CastError::UnsupportedType {
            target: optional.record_name(),
        };
        failures.push(self.failure(provider, path, Some((key, value.to_string())), cause));
    }

    fn failure<P: FieldProvider>(
        &self,
        provider: &P,
        path: &str,
        entry: Option<(String, String)>,
        cause: CastError,
    ) -> LoadError {
        tracing::debug!(
            origin = provider.origin(),
            path,
            code = cause.code(),
            error = %cause,
            "field assignment failed"
        );
        let failure = FieldFailure::new(provider.origin(), path, cause);
        match entry {
            Some((key, value)) if provider.keyed_failures() => failure.with_entry(key, value).into(),
            _ => failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_joins_with_dot() {
        assert_eq!(make_path("", "server"), "server");
        assert_eq!(make_path("server", "port"), "server.port");
    }

    #[test]
    fn lookup_builder_tracks_presence() {
        let lookup = Lookup::new("PORT").with_default(Some("80"));
        assert!(!lookup.is_present());
        let lookup = lookup.with_value(Input::Text("81".to_owned()));
        assert!(lookup.is_present());
        assert_eq!(lookup.value.map(|input| input.to_string()).as_deref(), Some("81"));
    }
}
