//! 配置填充的错误域。
//!
//! # 设计背景（Why）
//! - 字段级失败（类型不受支持、解析失败）不能打断遍历，需要在一次加载结束时整体返回；
//! - 多来源编排时还要再包一层“第几个来源、叫什么名字”的归属信息；
//! - 调用方既要人类可读的消息，也要能按错误种类做判定，因此每个错误都带稳定错误码与 [`ErrorKind`]。
//!
//! # 契约说明（What）
//! - [`CastError`]：单个字符串/值转换为目标类型时的失败；
//! - [`FieldFailure`]：某个来源在某条字段路径上的失败，包装 [`CastError`]；
//! - [`LoadError`]：一次加载的最终错误，可能是目标非法、字段失败、来源失败、聚合或文档不可用；
//! - [`AggregatedError`]：按发生顺序保存的失败列表，不去重、不短路。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::types::TypeInfo;

/// 错误链中底层原因的统一装箱形式。
pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

/// 稳定错误码，遵循 `<领域>.<语义>` 命名，便于日志检索与聚合。
pub mod codes {
    /// 没有任何转换变体支持目标类型。
    pub const CAST_UNSUPPORTED_TYPE: &str = "config.cast.unsupported_type";
    /// 变体匹配成功但解码失败。
    pub const CAST_PARSE_FAILED: &str = "config.cast.parse_failed";
    /// 加载目标不是可写入的记录。
    pub const TARGET_INVALID: &str = "config.target.invalid";
    /// 来源在某条字段路径上赋值失败。
    pub const FIELD_FAILED: &str = "config.field.failed";
    /// 编排器中的某个来源整体失败。
    pub const SOURCE_FAILED: &str = "config.source.failed";
    /// 多个独立失败的聚合。
    pub const LOAD_AGGREGATED: &str = "config.load.aggregated";
    /// 来源无法取得或解析其原始文档。
    pub const DOCUMENT_UNAVAILABLE: &str = "config.document.unavailable";
}

/// 供调用方按种类判定的错误分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 没有转换变体适用于目标类型。
    UnsupportedType,
    /// 变体匹配但解码失败。
    ParseFailed,
    /// 加载目标不是非空的记录。
    InvalidTarget,
}

/// 输入为空时的专用原因，例如复数解析收到空串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("empty value")]
pub struct EmptyValue;

/// 字符串或动态值转换为目标类型时的失败。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CastError {
    /// 没有变体支持该类型，或赋值阶梯的所有步骤都无法落位。
    #[error("unsupported type {target}")]
    UnsupportedType {
        /// 目标类型名。
        target: &'static str,
    },
    /// 变体匹配成功但解码失败，始终携带底层原因。
    #[error("parse failed for type {target} with value \"{raw}\": {cause}")]
    ParseFailed {
        /// 目标类型名。
        target: &'static str,
        /// 触发失败的原始输入。
        raw: String,
        /// 底层原因。
        #[source]
        cause: ErrorCause,
    },
}

impl CastError {
    /// 以目标类型构造 `UnsupportedType`。
    pub fn unsupported(target: &TypeInfo) -> Self {
        Self::UnsupportedType {
            target: target.name(),
        }
    }

    /// 以目标类型、原始输入与原因构造 `ParseFailed`。
    pub fn parse_failed(
        target: &TypeInfo,
        raw: impl Into<String>,
        cause: impl Into<ErrorCause>,
    ) -> Self {
        Self::ParseFailed {
            target: target.name(),
            raw: raw.into(),
            cause: cause.into(),
        }
    }

    /// 错误种类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::ParseFailed { .. } => ErrorKind::ParseFailed,
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => codes::CAST_UNSUPPORTED_TYPE,
            Self::ParseFailed { .. } => codes::CAST_PARSE_FAILED,
        }
    }

    /// 失败所针对的目标类型名。
    pub fn target(&self) -> &'static str {
        match self {
            Self::UnsupportedType { target } | Self::ParseFailed { target, .. } => target,
        }
    }

    /// 解析失败时的原始输入。
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::ParseFailed { raw, .. } => Some(raw),
            Self::UnsupportedType { .. } => None,
        }
    }

    /// 原因链中是否出现 [`EmptyValue`]。
    pub fn is_empty_value(&self) -> bool {
        let Self::ParseFailed { cause, .. } = self else {
            return false;
        };
        let mut current: Option<&(dyn StdError + 'static)> = Some(cause.as_ref());
        while let Some(err) = current {
            if err.is::<EmptyValue>() {
                return true;
            }
            current = err.source();
        }
        false
    }
}

/// 某个来源在一条字段路径上的赋值失败。
///
/// # 契约说明（What）
/// - `origin` 为来源短名（如 `env`、`flags`、`dict`、`json`）；
/// - `key` / `value` 仅在来源按键取值时存在，渲染为 `origin key=value field path: cause`；
/// - 否则渲染为 `origin field path: cause`。
#[derive(Debug)]
pub struct FieldFailure {
    origin: Cow<'static, str>,
    path: String,
    entry: Option<(String, String)>,
    cause: CastError,
}

impl FieldFailure {
    /// 构造不带键值信息的字段失败。
    pub fn new(origin: impl Into<Cow<'static, str>>, path: impl Into<String>, cause: CastError) -> Self {
        Self {
            origin: origin.into(),
            path: path.into(),
            entry: None,
            cause,
        }
    }

    /// 附加来源侧的键与原始值。
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry = Some((key.into(), value.into()));
        self
    }

    /// 来源短名。
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// 以 `.` 连接的字段路径。
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 来源侧的键。
    pub fn key(&self) -> Option<&str> {
        self.entry.as_ref().map(|(key, _)| key.as_str())
    }

    /// 来源侧的原始值。
    pub fn value(&self) -> Option<&str> {
        self.entry.as_ref().map(|(_, value)| value.as_str())
    }

    /// 底层转换错误。
    pub fn cause(&self) -> &CastError {
        &self.cause
    }

    /// 错误种类，取自底层转换错误。
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some((key, value)) => write!(
                f,
                "{} {key}={value} field {}: {}",
                self.origin, self.path, self.cause
            ),
            None => write!(f, "{} field {}: {}", self.origin, self.path, self.cause),
        }
    }
}

impl StdError for FieldFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

/// 按发生顺序保存的一组独立失败。
#[derive(Debug, Default)]
pub struct AggregatedError {
    failures: Vec<LoadError>,
}

impl AggregatedError {
    /// 以失败列表构造聚合。
    pub fn new(failures: Vec<LoadError>) -> Self {
        Self { failures }
    }

    /// 全部失败，保持发生顺序。
    pub fn failures(&self) -> &[LoadError] {
        &self.failures
    }

    /// 失败数量。
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// 是否为空聚合。
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// 取出失败列表。
    pub fn into_failures(self) -> Vec<LoadError> {
        self.failures
    }
}

impl fmt::Display for AggregatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl StdError for AggregatedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.failures
            .first()
            .map(|failure| failure as &(dyn StdError + 'static))
    }
}

/// 一次加载（单来源或编排器）返回的错误。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// 目标不是非空的记录；立即返回，不做任何部分写入。
    #[error("invalid target: {reason}")]
    InvalidTarget {
        /// 失败原因。
        reason: Cow<'static, str>,
    },
    /// 单条字段路径上的失败。
    #[error(transparent)]
    Field(Box<FieldFailure>),
    /// 编排器中第 `index` 个来源失败。
    #[error("source at index {index} named {name} failed: {cause}")]
    SourceFailed {
        /// 来源在编排器中的位置。
        index: usize,
        /// 来源的类型名。
        name: Cow<'static, str>,
        /// 来源返回的错误。
        #[source]
        cause: Box<LoadError>,
    },
    /// 多个独立失败的聚合。
    #[error("aggregated load failed: {0}")]
    Aggregated(#[source] AggregatedError),
    /// 来源无法读取或解析原始文档。
    #[error("{origin} document unavailable: {cause}")]
    Document {
        /// 来源短名。
        origin: Cow<'static, str>,
        /// 底层原因。
        #[source]
        cause: ErrorCause,
    },
}

impl LoadError {
    /// 构造 `InvalidTarget`。
    pub fn invalid_target(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    /// 构造 `Document`。
    pub fn document(origin: impl Into<Cow<'static, str>>, cause: impl Into<ErrorCause>) -> Self {
        Self::Document {
            origin: origin.into(),
            cause: cause.into(),
        }
    }

    /// 把失败列表折叠为结果：空列表视为成功。
    pub fn aggregate(failures: Vec<LoadError>) -> Result<(), LoadError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self::Aggregated(AggregatedError::new(failures)))
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => codes::TARGET_INVALID,
            Self::Field(_) => codes::FIELD_FAILED,
            Self::SourceFailed { .. } => codes::SOURCE_FAILED,
            Self::Aggregated(_) => codes::LOAD_AGGREGATED,
            Self::Document { .. } => codes::DOCUMENT_UNAVAILABLE,
        }
    }

    /// 递归判断错误树中是否含有指定种类的失败。
    pub fn contains(&self, kind: ErrorKind) -> bool {
        match self {
            Self::InvalidTarget { .. } => kind == ErrorKind::InvalidTarget,
            Self::Field(failure) => failure.kind() == kind,
            Self::SourceFailed { cause, .. } => cause.contains(kind),
            Self::Aggregated(aggregated) => aggregated
                .failures()
                .iter()
                .any(|failure| failure.contains(kind)),
            Self::Document { .. } => false,
        }
    }

    /// 展平错误树，按发生顺序列出全部字段级失败。
    pub fn field_failures(&self) -> Vec<&FieldFailure> {
        let mut collected = Vec::new();
        self.collect_fields(&mut collected);
        collected
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldFailure>) {
        match self {
            Self::Field(failure) => out.push(failure),
            Self::SourceFailed { cause, .. } => cause.collect_fields(out),
            Self::Aggregated(aggregated) => {
                for failure in aggregated.failures() {
                    failure.collect_fields(out);
                }
            }
            Self::InvalidTarget { .. } | Self::Document { .. } => {}
        }
    }
}

impl From<FieldFailure> for LoadError {
    fn from(failure: FieldFailure) -> Self {
        Self::Field(Box::new(failure))
    }
}
