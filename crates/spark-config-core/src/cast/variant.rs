//! 转换变体：每个变体负责一族目标类型。
//!
//! # 设计目的（Why）
//! - 以封闭的标签枚举取代运行时反射：变体集合固定、优先级固定，解析结果可被缓存；
//! - 需要扩展时，调用方实现 [`CastStrategy`] 并以 [`CastVariant::Custom`] 追加在内建变体之后。
//!
//! # 契约说明（What）
//! - `supports` 只看 [`TypeInfo`]，不做任何 I/O；
//! - `cast` 失败时一律返回 [`CastError::ParseFailed`]，并携带原始输入与底层原因；
//! - 除字节序列与文本解码外，所有内建变体先去除首尾空白再解析。

use std::fmt;
use std::sync::Arc;

use crate::cast::complex::parse_complex;
use crate::cast::numeric::{parse_bool, parse_float, parse_int, parse_uint};
use crate::cast::registry::CastRegistry;
use crate::error::{CastError, ErrorCause};
use crate::types::{Shape, TypeInfo};
use crate::value::Value;

/// 调用方自定义的转换策略。
///
/// # 契约说明（What）
/// - `supports` 对同一 `TypeInfo` 必须给出稳定答案，注册表会缓存首次解析的结果；
/// - 实现需满足 `Send + Sync`，注册表可能被多个加载调用并发共享。
pub trait CastStrategy: Send + Sync {
    /// 策略名，用于日志。
    fn name(&self) -> &'static str;

    /// 是否支持目标类型。
    fn supports(&self, target: &TypeInfo) -> bool;

    /// 把原始字符串转换为目标类型的值。
    fn cast(&self, raw: &str, target: &TypeInfo) -> Result<Value, CastError>;
}

/// 一种转换变体。
///
/// 列表顺序即默认优先级：文本解码 > 定长字节缓冲 > 字符串 > 字节序列 > 布尔 > 有符号整数 >
/// 无符号整数 > 浮点 > 复数 > 序列 > 自定义。
#[derive(Clone)]
pub enum CastVariant {
    TextDecodable,
    FixedByteBuffer,
    String,
    ByteSequence,
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    /// 逗号分隔的元素序列，逐个按元素类型转换。
    Sequence,
    Custom(Arc<dyn CastStrategy>),
}

impl CastVariant {
    /// 内建变体，按优先级排列。
    pub const BUILTIN: [CastVariant; 10] = [
        Self::TextDecodable,
        Self::FixedByteBuffer,
        Self::String,
        Self::ByteSequence,
        Self::Bool,
        Self::Int,
        Self::Uint,
        Self::Float,
        Self::Complex,
        Self::Sequence,
    ];

    /// 变体名。
    pub fn name(&self) -> &'static str {
        match self {
            Self::TextDecodable => "text-decodable",
            Self::FixedByteBuffer => "fixed-byte-buffer",
            Self::String => "string",
            Self::ByteSequence => "byte-sequence",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Complex => "complex",
            Self::Sequence => "sequence",
            Self::Custom(strategy) => strategy.name(),
        }
    }

    /// 是否支持目标类型。
    pub fn supports(&self, target: &TypeInfo) -> bool {
        match (self, target.shape()) {
            (Self::TextDecodable, _) => target.text_decoder().is_some(),
            (Self::FixedByteBuffer, Shape::ByteArray(_))
            | (Self::String, Shape::String)
            | (Self::ByteSequence, Shape::Bytes)
            | (Self::Bool, Shape::Bool)
            | (Self::Int, Shape::Int(_))
            | (Self::Uint, Shape::Uint(_))
            | (Self::Float, Shape::Float(_))
            | (Self::Complex, Shape::Complex(_))
            | (Self::Sequence, Shape::Sequence(_)) => true,
            (Self::Custom(strategy), _) => strategy.supports(target),
            _ => false,
        }
    }

    /// 执行转换。
    ///
    /// 序列变体需要回到注册表为元素类型解析变体，因此签名带上 `registry`。
    pub fn cast(
        &self,
        registry: &CastRegistry,
        raw: &str,
        target: &TypeInfo,
    ) -> Result<Value, CastError> {
        let failed = |cause: ErrorCause| CastError::parse_failed(target, raw, cause);
        match (self, target.shape()) {
            (Self::TextDecodable, _) => match target.text_decoder() {
                Some(decoder) => decoder.decode(raw).map_err(failed),
                None => Err(CastError::unsupported(target)),
            },
            (Self::FixedByteBuffer, Shape::ByteArray(len)) => {
                let mut buffer = vec![0_u8; len];
                let copied = raw.len().min(len);
                buffer[..copied].copy_from_slice(&raw.as_bytes()[..copied]);
                Ok(Value::Bytes(buffer))
            }
            (Self::String, Shape::String) => Ok(Value::Text(raw.trim().to_owned())),
            (Self::ByteSequence, Shape::Bytes) => Ok(Value::Bytes(raw.as_bytes().to_vec())),
            (Self::Bool, Shape::Bool) => parse_bool(raw.trim())
                .map(Value::Bool)
                .map_err(|err| failed(err.into())),
            (Self::Int, Shape::Int(width)) => parse_int(raw.trim(), width)
                .map(Value::Int)
                .map_err(|err| failed(err.into())),
            (Self::Uint, Shape::Uint(width)) => parse_uint(raw.trim(), width)
                .map(Value::Uint)
                .map_err(|err| failed(err.into())),
            (Self::Float, Shape::Float(width)) => parse_float(raw.trim(), width)
                .map(Value::Float)
                .map_err(|err| failed(err.into())),
            (Self::Complex, Shape::Complex(width)) => parse_complex(raw.trim(), width)
                .map(Value::Complex)
                .map_err(failed),
            (Self::Sequence, Shape::Sequence(element)) => cast_sequence(registry, raw, target, &element()),
            (Self::Custom(strategy), _) => strategy.cast(raw, target),
            _ => Err(CastError::unsupported(target)),
        }
    }
}

fn cast_sequence(
    registry: &CastRegistry,
    raw: &str,
    target: &TypeInfo,
    element: &TypeInfo,
) -> Result<Value, CastError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    trimmed
        .split(',')
        .map(|token| {
            let item = registry.cast(token.trim(), element).map_err(|err| match err {
                CastError::ParseFailed { cause, .. } => CastError::parse_failed(target, raw, cause),
                unsupported => unsupported,
            })?;
            // 原地解码的元素以新分配的可选值返回，非可选元素需要拆开。
            Ok(match item {
                Value::Optional(Some(inner)) if !matches!(element.shape(), Shape::Optional(_)) => *inner,
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

impl fmt::Debug for CastVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(strategy) => f.debug_tuple("Custom").field(&strategy.name()).finish(),
            builtin => f.write_str(builtin.name()),
        }
    }
}

impl PartialEq for CastVariant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}
