//! 字段槽位：可寻址的目标位置及其语义类型。
//!
//! # 设计目的（Why）
//! - 赋值阶梯（精确赋值 → 可选包装/解包 → 数值可转换回退）需要对任意字段统一发问：
//!   “这个值能否原样放进来？能否转换后放进来？能否置为缺席？”；
//! - [`Slot`] 以对象安全的方式回答这些问题，遍历驱动只需持有 `&mut dyn Slot`。
//!
//! # 逻辑解析（How）
//! - `put_exact` 只接受与目标同族的值（整数族会做位宽检查）；不接受时通过 [`Put::Declined`] 原样交还；
//! - `put_converted` 处理跨族的数值转换（整数 ↔ 无符号 ↔ 浮点），越界报 `ParseFailed`；
//! - `put_absent` 仅对能表示缺席的形状（可选、序列、映射、动态值）返回 `true`；
//! - 可选槽位额外实现 [`OptionalSlot`]，负责“分配新实例并包装”。
//!
//! # 契约说明（What）
//! - 槽位拒绝赋值时绝不修改自身；
//! - 整数族判零按值，浮点与复数按位模式判零（`-0.0` 视为非零）。

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::error::{CastError, ErrorCause};
use crate::types::{Describe, FloatWidth, IntWidth, Shape, TypeInfo};
use crate::value::{Complex, Value};

/// 一次落位尝试的结果。
#[derive(Debug)]
pub enum Put {
    /// 已写入槽位。
    Assigned,
    /// 未写入，原值交还给调用方继续尝试下一步。
    Declined(Value),
}

/// 可写入的字段槽位。
pub trait Slot {
    /// 槽位的静态类型描述。
    fn slot_type(&self) -> TypeInfo;

    /// 槽位当前是否为零值（未设置）。
    fn is_zero(&self) -> bool;

    /// 精确类型赋值。
    fn put_exact(&mut self, value: Value) -> Put;

    /// 数值或结构上的可转换赋值。
    fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
        Ok(Put::Declined(value))
    }

    /// 置为缺席；形状无法表示缺席时返回 `false` 且不做修改。
    fn put_absent(&mut self) -> bool {
        false
    }

    /// 可选槽位的专用视图。
    fn as_optional(&mut self) -> Option<&mut dyn OptionalSlot> {
        None
    }
}

/// `Option<T>` 槽位的包装能力。
pub trait OptionalSlot: Slot {
    /// 内部类型描述。
    fn pointee_type(&self) -> TypeInfo;

    /// 以精确赋值构造新的内部实例并包装。
    fn wrap_exact(&mut self, value: Value) -> Put;

    /// 以可转换赋值构造新的内部实例并包装。
    fn wrap_converted(&mut self, value: Value) -> Result<Put, CastError>;
}

/// 能作为可选值、序列元素或映射值的标量。
pub trait Scalar: Slot + Describe + Default {}

impl<T: Slot + Describe + Default> Scalar for T {}

/// 原地文本解码能力，对应只能在已分配实例上解码的类型。
pub trait DecodeText {
    fn decode_text(&mut self, text: &str) -> Result<(), ErrorCause>;
}

#[derive(Debug, Error)]
#[error("value out of range")]
struct OutOfRange;

fn out_of_range(target: TypeInfo, value: &Value) -> CastError {
    CastError::parse_failed(&target, value.to_string(), OutOfRange)
}

fn truncate_float(value: f64) -> Option<i128> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i128::MIN as f64 || truncated > i128::MAX as f64 {
        return None;
    }
    Some(truncated as i128)
}

macro_rules! integer_slots {
    ($variant:ident: $($ty:ty),* $(,)?) => {$(
        impl Slot for $ty {
            fn slot_type(&self) -> TypeInfo {
                <$ty as Describe>::describe()
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn put_exact(&mut self, value: Value) -> Put {
                match value {
                    Value::$variant(raw) => match <$ty>::try_from(raw) {
                        Ok(narrowed) => {
                            *self = narrowed;
                            Put::Assigned
                        }
                        Err(_) => Put::Declined(Value::$variant(raw)),
                    },
                    other => Put::Declined(other),
                }
            }

            fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
                let converted = match &value {
                    Value::Int(raw) => <$ty>::try_from(*raw).ok(),
                    Value::Uint(raw) => <$ty>::try_from(*raw).ok(),
                    Value::Float(raw) => truncate_float(*raw).and_then(|t| <$ty>::try_from(t).ok()),
                    _ => return Ok(Put::Declined(value)),
                };
                match converted {
                    Some(converted) => {
                        *self = converted;
                        Ok(Put::Assigned)
                    }
                    None => Err(out_of_range(self.slot_type(), &value)),
                }
            }
        }
    )*};
}

integer_slots!(Int: i8, i16, i32, i64, isize);
integer_slots!(Uint: u8, u16, u32, u64, usize);

macro_rules! describe_as {
    ($($ty:ty => $shape:expr),* $(,)?) => {$(
        impl Describe for $ty {
            fn describe() -> TypeInfo {
                TypeInfo::of::<$ty>($shape)
            }
        }
    )*};
}

describe_as!(
    bool => Shape::Bool,
    i8 => Shape::Int(IntWidth::W8),
    i16 => Shape::Int(IntWidth::W16),
    i32 => Shape::Int(IntWidth::W32),
    i64 => Shape::Int(IntWidth::W64),
    isize => Shape::Int(IntWidth::Size),
    u16 => Shape::Uint(IntWidth::W16),
    u32 => Shape::Uint(IntWidth::W32),
    u64 => Shape::Uint(IntWidth::W64),
    usize => Shape::Uint(IntWidth::Size),
    f32 => Shape::Float(FloatWidth::F32),
    f64 => Shape::Float(FloatWidth::F64),
    Complex<f32> => Shape::Complex(FloatWidth::F32),
    Complex<f64> => Shape::Complex(FloatWidth::F64),
    String => Shape::String,
    Value => Shape::Dynamic,
);

impl Describe for u8 {
    fn describe() -> TypeInfo {
        TypeInfo::of::<u8>(Shape::Uint(IntWidth::W8))
    }

    fn describe_sequence() -> TypeInfo {
        TypeInfo::of::<Vec<u8>>(Shape::Bytes)
    }
}

impl Slot for bool {
    fn slot_type(&self) -> TypeInfo {
        <bool as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn put_exact(&mut self, value: Value) -> Put {
        match value {
            Value::Bool(flag) => {
                *self = flag;
                Put::Assigned
            }
            other => Put::Declined(other),
        }
    }
}

macro_rules! float_slots {
    ($($ty:ty),*) => {$(
        impl Slot for $ty {
            fn slot_type(&self) -> TypeInfo {
                <$ty as Describe>::describe()
            }

            fn is_zero(&self) -> bool {
                self.to_bits() == 0
            }

            fn put_exact(&mut self, value: Value) -> Put {
                match value {
                    Value::Float(raw) => {
                        *self = raw as $ty;
                        Put::Assigned
                    }
                    other => Put::Declined(other),
                }
            }

            fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
                match value {
                    Value::Int(raw) => *self = raw as $ty,
                    Value::Uint(raw) => *self = raw as $ty,
                    other => return Ok(Put::Declined(other)),
                }
                Ok(Put::Assigned)
            }
        }

        impl Slot for Complex<$ty> {
            fn slot_type(&self) -> TypeInfo {
                <Complex<$ty> as Describe>::describe()
            }

            fn is_zero(&self) -> bool {
                self.re.to_bits() == 0 && self.im.to_bits() == 0
            }

            fn put_exact(&mut self, value: Value) -> Put {
                match value {
                    Value::Complex(raw) => {
                        *self = Complex::new(raw.re as $ty, raw.im as $ty);
                        Put::Assigned
                    }
                    other => Put::Declined(other),
                }
            }
        }
    )*};
}

float_slots!(f32, f64);

impl Slot for String {
    fn slot_type(&self) -> TypeInfo {
        <String as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn put_exact(&mut self, value: Value) -> Put {
        match value {
            Value::Text(text) => {
                *self = text;
                Put::Assigned
            }
            other => Put::Declined(other),
        }
    }

    fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
        match value {
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    *self = text;
                    Ok(Put::Assigned)
                }
                Err(err) => Ok(Put::Declined(Value::Bytes(err.into_bytes()))),
            },
            other => Ok(Put::Declined(other)),
        }
    }
}

impl Slot for Value {
    fn slot_type(&self) -> TypeInfo {
        <Value as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn put_exact(&mut self, value: Value) -> Put {
        *self = value;
        Put::Assigned
    }

    fn put_absent(&mut self) -> bool {
        *self = Value::Null;
        true
    }
}

impl<const N: usize> Describe for [u8; N] {
    fn describe() -> TypeInfo {
        TypeInfo::of::<[u8; N]>(Shape::ByteArray(N))
    }
}

impl<const N: usize> Slot for [u8; N] {
    fn slot_type(&self) -> TypeInfo {
        <[u8; N] as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        self.iter().all(|byte| *byte == 0)
    }

    fn put_exact(&mut self, value: Value) -> Put {
        match value {
            Value::Bytes(bytes) if bytes.len() == N => {
                self.copy_from_slice(&bytes);
                Put::Assigned
            }
            other => Put::Declined(other),
        }
    }
}

fn element_exact<T: Scalar>(item: &Value) -> Option<T> {
    let mut element = T::default();
    match element.put_exact(item.clone()) {
        Put::Assigned => Some(element),
        Put::Declined(_) => None,
    }
}

fn element_converted<T: Scalar>(item: Value) -> Result<Option<T>, CastError> {
    let mut element = T::default();
    let item = match element.put_exact(item) {
        Put::Assigned => return Ok(Some(element)),
        Put::Declined(item) => item,
    };
    match element.put_converted(item)? {
        Put::Assigned => Ok(Some(element)),
        Put::Declined(_) => Ok(None),
    }
}

fn bytes_as_items(bytes: &[u8]) -> Vec<Value> {
    bytes.iter().map(|byte| Value::Uint(u64::from(*byte))).collect()
}

impl<T: Scalar> Describe for Vec<T> {
    fn describe() -> TypeInfo {
        T::describe_sequence()
    }
}

impl<T: Scalar> Slot for Vec<T> {
    fn slot_type(&self) -> TypeInfo {
        <Vec<T> as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn put_exact(&mut self, value: Value) -> Put {
        let collected = match &value {
            Value::List(items) => items.iter().map(element_exact::<T>).collect::<Option<Vec<T>>>(),
            Value::Bytes(bytes) => bytes_as_items(bytes)
                .iter()
                .map(element_exact::<T>)
                .collect::<Option<Vec<T>>>(),
            _ => None,
        };
        match collected {
            Some(elements) => {
                *self = elements;
                Put::Assigned
            }
            None => Put::Declined(value),
        }
    }

    fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
        let items = match &value {
            Value::List(items) => items.clone(),
            Value::Bytes(bytes) => bytes_as_items(bytes),
            _ => return Ok(Put::Declined(value)),
        };
        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            match element_converted::<T>(item)? {
                Some(element) => elements.push(element),
                None => return Ok(Put::Declined(value)),
            }
        }
        *self = elements;
        Ok(Put::Assigned)
    }

    fn put_absent(&mut self) -> bool {
        self.clear();
        true
    }
}

macro_rules! mapping_slots {
    ($($map:ident),*) => {$(
        impl<T: Scalar> Describe for $map<String, T> {
            fn describe() -> TypeInfo {
                TypeInfo::of::<$map<String, T>>(Shape::Mapping(T::describe))
            }
        }

        impl<T: Scalar> Slot for $map<String, T> {
            fn slot_type(&self) -> TypeInfo {
                <$map<String, T> as Describe>::describe()
            }

            fn is_zero(&self) -> bool {
                self.is_empty()
            }

            fn put_exact(&mut self, value: Value) -> Put {
                let Value::Map(entries) = &value else {
                    return Put::Declined(value);
                };
                let collected = entries
                    .iter()
                    .map(|(key, item)| element_exact::<T>(item).map(|element| (key.clone(), element)))
                    .collect::<Option<$map<String, T>>>();
                match collected {
                    Some(collected) => {
                        *self = collected;
                        Put::Assigned
                    }
                    None => Put::Declined(value),
                }
            }

            fn put_converted(&mut self, value: Value) -> Result<Put, CastError> {
                let Value::Map(entries) = &value else {
                    return Ok(Put::Declined(value));
                };
                let mut collected = $map::new();
                for (key, item) in entries {
                    match element_converted::<T>(item.clone())? {
                        Some(element) => {
                            collected.insert(key.clone(), element);
                        }
                        None => return Ok(Put::Declined(value)),
                    }
                }
                *self = collected;
                Ok(Put::Assigned)
            }

            fn put_absent(&mut self) -> bool {
                self.clear();
                true
            }
        }
    )*};
}

mapping_slots!(BTreeMap, HashMap);

impl<T: Scalar> Describe for Option<T> {
    fn describe() -> TypeInfo {
        TypeInfo::of::<Option<T>>(Shape::Optional(T::describe))
    }
}

impl<T: Scalar> Slot for Option<T> {
    fn slot_type(&self) -> TypeInfo {
        <Option<T> as Describe>::describe()
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn put_exact(&mut self, value: Value) -> Put {
        match value {
            Value::Optional(None) => {
                *self = None;
                Put::Assigned
            }
            Value::Optional(Some(inner)) => match self.wrap_exact(*inner) {
                Put::Assigned => Put::Assigned,
                Put::Declined(inner) => Put::Declined(Value::Optional(Some(Box::new(inner)))),
            },
            other => Put::Declined(other),
        }
    }

    fn put_absent(&mut self) -> bool {
        *self = None;
        true
    }

    fn as_optional(&mut self) -> Option<&mut dyn OptionalSlot> {
        Some(self)
    }
}

impl<T: Scalar> OptionalSlot for Option<T> {
    fn pointee_type(&self) -> TypeInfo {
        T::describe()
    }

    fn wrap_exact(&mut self, value: Value) -> Put {
        let mut inner = T::default();
        match inner.put_exact(value) {
            Put::Assigned => {
                *self = Some(inner);
                Put::Assigned
            }
            declined => declined,
        }
    }

    fn wrap_converted(&mut self, value: Value) -> Result<Put, CastError> {
        let mut inner = T::default();
        match inner.put_converted(value)? {
            Put::Assigned => {
                *self = Some(inner);
                Ok(Put::Assigned)
            }
            declined => Ok(declined),
        }
    }
}

/// 供 [`impl_scalar!`] 展开使用：按 `TypeId` 取回擦除值。
#[doc(hidden)]
pub fn put_opaque<T: Any>(slot: &mut T, value: Value) -> Put {
    match value {
        Value::Opaque(opaque) => match opaque.downcast::<T>() {
            Ok(decoded) => {
                *slot = decoded;
                Put::Assigned
            }
            Err(opaque) => Put::Declined(Value::Opaque(opaque)),
        },
        other => Put::Declined(other),
    }
}

/// 把用户类型声明为可写入的标量。
///
/// # 契约说明（What）
/// - `impl_scalar!(T)`：不带内建转换，只能经自定义 [`CastStrategy`](crate::CastStrategy) 或已带类型的值写入；
/// - `impl_scalar!(T: from_str)`：以 `FromStr` 按值解码；
/// - `impl_scalar!(T: decode_text)`：以 [`DecodeText`] 原地解码，转换结果为新分配的可选值；
/// - 类型需满足 `Clone + Default + PartialEq + Send + Sync + 'static`，判零即“等于 `Default`”。
#[macro_export]
macro_rules! impl_scalar {
    (@impl $ty:ty, $describe:expr) => {
        impl $crate::Describe for $ty {
            fn describe() -> $crate::TypeInfo {
                $describe
            }
        }

        impl $crate::Slot for $ty {
            fn slot_type(&self) -> $crate::TypeInfo {
                <$ty as $crate::Describe>::describe()
            }

            fn is_zero(&self) -> bool {
                *self == <$ty as ::core::default::Default>::default()
            }

            fn put_exact(&mut self, value: $crate::Value) -> $crate::Put {
                $crate::slot::put_opaque(self, value)
            }
        }

        impl $crate::Field for $ty {
            fn as_field(&mut self) -> $crate::FieldMut<'_> {
                $crate::FieldMut::Leaf(self)
            }

            fn optional_as_field(slot: &mut ::core::option::Option<Self>) -> $crate::FieldMut<'_> {
                $crate::FieldMut::Leaf(slot)
            }

            fn field_is_zero(&self) -> bool {
                $crate::Slot::is_zero(self)
            }
        }
    };
    ($ty:ty : from_str) => {
        $crate::impl_scalar!(@impl $ty, $crate::TypeInfo::of::<$ty>($crate::Shape::Opaque).with_text(
            $crate::TextDecoder::by_value(|raw| {
                <$ty as ::core::str::FromStr>::from_str(raw)
                    .map($crate::Value::opaque)
                    .map_err(::core::convert::Into::into)
            }),
        ));
    };
    ($ty:ty : decode_text) => {
        $crate::impl_scalar!(@impl $ty, $crate::TypeInfo::of::<$ty>($crate::Shape::Opaque).with_text(
            $crate::TextDecoder::in_place(|raw| {
                let mut decoded = <$ty as ::core::default::Default>::default();
                $crate::DecodeText::decode_text(&mut decoded, raw)?;
                ::core::result::Result::Ok($crate::Value::opaque(decoded))
            }),
        ));
    };
    ($ty:ty) => {
        $crate::impl_scalar!(@impl $ty, $crate::TypeInfo::of::<$ty>($crate::Shape::Opaque));
    };
}
