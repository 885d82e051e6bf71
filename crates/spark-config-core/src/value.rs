//! 动态类型的输入值与转换结果。
//!
//! # 设计目的（Why）
//! - 字典、结构化文档等来源提供的是“已带类型”的值，转换注册表产出的也是尚未落位的值；
//!   两者都以 [`Value`] 表达，赋值阶梯只需面对一种输入形态。
//!
//! # 契约说明（What）
//! - 整数族统一以 `i64` / `u64` 承载，落位时再按目标位宽做范围检查；
//! - [`Value::Optional`] 对应“新分配的可选值”，由可选目标的转换或原地解码产生；
//! - [`Opaque`] 承载用户自定义类型，可克隆、可按类型取回。

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;

/// 实部与虚部组成的复数。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: fmt::Display + PartialOrd + Default> fmt::Display for Complex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < T::default() {
            write!(f, "({}{}i)", self.re, self.im)
        } else {
            write!(f, "({}+{}i)", self.re, self.im)
        }
    }
}

type Payload = Box<dyn Any + Send + Sync>;

fn clone_payload<T: Any + Clone + Send + Sync>(payload: &(dyn Any + Send + Sync)) -> Payload {
    match payload.downcast_ref::<T>() {
        Some(value) => Box::new(value.clone()),
        None => Box::new(()),
    }
}

/// 类型擦除后的用户值。
pub struct Opaque {
    type_name: &'static str,
    payload: Payload,
    clone: fn(&(dyn Any + Send + Sync)) -> Payload,
}

impl Opaque {
    pub fn new<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            payload: Box::new(value),
            clone: clone_payload::<T>,
        }
    }

    /// 被擦除类型的名称。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// 取回具体类型；类型不符时原样返回。
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self {
            type_name,
            payload,
            clone,
        } = self;
        match payload.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(payload) => Err(Self {
                type_name,
                payload,
                clone,
            }),
        }
    }
}

impl Clone for Opaque {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            payload: (self.clone)(&*self.payload),
            clone: self.clone,
        }
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}

/// 动态类型的值。
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// 缺席。
    #[default]
    Null,
    Bool(bool),
    /// 有符号整数族。
    Int(i64),
    /// 无符号整数族。
    Uint(u64),
    Float(f64),
    Complex(Complex<f64>),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// 新分配的可选值；`None` 等价于带类型的空指针。
    Optional(Option<Box<Value>>),
    Opaque(Opaque),
}

impl Value {
    /// 包装用户类型。
    pub fn opaque<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Self::Opaque(Opaque::new(value))
    }

    /// 字节序列。
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// 以键值对构造映射。
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// 以元素构造列表。
    pub fn list<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// 是否表示缺席：`Null` 或空的可选值。
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null | Self::Optional(None))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// 值的种类名，用于日志。
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Complex(_) => "complex",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Optional(_) => "optional",
            Self::Opaque(opaque) => opaque.type_name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Complex(a), Self::Complex(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Optional(a), Self::Optional(b)) => a == b,
            // 擦除后的值无法比较。
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null | Self::Optional(None) => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Complex(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Bytes(value) => f.write_str(&String::from_utf8_lossy(value)),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Optional(Some(inner)) => write!(f, "{inner}"),
            Self::Opaque(opaque) => write!(f, "<{}>", opaque.type_name()),
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),* => $target:ty) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::$variant(<$target>::from(value))
            }
        }
    )*};
}

value_from!(Int: i8, i16, i32, i64 => i64);
value_from!(Uint: u8, u16, u32, u64 => u64);
value_from!(Float: f32, f64 => f64);

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Uint(value as u64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Complex<f64>> for Value {
    fn from(value: Complex<f64>) -> Self {
        Self::Complex(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
