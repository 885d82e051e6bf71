//! 目标类型的静态描述。
//!
//! # 设计目的（Why）
//! - 转换变体的选择依赖“目标是什么形状”，这里用编译期已知的 [`TypeInfo`] 取代运行时反射；
//! - `TypeId` 作为缓存键保证“同一类型只解析一次”，类型名用于错误消息。
//!
//! # 契约说明（What）
//! - 每个可写入的类型通过 [`Describe`] 给出唯一的 `TypeInfo`；
//! - 可选、序列、映射形状以函数指针延迟给出内部类型，避免描述期的无限递归；
//! - 自定义文本解码能力以 [`TextDecoder`] 附着在 `TypeInfo` 上，与形状正交。

use std::any::{TypeId, type_name};
use std::fmt;

use crate::error::ErrorCause;
use crate::value::Value;

/// 整数位宽。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    /// 平台指针宽度。
    Size,
}

/// 浮点位宽；复数按分量位宽描述。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// 目标类型的语义形状。
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    Complex(FloatWidth),
    String,
    /// 变长字节序列 `Vec<u8>`。
    Bytes,
    /// 定长字节缓冲 `[u8; N]`。
    ByteArray(usize),
    /// `Option<T>`，携带内部类型描述。
    Optional(fn() -> TypeInfo),
    /// `Vec<T>`，携带元素类型描述。
    Sequence(fn() -> TypeInfo),
    /// `String` 键映射，携带值类型描述。
    Mapping(fn() -> TypeInfo),
    /// 动态值 [`Value`] 本身。
    Dynamic,
    /// 无内建族的用户类型，只能经文本解码或自定义变体写入。
    Opaque,
}

/// 文本解码的接收方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// 通过值构造（`FromStr` 风格），结果即目标值。
    Value,
    /// 只能在已分配的实例上原地解码，结果以新分配的可选值返回。
    InPlace,
}

/// 附着在类型描述上的“从文本解码”能力。
#[derive(Clone, Copy)]
pub struct TextDecoder {
    decode: fn(&str) -> Result<Value, ErrorCause>,
    receiver: Receiver,
}

impl TextDecoder {
    /// 值接收方式的解码器。
    pub const fn by_value(decode: fn(&str) -> Result<Value, ErrorCause>) -> Self {
        Self {
            decode,
            receiver: Receiver::Value,
        }
    }

    /// 原地接收方式的解码器。
    pub const fn in_place(decode: fn(&str) -> Result<Value, ErrorCause>) -> Self {
        Self {
            decode,
            receiver: Receiver::InPlace,
        }
    }

    /// 接收方式。
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// 执行解码；原地接收方式的结果包装为 `Value::Optional(Some(..))`。
    pub fn decode(&self, raw: &str) -> Result<Value, ErrorCause> {
        let decoded = (self.decode)(raw)?;
        Ok(match self.receiver {
            Receiver::Value => decoded,
            Receiver::InPlace => Value::Optional(Some(Box::new(decoded))),
        })
    }
}

impl fmt::Debug for TextDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextDecoder")
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

/// 目标类型的静态描述：身份、名称、形状与可选的文本解码能力。
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    shape: Shape,
    text: Option<TextDecoder>,
}

impl TypeInfo {
    /// 以类型参数与形状构造描述。
    pub fn of<T: ?Sized + 'static>(shape: Shape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape,
            text: None,
        }
    }

    /// 附加文本解码能力。
    pub fn with_text(mut self, decoder: TextDecoder) -> Self {
        self.text = Some(decoder);
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn text_decoder(&self) -> Option<TextDecoder> {
        self.text
    }

    /// 可选形状的内部类型。
    pub fn pointee(&self) -> Option<TypeInfo> {
        match self.shape {
            Shape::Optional(pointee) => Some(pointee()),
            _ => None,
        }
    }

    /// 序列形状的元素类型。
    pub fn element(&self) -> Option<TypeInfo> {
        match self.shape {
            Shape::Sequence(element) => Some(element()),
            _ => None,
        }
    }

    /// 是否为序列形状（不含 `Vec<u8>`）。
    pub fn is_sequence(&self) -> bool {
        matches!(self.shape, Shape::Sequence(_))
    }

    /// 是否为布尔，或内部类型为布尔的可选值。
    pub fn is_boolean(&self) -> bool {
        match self.shape {
            Shape::Bool => true,
            Shape::Optional(pointee) => matches!(pointee().shape, Shape::Bool),
            _ => false,
        }
    }

    /// 该形状能否表示“缺席”。
    pub fn is_nilable(&self) -> bool {
        matches!(
            self.shape,
            Shape::Optional(_)
                | Shape::Sequence(_)
                | Shape::Bytes
                | Shape::Mapping(_)
                | Shape::Dynamic
        )
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("text", &self.text.is_some())
            .finish()
    }
}

/// 为类型提供静态描述。
pub trait Describe: 'static {
    /// 类型自身的描述。
    fn describe() -> TypeInfo;

    /// `Vec<Self>` 的描述；字节元素覆写为 [`Shape::Bytes`]。
    fn describe_sequence() -> TypeInfo
    where
        Self: Sized,
    {
        TypeInfo::of::<Vec<Self>>(Shape::Sequence(Self::describe))
    }
}
