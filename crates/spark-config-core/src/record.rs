//! 记录与字段描述表。
//!
//! # 设计目的（Why）
//! - 以显式的字段描述表取代运行时读取结构体标签：每个记录类型在编译期生成一张
//!   [`RecordSchema`]，列出字段名、类型名与 `{key, default, delimiter, segment, short, skip}`；
//! - 遍历驱动通过 [`Record::field_mut`] 按下标取得字段的可变视图 [`FieldMut`]，
//!   由视图的变体决定是当作叶子赋值、递归进入子记录，还是按需分配可选子记录。
//!
//! # 契约说明（What）
//! - 描述表只列出公开字段，私有字段永远不会被访问；
//! - 标记 `skip` 的字段仍出现在描述表中，但 `field_mut` 对其返回 `None`；
//! - 记录按值嵌套，记录图天然是树形，遍历无需记录访问路径来防止循环。
//!
//! 一般通过 `#[derive(Record)]` 生成实现，手写实现需保证 `field_mut` 的下标与描述表一致。

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};

use crate::error::LoadError;
use crate::slot::{Scalar, Slot};
use crate::types::{Shape, TypeInfo};
use crate::value::{Complex, Value};

/// 单个字段的声明式元数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldAttrs {
    /// 来源侧的键；缺省时由各来源按自己的命名约定从字段名推导。
    pub key: Option<&'static str>,
    /// 来源无值时使用的默认字符串。
    pub default: Option<&'static str>,
    /// 序列字段的分隔符。
    pub delimiter: Option<&'static str>,
    /// 嵌套记录在键路径中的段名。
    pub segment: Option<&'static str>,
    /// 命令行短名。
    pub short: Option<&'static str>,
    /// 不参与任何来源的填充。
    pub skip: bool,
}

impl FieldAttrs {
    pub const EMPTY: FieldAttrs = FieldAttrs {
        key: None,
        default: None,
        delimiter: None,
        segment: None,
        short: None,
        skip: false,
    };

    pub const fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    pub const fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn delimiter(mut self, delimiter: &'static str) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub const fn segment(mut self, segment: &'static str) -> Self {
        self.segment = Some(segment);
        self
    }

    pub const fn short(mut self, short: &'static str) -> Self {
        self.short = Some(short);
        self
    }

    pub const fn skip(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// 字段描述：名称、声明类型与元数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// 源码中声明的类型文本，仅用于诊断。
    pub type_name: &'static str,
    pub attrs: FieldAttrs,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, type_name: &'static str, attrs: FieldAttrs) -> Self {
        Self {
            name,
            type_name,
            attrs,
        }
    }

    /// 非空的默认值。
    pub fn default_value(&self) -> Option<&'static str> {
        self.attrs.default.filter(|value| !value.is_empty())
    }
}

/// 记录类型的字段描述表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl RecordSchema {
    pub const fn new(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { name, fields }
    }

    /// 按字段名查找描述。
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// 字段的可变视图。
pub enum FieldMut<'a> {
    /// 可直接赋值的叶子。
    Leaf(&'a mut dyn Slot),
    /// 嵌套记录。
    Record(&'a mut dyn Record),
    /// 可选的嵌套记录，进入前可能需要分配。
    OptionalRecord(&'a mut dyn OptionalRecord),
    /// 无法填充的字段类型。
    Unsupported(TypeInfo),
}

/// 可被来源填充的记录。
pub trait Record {
    /// 字段描述表。
    fn schema(&self) -> &'static RecordSchema;

    /// 第 `index` 个字段的可变视图；被跳过的字段与越界下标返回 `None`。
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;

    /// 全部参与填充的字段是否都为零值。
    fn is_zero(&self) -> bool;
}

/// `Option<R>` 形式的嵌套记录。
pub trait OptionalRecord {
    /// 内部记录类型名。
    fn record_name(&self) -> &'static str;

    fn is_absent(&self) -> bool;

    /// 缺席时分配默认实例，返回内部记录。
    fn materialize(&mut self) -> &mut dyn Record;

    /// 置为缺席。
    fn clear(&mut self);
}

impl<T: Record + Default + 'static> OptionalRecord for Option<T> {
    fn record_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn materialize(&mut self) -> &mut dyn Record {
        self.get_or_insert_with(T::default)
    }

    fn clear(&mut self) {
        *self = None;
    }
}

/// 可以作为记录字段出现的类型。
///
/// 叶子类型由本 crate 与 `impl_scalar!` 提供，记录类型由 `#[derive(Record)]` 提供。
pub trait Field {
    fn as_field(&mut self) -> FieldMut<'_>;

    /// `Option<Self>` 字段的视图。
    fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_>
    where
        Self: Sized;

    fn field_is_zero(&self) -> bool;
}

macro_rules! leaf_fields {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn as_field(&mut self) -> FieldMut<'_> {
                FieldMut::Leaf(self)
            }

            fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_> {
                FieldMut::Leaf(slot)
            }

            fn field_is_zero(&self) -> bool {
                Slot::is_zero(self)
            }
        }
    )*};
}

leaf_fields!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
    Complex<f32>, Complex<f64>, String, Value,
);

impl<T: Scalar> Field for Vec<T> {
    fn as_field(&mut self) -> FieldMut<'_> {
        FieldMut::Leaf(self)
    }

    fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_> {
        FieldMut::Leaf(slot)
    }

    fn field_is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Scalar> Field for BTreeMap<String, T> {
    fn as_field(&mut self) -> FieldMut<'_> {
        FieldMut::Leaf(self)
    }

    fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_> {
        FieldMut::Leaf(slot)
    }

    fn field_is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Scalar> Field for HashMap<String, T> {
    fn as_field(&mut self) -> FieldMut<'_> {
        FieldMut::Leaf(self)
    }

    fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_> {
        FieldMut::Leaf(slot)
    }

    fn field_is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<const N: usize> Field for [u8; N]
where
    [u8; N]: Default,
{
    fn as_field(&mut self) -> FieldMut<'_> {
        FieldMut::Leaf(self)
    }

    fn optional_as_field(slot: &mut Option<Self>) -> FieldMut<'_> {
        FieldMut::Leaf(slot)
    }

    fn field_is_zero(&self) -> bool {
        Slot::is_zero(self)
    }
}

impl<T: Field + 'static> Field for Option<T> {
    fn as_field(&mut self) -> FieldMut<'_> {
        T::optional_as_field(self)
    }

    fn optional_as_field(_slot: &mut Option<Self>) -> FieldMut<'_> {
        FieldMut::Unsupported(TypeInfo::of::<Option<Option<T>>>(Shape::Opaque))
    }

    fn field_is_zero(&self) -> bool {
        self.is_none()
    }
}

/// 校验加载目标：必须是存在的记录。
///
/// # 契约说明（What）
/// - 记录本身：直接返回；
/// - 已存在的可选记录：返回内部记录；
/// - 缺席的可选记录：`InvalidTarget("target must be a non-nil pointer to record")`；
/// - 叶子或不支持的类型：`InvalidTarget("target must be pointer to record")`；
/// - 任何失败都发生在写入之前。
pub fn ensure_target_record(target: &mut dyn Field) -> Result<&mut dyn Record, LoadError> {
    match target.as_field() {
        FieldMut::Record(record) => Ok(record),
        FieldMut::OptionalRecord(optional) => {
            if optional.is_absent() {
                Err(LoadError::invalid_target(
                    "target must be a non-nil pointer to record",
                ))
            } else {
                Ok(optional.materialize())
            }
        }
        FieldMut::Leaf(_) | FieldMut::Unsupported(_) => {
            Err(LoadError::invalid_target("target must be pointer to record"))
        }
    }
}
