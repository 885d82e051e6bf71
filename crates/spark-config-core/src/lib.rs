//! spark-config-core：把松散类型的输入（原始字符串或动态值）填充进强类型记录的核心引擎。
//!
//! # 设计意图（Why）
//! - 环境变量、命令行、字典、JSON 文档等来源各自负责“取数”，但“把取到的东西写进字段”这件事
//!   必须在所有来源间保持同一套语义，否则同一个配置在不同来源下会得到不同结果；
//! - 因此本 crate 只承载与来源无关的部分：类型转换注册表、赋值阶梯、合并策略、遍历驱动与错误聚合。
//!
//! # 模块地图（How）
//! - [`cast`]：有序的转换变体表与“类型 → 变体”的一次性记忆缓存；
//! - [`slot`]：字段槽位契约 [`Slot`]，以及内建标量、可选值、序列、映射的实现；
//! - [`assign`]：`assign_from_string` / `assign_from_any` 两个入口共享的回退阶梯；
//! - [`policy`]：[`LoadMode`] 与纯函数 [`should_assign`]；
//! - [`record`]：字段描述表、[`Record`] / [`Field`] 契约与 [`ensure_target_record`]；
//! - [`traverse`]：按描述表递归访问字段的 [`Traversal`] 驱动；
//! - [`source`]：来源契约 [`Source`] 与按序编排的 [`Loader`]；
//! - [`error`]：统一错误域与稳定错误码。
//!
//! # 契约说明（What）
//! - 单次加载同步执行，无内部并发；唯一共享的可变状态是注册表缓存，读无锁、写互斥、每个类型只写一次；
//! - 字段级失败从不打断遍历，统一在加载结束时聚合为一个错误返回。

extern crate self as spark_config_core;

pub mod assign;
pub mod cast;
pub mod error;
pub mod policy;
pub mod record;
pub mod slot;
pub mod source;
pub mod traverse;
pub mod types;
pub mod value;

pub use assign::{assign_from_any, assign_from_string};
pub use cast::{CastRegistry, CastRegistryBuilder, CastStrategy, CastVariant};
pub use error::{
    AggregatedError, CastError, EmptyValue, ErrorCause, ErrorKind, FieldFailure, LoadError,
    codes,
};
pub use policy::{LoadMode, UnknownLoadMode, should_assign};
pub use record::{
    FieldAttrs, FieldDescriptor, FieldMut, OptionalRecord, Record, RecordSchema, Field,
    ensure_target_record,
};
pub use slot::{DecodeText, OptionalSlot, Put, Scalar, Slot};
pub use source::{Loader, LoaderBuilder, Source};
pub use spark_config_macros::Record;
pub use traverse::{FieldProvider, Input, Lookup, Nested, Traversal, make_path};
pub use types::{Describe, FloatWidth, IntWidth, Receiver, Shape, TextDecoder, TypeInfo};
pub use value::{Complex, Opaque, Value};

/// 统一的结果别名，默认错误类型为 [`LoadError`]。
pub type Result<T, E = LoadError> = core::result::Result<T, E>;
