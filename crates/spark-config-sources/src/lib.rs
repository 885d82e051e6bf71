//! spark-config-sources：内建配置来源。
//!
//! # 设计目的（Why）
//! - 核心引擎只定义“如何把值写进字段”，取数与命名约定由来源负责；
//! - 本 crate 提供四类常用来源，全部基于 [`spark_config_core::Traversal`] 驱动，
//!   因而在模式判定、转换与错误聚合上语义一致。
//!
//! # 模块地图（How）
//! - [`env`]：按前缀与嵌套段拼接 `UPPER_SNAKE` 键读取环境变量，支持默认值与分隔符；
//! - [`flags`]：解析 `--name value` / `--name=value` / `--no-name` / `-x` 形式的命令行参数；
//! - [`dict`]：进程内的动态值映射，按多种命名约定匹配键；
//! - [`json`]：JSON 文档（文件或内存），需要 `json` 特性；
//! - [`naming`]：上述来源共享的命名约定转换。
//!
//! # 契约说明（What）
//! - 每个来源都实现 [`spark_config_core::Source`]，可单独调用，也可交给 [`spark_config_core::Loader`] 编排；
//! - 环境变量、命令行与 JSON 来源只填充声明了 `key` 属性的叶子，字典来源按字段名匹配；
//! - 来源在 `load` 时读取快照，不缓存跨次加载的状态。

pub mod dict;
pub mod env;
pub mod flags;
#[cfg(feature = "json")]
pub mod json;
pub mod naming;

pub use dict::DictSource;
pub use env::EnvSource;
pub use flags::{FlagsSource, parse_arguments};
#[cfg(feature = "json")]
pub use json::{JsonSource, ReadFailed, RootNotObject};
pub use naming::{
    normalize_delimited, resolve_delimiter, to_env_var, to_lower_snake, to_upper_snake,
};
