//! 字符串到目标类型的转换。
//!
//! - [`CastRegistry`]：按优先级扫描变体并记忆化解析结果；
//! - [`CastVariant`]：封闭的内建变体集合，外加调用方的 [`CastStrategy`]。

mod complex;
mod numeric;
mod registry;
mod variant;

pub use registry::{CastRegistry, CastRegistryBuilder};
pub use variant::{CastStrategy, CastVariant};
