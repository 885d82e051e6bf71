//! 合并模式与“是否写入”判定。
//!
//! # 契约说明（What）
//! - [`LoadMode::Override`]：来源有值即写入；无值时仅在默认值非空且槽位为零值时写入；
//! - [`LoadMode::FillMissing`]：槽位非零一律跳过；否则来源有值或默认值非空即写入；
//! - 判定是纯函数，不读写槽位以外的任何状态。
//!
//! # 设计取舍（Trade-offs）
//! - `FillMissing` 让多个来源按“低优先级在前”的顺序叠加而互不覆盖；
//!   `Override` 则总是偏向当前来源。

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::slot::Slot;

/// 多来源叠加时的合并策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "kebab-case")
)]
pub enum LoadMode {
    /// 来源值总是替换现有状态。
    #[default]
    Override,
    /// 只填充仍为零值的字段。
    FillMissing,
}

impl LoadMode {
    /// 未指定模式时按 `Override` 处理。
    pub fn resolve(mode: Option<LoadMode>) -> LoadMode {
        mode.unwrap_or_default()
    }

    /// 模式的文本名。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::FillMissing => "fill-missing",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 无法识别的模式名。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown load mode `{0}`, expected `override` or `fill-missing`")]
pub struct UnknownLoadMode(pub String);

impl FromStr for LoadMode {
    type Err = UnknownLoadMode;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "override" => Ok(Self::Override),
            "fill-missing" | "fill_missing" => Ok(Self::FillMissing),
            _ => Err(UnknownLoadMode(text.to_owned())),
        }
    }
}

/// 判定槽位是否应被（重新）写入。
///
/// `default` 为 `None` 或空串都视为“没有默认值”。
pub fn should_assign(
    slot: &dyn Slot,
    present: bool,
    mode: LoadMode,
    default: Option<&str>,
) -> bool {
    decide(slot.is_zero(), present, mode, default)
}

/// 与槽位解耦的判定，供记录级（可选子记录）判定复用。
pub(crate) fn decide(is_zero: bool, present: bool, mode: LoadMode, default: Option<&str>) -> bool {
    let has_default = default.is_some_and(|value| !value.is_empty());
    match mode {
        LoadMode::Override => present || (has_default && is_zero),
        LoadMode::FillMissing => is_zero && (present || has_default),
    }
}
