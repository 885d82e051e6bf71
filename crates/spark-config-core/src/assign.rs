//! 赋值引擎：把一个原始输入落到一个槽位上。
//!
//! # 设计目的（Why）
//! - 只提供字符串的来源（环境变量、命令行）与提供已带类型值的来源（字典、结构化文档）
//!   必须走同一条解析阶梯，保证不论来源如何，转换语义一致。
//!
//! # 逻辑解析（How）
//! 1. 精确赋值：值与槽位同族；
//! 2. 可选包装：槽位可选且值与内部类型同族时，分配新实例并包装；值本身是可选值时拆开再试；
//! 3. 可转换回退：数值族之间的转换；
//! 4. 以上都不成立时报 `UnsupportedType`（针对槽位类型）。
//!
//! # 契约说明（What）
//! - 失败时槽位保持原值；
//! - 缺席输入（`Null`、空可选值）只会把可表示缺席的槽位置空，其余槽位报 `UnsupportedType`。

use crate::cast::CastRegistry;
use crate::error::CastError;
use crate::slot::{OptionalSlot, Put, Slot};
use crate::types::Shape;
use crate::value::Value;

/// 把原始字符串经注册表转换后写入槽位。
pub fn assign_from_string(
    registry: &CastRegistry,
    slot: &mut dyn Slot,
    raw: &str,
) -> Result<(), CastError> {
    let slot_type = slot.slot_type();
    if let Some(optional) = slot.as_optional() {
        let pointee = optional.pointee_type();
        let cast = registry.cast(raw, &pointee)?;
        return wrap_ladder(optional, cast);
    }

    let cast = registry.cast(raw, &slot_type)?;
    let cast = match slot.put_exact(cast) {
        Put::Assigned => return Ok(()),
        Put::Declined(cast) => cast,
    };
    let cast = match cast {
        Value::Optional(Some(inner)) => match slot.put_exact(*inner) {
            Put::Assigned => return Ok(()),
            Put::Declined(inner) => inner,
        },
        other => other,
    };
    match slot.put_converted(cast)? {
        Put::Assigned => Ok(()),
        Put::Declined(_) => Err(CastError::unsupported(&slot_type)),
    }
}

/// 把已带类型的值写入槽位。
pub fn assign_from_any(
    registry: &CastRegistry,
    slot: &mut dyn Slot,
    value: Value,
) -> Result<(), CastError> {
    let slot_type = slot.slot_type();
    if value.is_absent() {
        return if slot.put_absent() {
            Ok(())
        } else {
            Err(CastError::unsupported(&slot_type))
        };
    }

    if matches!(slot_type.shape(), Shape::Dynamic) {
        return match slot.put_exact(value) {
            Put::Assigned => Ok(()),
            Put::Declined(_) => Err(CastError::unsupported(&slot_type)),
        };
    }

    let value = match value {
        Value::Text(text) => return assign_from_string(registry, slot, &text),
        other => other,
    };

    if let Some(optional) = slot.as_optional() {
        return wrap_ladder(optional, value);
    }

    let value = match slot.put_exact(value) {
        Put::Assigned => return Ok(()),
        Put::Declined(value) => value,
    };
    let value = match value {
        Value::Optional(Some(inner)) => {
            let inner = match slot.put_exact(*inner) {
                Put::Assigned => return Ok(()),
                Put::Declined(inner) => inner,
            };
            match slot.put_converted(inner)? {
                Put::Assigned => return Ok(()),
                Put::Declined(inner) => inner,
            }
        }
        other => other,
    };
    match slot.put_converted(value)? {
        Put::Assigned => Ok(()),
        Put::Declined(_) => Err(CastError::unsupported(&slot_type)),
    }
}

/// 可选槽位的阶梯：整体精确赋值 → 包装精确赋值 → 包装可转换赋值。
fn wrap_ladder(optional: &mut dyn OptionalSlot, value: Value) -> Result<(), CastError> {
    let slot_type = optional.slot_type();
    let value = match optional.put_exact(value) {
        Put::Assigned => return Ok(()),
        Put::Declined(value) => value,
    };
    let value = match value {
        Value::Optional(Some(inner)) => *inner,
        other => other,
    };
    let value = match optional.wrap_exact(value) {
        Put::Assigned => return Ok(()),
        Put::Declined(value) => value,
    };
    match optional.wrap_converted(value)? {
        Put::Assigned => Ok(()),
        Put::Declined(_) => Err(CastError::unsupported(&slot_type)),
    }
}
