//! 布尔、整数与浮点的文本解析。

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::types::{FloatWidth, IntWidth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid boolean token")]
pub(crate) struct InvalidBool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum FloatError {
    #[error(transparent)]
    Syntax(#[from] ParseFloatError),
    #[error("value out of range for 32-bit float")]
    Range,
}

/// 接受 `1/0/t/f/true/false`，大小写不敏感；调用方负责去除首尾空白。
pub(crate) fn parse_bool(text: &str) -> Result<bool, InvalidBool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(InvalidBool),
    }
}

/// 十进制解析，按目标位宽检测溢出。
pub(crate) fn parse_int(text: &str, width: IntWidth) -> Result<i64, ParseIntError> {
    Ok(match width {
        IntWidth::W8 => i64::from(text.parse::<i8>()?),
        IntWidth::W16 => i64::from(text.parse::<i16>()?),
        IntWidth::W32 => i64::from(text.parse::<i32>()?),
        IntWidth::W64 => text.parse::<i64>()?,
        IntWidth::Size => text.parse::<isize>()? as i64,
    })
}

pub(crate) fn parse_uint(text: &str, width: IntWidth) -> Result<u64, ParseIntError> {
    Ok(match width {
        IntWidth::W8 => u64::from(text.parse::<u8>()?),
        IntWidth::W16 => u64::from(text.parse::<u16>()?),
        IntWidth::W32 => u64::from(text.parse::<u32>()?),
        IntWidth::W64 => text.parse::<u64>()?,
        IntWidth::Size => text.parse::<usize>()? as u64,
    })
}

/// 十进制或科学计数法解析。
///
/// `f64` 上超出表示范围的字面量饱和为带符号无穷，不视为失败；
/// `f32` 上有限字面量溢出则报 [`FloatError::Range`]。
pub(crate) fn parse_float(text: &str, width: FloatWidth) -> Result<f64, FloatError> {
    let parsed = text.parse::<f64>()?;
    match width {
        FloatWidth::F64 => Ok(parsed),
        FloatWidth::F32 => {
            let narrowed = parsed as f32;
            if narrowed.is_infinite() && parsed.is_finite() {
                Err(FloatError::Range)
            } else {
                Ok(f64::from(narrowed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_tokens_are_case_insensitive() {
        for token in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(token), Ok(true), "token {token}");
        }
        for token in ["0", "f", "F", "false", "FALSE"] {
            assert_eq!(parse_bool(token), Ok(false), "token {token}");
        }
        assert_eq!(parse_bool("yes"), Err(InvalidBool));
        assert_eq!(parse_bool(""), Err(InvalidBool));
    }

    #[test]
    fn integer_width_overflow_is_detected() {
        assert_eq!(parse_int("127", IntWidth::W8), Ok(127));
        assert!(parse_int("128", IntWidth::W8).is_err());
        assert_eq!(parse_int("-32768", IntWidth::W16), Ok(-32768));
        assert!(parse_uint("-1", IntWidth::W64).is_err());
        assert!(parse_uint("4294967296", IntWidth::W32).is_err());
        assert!(parse_int("0x10", IntWidth::W64).is_err());
    }

    #[test]
    fn float_saturates_only_for_wide_kind() {
        assert_eq!(parse_float("1e309", FloatWidth::F64), Ok(f64::INFINITY));
        assert_eq!(parse_float("-1e309", FloatWidth::F64), Ok(f64::NEG_INFINITY));
        assert_eq!(parse_float("1e39", FloatWidth::F32), Err(FloatError::Range));
        assert_eq!(parse_float("inf", FloatWidth::F32), Ok(f64::INFINITY));
        assert!(parse_float("x", FloatWidth::F64).is_err());
    }
}
