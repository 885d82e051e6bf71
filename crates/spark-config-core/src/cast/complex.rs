//! 复数文本解析。
//!
//! # 逻辑解析（How）
//! 1. 空串直接报 [`EmptyValue`]；
//! 2. 剥离可选的一对外层括号；
//! 3. 不含 `i`/`I` 标记时按纯实数解析；
//! 4. 去掉虚部标记后，从末尾向前（不含首字符）寻找前一个字符不是 `e`/`E` 的 `+`/`-`，
//!    以此切分实部与虚部，因此 `1e2+3.5i` 切在 `3.5i` 之前而非 `1e2` 内部；
//! 5. 找不到切分点时整体视为虚部，实部为 0。

use crate::cast::numeric::parse_float;
use crate::error::{EmptyValue, ErrorCause};
use crate::types::FloatWidth;
use crate::value::Complex;

pub(crate) fn parse_complex(text: &str, width: FloatWidth) -> Result<Complex<f64>, ErrorCause> {
    if text.is_empty() {
        return Err(EmptyValue.into());
    }
    let mut body = text;
    if body.len() >= 2 && body.starts_with('(') && body.ends_with(')') {
        body = &body[1..body.len() - 1];
    }

    if !body.contains(['i', 'I']) {
        let re = parse_float(body, width)?;
        return Ok(Complex::new(re, 0.0));
    }

    let imaginary_end = if body.ends_with(['i', 'I']) {
        body.len() - 1
    } else {
        body.rfind(['i', 'I']).unwrap_or(body.len())
    };
    let body = &body[..imaginary_end];

    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&index| matches!(bytes[index], b'+' | b'-') && !matches!(bytes[index - 1], b'e' | b'E'));

    let (re_text, im_text) = match split {
        Some(index) => (&body[..index], &body[index..]),
        None => ("0", body),
    };
    let re = parse_float(re_text.trim(), width)?;
    let im = parse_float(im_text.trim(), width)?;
    Ok(Complex::new(re, im))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Complex<f64> {
        parse_complex(text, FloatWidth::F64).expect("应当解析成功")
    }

    #[test]
    fn splits_on_trailing_non_exponent_sign() {
        assert_eq!(parse("1+2i"), Complex::new(1.0, 2.0));
        assert_eq!(parse("1e2+3.5i"), Complex::new(100.0, 3.5));
        assert_eq!(parse("(1.5-2I)"), Complex::new(1.5, -2.0));
        assert_eq!(parse("-1e-2-1e+2i"), Complex::new(-0.01, -100.0));
    }

    #[test]
    fn real_only_and_imaginary_only_forms() {
        assert_eq!(parse("4.25"), Complex::new(4.25, 0.0));
        assert_eq!(parse("3i"), Complex::new(0.0, 3.0));
        assert_eq!(parse("-3i"), Complex::new(0.0, -3.0));
    }

    #[test]
    fn empty_input_is_dedicated_failure() {
        let err = parse_complex("", FloatWidth::F64).expect_err("空串应失败");
        assert!(err.is::<EmptyValue>());
        assert!(parse_complex("1+i", FloatWidth::F64).is_err());
    }
}
