//! 转换注册表性质验证
//!
//! # 教案级注释概览
//!
//! - **核心目标 (Why)**：把“字符串 → 类型化值”的契约固化为性质：
//!   1. 任意整数/浮点/布尔的文本表示经注册表转换后再写入槽位，得到与原值相等的结果；
//!   2. 首尾空白不影响数值与布尔的解析；
//!   3. 同一类型无论被请求多少次，只解析一次变体。
//! - **设计手法 (How)**：使用 Proptest 生成值，渲染为文本后走 `assign_from_string`，避免只验证注册表内部形态。
//!
//! # 合同与边界 (What)
//!
//! - 浮点仅覆盖有限值；`NaN` 不满足相等性，由单元测试另行覆盖；
//! - 复数样例固定为代表性写法，不做随机生成。

use std::any::TypeId;

use spark_config_core::{
    CastRegistry, Complex, Describe, ErrorKind, Value, assign_from_string,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_signed_integers_round_trip(value in any::<i64>(), pad in "[ \t]{0,3}") {
        let registry = CastRegistry::new();
        let mut slot = 0_i64;
        let raw = format!("{pad}{value}{pad}");
        assign_from_string(&registry, &mut slot, &raw).expect("合法整数应写入");
        prop_assert_eq!(slot, value);
    }

    #[test]
    fn prop_narrow_unsigned_round_trip(value in any::<u16>()) {
        let registry = CastRegistry::new();
        let mut slot = 0_u16;
        assign_from_string(&registry, &mut slot, &value.to_string()).expect("合法整数应写入");
        prop_assert_eq!(slot, value);
    }

    #[test]
    fn prop_out_of_range_is_parse_failure(value in (i64::from(i8::MAX) + 1)..i64::MAX) {
        let registry = CastRegistry::new();
        let mut slot = 5_i8;
        let err = assign_from_string(&registry, &mut slot, &value.to_string())
            .expect_err("越界应失败");
        prop_assert_eq!(err.kind(), ErrorKind::ParseFailed);
        prop_assert_eq!(slot, 5);
    }

    #[test]
    fn prop_finite_floats_round_trip(value in any::<f64>().prop_filter("有限值", |v| v.is_finite())) {
        let registry = CastRegistry::new();
        let mut slot = 0.0_f64;
        assign_from_string(&registry, &mut slot, &value.to_string()).expect("有限浮点应写入");
        prop_assert_eq!(slot.to_bits(), value.to_bits());
    }

    #[test]
    fn prop_bool_tokens_ignore_case(flag in any::<bool>(), upper in any::<bool>()) {
        let registry = CastRegistry::new();
        let mut slot = !flag;
        let token = if upper { flag.to_string().to_uppercase() } else { flag.to_string() };
        assign_from_string(&registry, &mut slot, &format!(" {token} ")).expect("布尔词应写入");
        prop_assert_eq!(slot, flag);
    }

    #[test]
    fn prop_resolution_happens_once(requests in 1_usize..16) {
        let registry = CastRegistry::new();
        for _ in 0..requests {
            registry.cast("1", &u32::describe()).expect("u32 可解析");
        }
        prop_assert_eq!(registry.cached_len(), 1);
    }
}

#[test]
fn complex_samples() {
    let registry = CastRegistry::new();
    let mut slot = Complex::<f64>::default();
    assign_from_string(&registry, &mut slot, "1+2i").expect("标准写法");
    assert_eq!(slot, Complex::new(1.0, 2.0));

    let mut narrow = Complex::<f32>::default();
    assign_from_string(&registry, &mut narrow, "(-0.5-3i)").expect("带括号写法");
    assert_eq!(narrow, Complex::new(-0.5, -3.0));

    let err = assign_from_string(&registry, &mut slot, "").expect_err("空串应失败");
    assert!(err.is_empty_value());
    assert_eq!(slot, Complex::new(1.0, 2.0));
}

#[test]
fn string_is_trimmed_but_bytes_are_verbatim() {
    let registry = CastRegistry::new();
    let mut text = String::new();
    assign_from_string(&registry, &mut text, "  hello ").expect("字符串");
    assert_eq!(text, "hello");

    let mut bytes = Vec::<u8>::new();
    assign_from_string(&registry, &mut bytes, " ab ").expect("字节序列");
    assert_eq!(bytes, b" ab ".to_vec());

    assert_eq!(
        registry.cast("x", &<[u8; 3]>::describe()).expect("定长缓冲"),
        Value::Bytes(vec![b'x', 0, 0])
    );
}

#[test]
fn registry_rejects_unknown_tokens_with_the_raw_input() {
    let registry = CastRegistry::new();

    let err = registry.cast("yes", &bool::describe()).expect_err("yes 不是布尔词");
    assert_eq!(err.kind(), ErrorKind::ParseFailed);
    assert_eq!(err.raw(), Some("yes"));

    let err = registry.cast("x", &f64::describe()).expect_err("x 不是浮点");
    assert_eq!(err.kind(), ErrorKind::ParseFailed);
    assert_eq!(err.raw(), Some("x"));
}

#[test]
fn registry_trims_and_splits_scalar_text() {
    let registry = CastRegistry::new();
    assert_eq!(
        registry.cast("  false  ", &bool::describe()).expect("布尔词"),
        Value::Bool(false)
    );
    assert_eq!(
        registry.cast("1e2+3.5i", &<Complex<f64>>::describe()).expect("指数实部"),
        Value::Complex(Complex::new(100.0, 3.5))
    );

    let sequence = <Vec<u16>>::describe();
    let element = sequence.element().expect("序列带元素类型");
    assert_eq!(element.id(), TypeId::of::<u16>());
    assert!(u16::describe().element().is_none());
    assert_eq!(
        registry.cast(" 1, 2 ", &sequence).expect("逗号分隔"),
        Value::List(vec![Value::Uint(1), Value::Uint(2)])
    );
}
