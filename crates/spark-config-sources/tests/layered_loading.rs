//! 多来源分层加载。
//!
//! # 覆盖范围（What）
//! - 字典 → 环境变量 → 命令行 三层在两种合并模式下的优先级；
//! - `FillMissing` 重复执行不改变结果；
//! - 来源失败以 `SourceFailed { index, name }` 归属，后续来源照常执行。

use proptest::prelude::*;
use spark_config_core::{ErrorKind, LoadError, LoadMode, Loader, Record, Value};
use spark_config_sources::{DictSource, EnvSource, FlagsSource};
use tracing_subscriber::EnvFilter;
use tracing_test::traced_test;

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Cache {
    #[config(key = "capacity")]
    pub capacity: u32,
    #[config(key = "ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Gateway {
    #[config(key = "name", default = "edge")]
    pub name: String,
    #[config(key = "port")]
    pub port: u16,
    #[config(key = "upstreams")]
    pub upstreams: Vec<String>,
    pub cache: Cache,
}

fn defaults() -> DictSource {
    DictSource::from_value(Value::map([
        ("name", Value::from("from-dict")),
        ("port", Value::Uint(80)),
        ("cache", Value::map([("capacity", Value::Uint(128))])),
    ]))
}

fn environment(vars: &[(&str, &str)]) -> EnvSource {
    EnvSource::new("gw", "").with_vars(vars.iter().copied())
}

fn loader(mode: LoadMode) -> Loader {
    Loader::builder()
        .mode(mode)
        .source(defaults())
        .source(environment(&[("GW_PORT", "8080"), ("GW_CACHE_TTL_SECS", "30")]))
        .source(FlagsSource::from_args(["--upstreams", "a,b", "--port", "9090"]))
        .build()
}

#[test]
fn override_lets_later_layers_win() {
    let mut gateway = Gateway::default();
    loader(LoadMode::Override).load(&mut gateway).expect("三层均合法");

    // 环境变量层对无值字段套用默认值，覆盖了字典层的 name。
    assert_eq!(gateway.name, "edge");
    assert_eq!(gateway.port, 9090);
    assert_eq!(gateway.upstreams, ["a", "b"]);
    assert_eq!(gateway.cache.capacity, 128);
    assert_eq!(gateway.cache.ttl_secs, 30);
}

#[test]
fn fill_missing_lets_earlier_layers_win() {
    let mut gateway = Gateway::default();
    loader(LoadMode::FillMissing).load(&mut gateway).expect("三层均合法");

    assert_eq!(gateway.name, "from-dict");
    assert_eq!(gateway.port, 80);
    assert_eq!(gateway.upstreams, ["a", "b"]);
    assert_eq!(gateway.cache.capacity, 128);
    assert_eq!(gateway.cache.ttl_secs, 30);
}

#[test]
fn layered_load_under_a_filtered_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("spark_config_core=trace,spark_config_sources=debug"))
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let mut gateway = Gateway::default();
        loader(LoadMode::Override).load(&mut gateway).expect("三层均合法");
        assert_eq!(gateway.port, 9090);
        assert_eq!(gateway.cache.ttl_secs, 30);
    });
}

#[test]
fn default_mode_is_override() {
    let loader = Loader::builder().source(defaults()).build();
    assert_eq!(loader.mode(), LoadMode::Override);
    assert_eq!(loader.len(), 1);
}

#[test]
#[traced_test]
fn failing_layer_is_attributed_and_later_layers_still_run() {
    let loader = Loader::builder()
        .source(defaults())
        .source(environment(&[("GW_PORT", "http")]))
        .source(FlagsSource::from_args(["--cache-capacity", "7"]))
        .build();
    let mut gateway = Gateway::default();
    let err = loader.load(&mut gateway).expect_err("端口非法");

    let LoadError::Aggregated(aggregated) = &err else {
        panic!("应为聚合错误：{err}");
    };
    assert_eq!(aggregated.len(), 1);
    let LoadError::SourceFailed { index, name, .. } = &aggregated.failures()[0] else {
        panic!("应为来源失败：{err}");
    };
    assert_eq!(*index, 1);
    assert_eq!(name, "spark_config_sources::env::EnvSource");
    assert!(err.contains(ErrorKind::ParseFailed));
    assert_eq!(err.field_failures()[0].key(), Some("GW_PORT"));

    assert_eq!(gateway.port, 80, "失败的字段保持上一层的值");
    assert_eq!(gateway.cache.capacity, 128, "flags 只按 key 属性匹配，不拼接嵌套段");
    assert!(logs_contain("source failed"));
}

#[test]
fn invalid_target_surfaces_through_every_layer() {
    let mut scalar = 0_u32;
    let err = loader(LoadMode::Override).load(&mut scalar).expect_err("标量不是记录");
    let LoadError::Aggregated(aggregated) = &err else {
        panic!("应为聚合错误：{err}");
    };
    assert_eq!(aggregated.len(), 3);
    assert!(err.contains(ErrorKind::InvalidTarget));
    assert_eq!(scalar, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// 任意环境变量组合下，`FillMissing` 第二次执行都不改变结果。
    #[test]
    fn fill_missing_is_idempotent(
        port in proptest::option::of(any::<u16>()),
        capacity in proptest::option::of(any::<u32>()),
        name in proptest::option::of("[a-z]{0,8}"),
        preset_port in any::<u16>(),
    ) {
        let mut vars = Vec::new();
        if let Some(port) = port {
            vars.push(("GW_PORT".to_owned(), port.to_string()));
        }
        if let Some(capacity) = capacity {
            vars.push(("GW_CACHE_CAPACITY".to_owned(), capacity.to_string()));
        }
        if let Some(name) = name {
            vars.push(("GW_NAME".to_owned(), name));
        }
        let loader = Loader::builder()
            .mode(LoadMode::FillMissing)
            .source(EnvSource::new("gw", "").with_vars(vars))
            .source(defaults())
            .build();

        let mut gateway = Gateway { port: preset_port, ..Gateway::default() };
        loader.load(&mut gateway).expect("生成的值均合法");
        let first = gateway.clone();
        loader.load(&mut gateway).expect("生成的值均合法");
        prop_assert_eq!(&first, &gateway);
        if preset_port != 0 {
            prop_assert_eq!(gateway.port, preset_port);
        }
    }
}
