//! 字典来源测试：键匹配顺序、嵌套映射、类型化值与非结构值的处理。

use std::collections::BTreeMap;

use spark_config_core::{ErrorKind, LoadMode, Record, Source, Value};
use spark_config_sources::DictSource;

#[derive(Debug, Default, Record)]
struct Retry {
    pub attempts: u8,
    pub backoff: f64,
}

#[derive(Debug, Default, Record)]
struct Client {
    pub base_url: String,
    pub max_idle: u32,
    pub headers: BTreeMap<String, String>,
    pub scopes: Vec<String>,
    pub retry: Option<Retry>,
    pub extra: Value,
    pub token: Option<String>,
}

fn dict(entries: Value) -> DictSource {
    DictSource::from_value(entries)
}

#[test]
fn keys_match_field_name_and_snake_forms() {
    let source = dict(Value::map([
        ("base_url", Value::from("https://api")),
        ("MAX_IDLE", Value::Int(4)),
        ("headers", Value::map([("accept", "json")])),
        ("scopes", Value::list(["read", "write"])),
        ("retry", Value::map([("attempts", Value::Uint(3)), ("backoff", Value::Float(0.5))])),
        ("extra", Value::list([1_i64, 2])),
        ("token", Value::from("s3cr3t")),
    ]));
    let mut client = Client::default();
    source.load(&mut client, LoadMode::Override).expect("全部值合法");

    assert_eq!(client.base_url, "https://api");
    assert_eq!(client.max_idle, 4);
    assert_eq!(client.headers["accept"], "json");
    assert_eq!(client.scopes, ["read", "write"]);
    let retry = client.retry.as_ref().expect("嵌套映射应分配可选子记录");
    assert_eq!(retry.attempts, 3);
    assert_eq!(retry.backoff, 0.5);
    assert_eq!(client.extra, Value::list([1_i64, 2]));
    assert_eq!(client.token.as_deref(), Some("s3cr3t"));
}

#[test]
fn strings_are_cast_through_the_registry() {
    let source = dict(Value::map([
        ("max_idle", " 12 "),
        ("scopes", "a, b"),
    ]));
    let mut client = Client::default();
    source.load(&mut client, LoadMode::Override).expect("字符串可转换");
    assert_eq!(client.max_idle, 12);
    assert_eq!(client.scopes, ["a", "b"]);
}

#[test]
fn map_offered_to_leaf_is_ignored() {
    let source = dict(Value::map([("max_idle", Value::map([("nested", 1_i64)]))]));
    let mut client = Client {
        max_idle: 9,
        ..Client::default()
    };
    source.load(&mut client, LoadMode::Override).expect("映射对叶子无效果");
    assert_eq!(client.max_idle, 9);
}

#[test]
fn null_clears_optional_record_but_scalar_value_is_unsupported() {
    let mut client = Client {
        retry: Some(Retry::default()),
        token: Some("old".to_owned()),
        ..Client::default()
    };
    dict(Value::map([("retry", Value::Null), ("token", Value::Null)]))
        .load(&mut client, LoadMode::Override)
        .expect("Null 清空可空字段");
    assert!(client.retry.is_none());
    assert!(client.token.is_none());

    let err = dict(Value::map([("retry", Value::Int(1)), ("max_idle", Value::Int(-1))]))
        .load(&mut client, LoadMode::Override)
        .expect_err("两处非法");
    let failures = err.field_failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].path(), "max_idle");
    assert_eq!(failures[0].kind(), ErrorKind::ParseFailed);
    assert_eq!(failures[1].path(), "retry");
    assert_eq!(failures[1].kind(), ErrorKind::UnsupportedType);
    assert_eq!(failures[1].to_string(), "dict field retry: unsupported type dict_source::Retry");
}

#[test]
fn fill_missing_only_touches_zero_fields() {
    let mut client = Client {
        base_url: "https://kept".to_owned(),
        ..Client::default()
    };
    dict(Value::map([("base_url", "https://new"), ("max_idle", "2")]))
        .load(&mut client, LoadMode::FillMissing)
        .expect("合法");
    assert_eq!(client.base_url, "https://kept");
    assert_eq!(client.max_idle, 2);
}
