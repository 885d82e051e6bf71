//! JSON 文档来源测试。
//!
//! 文件型用例把文档写入系统临时目录下的独立文件，测试结束时删除。

#![cfg(feature = "json")]

use std::fs;
use std::path::PathBuf;

use spark_config_core::{ErrorKind, LoadError, LoadMode, Record, Source, codes};
use spark_config_sources::{JsonSource, RootNotObject};

#[derive(Debug, Default, Record)]
struct Storage {
    #[config(key = "path")]
    pub path: String,
    #[config(key = "quota_mb")]
    pub quota_mb: u64,
}

#[derive(Debug, Default, Record)]
struct Node {
    #[config(key = "id")]
    pub id: String,
    #[config(key = "weight")]
    pub weight: f32,
    #[config(key = "peers")]
    pub peers: Vec<String>,
    #[config(key = "labels")]
    pub labels: Option<Vec<String>>,
    pub note: String,
    #[config(key = "listen")]
    pub listen_addr: String,
    pub storage: Storage,
    pub backup: Option<Storage>,
}

struct TempDocument(PathBuf);

impl TempDocument {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "spark-config-{}-{name}.json",
            std::process::id()
        ));
        fs::write(&path, contents).expect("临时文件可写");
        Self(path)
    }
}

impl Drop for TempDocument {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

#[test]
fn file_document_populates_nested_records() {
    let document = TempDocument::new(
        "nested",
        r#"{
            "id": "node-1",
            "weight": 0.75,
            "peers": ["node-2", "node-3"],
            "listen": "0.0.0.0:7000",
            "storage": { "path": "/var/lib/node", "quota_mb": 512 },
            "note": "untagged",
            "unknown": true
        }"#,
    );
    let mut node = Node::default();
    JsonSource::from_path(&document.0)
        .load(&mut node, LoadMode::Override)
        .expect("文档合法");

    assert_eq!(node.id, "node-1");
    assert_eq!(node.weight, 0.75);
    assert_eq!(node.peers, ["node-2", "node-3"]);
    assert_eq!(node.listen_addr, "0.0.0.0:7000");
    assert_eq!(node.storage.path, "/var/lib/node");
    assert_eq!(node.storage.quota_mb, 512);
    assert!(node.backup.is_some(), "可选子记录总是被分配");
    assert_eq!(node.labels, None);
    assert!(node.note.is_empty(), "未声明 key 的叶子不参与");
}

#[test]
fn null_members_clear_nilable_fields_and_reject_others() {
    let mut node = Node {
        id: "kept".to_owned(),
        labels: Some(vec!["a".to_owned()]),
        ..Node::default()
    };
    let err = JsonSource::from_text(r#"{ "id": null, "labels": null }"#)
        .load(&mut node, LoadMode::Override)
        .expect_err("字符串不可置空");
    let failures = err.field_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path(), "id");
    assert_eq!(failures[0].kind(), ErrorKind::UnsupportedType);
    assert_eq!(node.id, "kept");
    assert_eq!(node.labels, None);
}

#[test]
fn string_members_are_cast() {
    let mut node = Node::default();
    JsonSource::from_value(serde_json::json!({ "weight": "1.5", "storage": { "quota_mb": " 64 " } }))
        .load(&mut node, LoadMode::Override)
        .expect("字符串可转换");
    assert_eq!(node.weight, 1.5);
    assert_eq!(node.storage.quota_mb, 64);
}

#[test]
fn type_mismatches_are_aggregated() {
    let mut node = Node::default();
    let err = JsonSource::from_text(r#"{ "weight": true, "storage": { "quota_mb": -5 } }"#)
        .load(&mut node, LoadMode::Override)
        .expect_err("两处类型不符");
    let paths: Vec<_> = err.field_failures().iter().map(|failure| failure.path().to_owned()).collect();
    assert_eq!(paths, ["weight", "storage.quota_mb"]);
    assert!(err.contains(ErrorKind::UnsupportedType));
    assert!(err.contains(ErrorKind::ParseFailed));
    assert!(err.field_failures().iter().all(|failure| failure.origin() == "json"));
}

#[test]
fn unreadable_or_malformed_documents_leave_target_untouched() {
    let mut node = Node {
        id: "kept".to_owned(),
        ..Node::default()
    };

    let missing = std::env::temp_dir().join("spark-config-definitely-missing.json");
    let err = JsonSource::from_path(&missing)
        .load(&mut node, LoadMode::Override)
        .expect_err("文件不存在");
    assert_eq!(err.code(), codes::DOCUMENT_UNAVAILABLE);

    let err = JsonSource::from_text("[]")
        .load(&mut node, LoadMode::Override)
        .expect_err("根节点不是对象");
    let LoadError::Document { cause, .. } = &err else {
        panic!("应为文档错误：{err}");
    };
    assert_eq!(
        cause.downcast_ref::<RootNotObject>(),
        Some(&RootNotObject { found: "list" })
    );
    assert_eq!(node.id, "kept");
    assert!(node.backup.is_none());
}

#[test]
fn fill_missing_keeps_values_from_earlier_layers() {
    let mut node = Node {
        id: "from-env".to_owned(),
        ..Node::default()
    };
    JsonSource::from_text(r#"{ "id": "from-file", "weight": 2 }"#)
        .load(&mut node, LoadMode::FillMissing)
        .expect("合法");
    assert_eq!(node.id, "from-env");
    assert_eq!(node.weight, 2.0);
}
