//! 多来源编排契约测试。
//!
//! # 覆盖范围（What）
//! - `Override` 下后执行的来源优先，`FillMissing` 下先执行的来源优先；
//! - 某个来源失败不阻止后续来源，失败以 `SourceFailed { index, name }` 归属后聚合；
//! - 编排过程输出 `tracing` 事件，便于排查哪个来源失败。

use spark_config_core::{
    CastRegistry, Field, FieldDescriptor, FieldProvider, Input, LoadError, LoadMode, Loader,
    Lookup, Nested, Record, Source, Traversal, TypeInfo, codes, ensure_target_record,
};
use tracing_test::traced_test;

#[derive(Debug, Default, Record)]
struct Settings {
    pub region: String,
    pub replicas: u32,
}

/// 按字段名提供文本的扁平来源。
struct Fixed(&'static [(&'static str, &'static str)]);

impl FieldProvider for Fixed {
    type Scope<'s>
        = ()
    where
        Self: 's;

    fn origin(&self) -> &'static str {
        "fixed"
    }

    fn root(&self) {}

    fn nested<'s>(&'s self, _scope: &(), _field: &FieldDescriptor) -> Nested<()> {
        Nested::Skip
    }

    fn lookup<'s>(&'s self, _scope: &(), field: &FieldDescriptor, _target: &TypeInfo) -> Lookup {
        let lookup = Lookup::new(field.name);
        match self.0.iter().find(|(name, _)| *name == field.name) {
            Some((_, raw)) => lookup.with_value(Input::Text((*raw).to_owned())),
            None => lookup,
        }
    }
}

impl Source for Fixed {
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        let record = ensure_target_record(target)?;
        Traversal::new(&CastRegistry::shared(), mode).run(record, self)
    }
}

struct Broken;

impl Source for Broken {
    fn load(&self, _target: &mut dyn Field, _mode: LoadMode) -> Result<(), LoadError> {
        Err(LoadError::document("broken", "backing store unavailable"))
    }
}

fn layered(mode: LoadMode) -> Loader {
    Loader::builder()
        .mode(mode)
        .source(Fixed(&[("region", "eu-west"), ("replicas", "2")]))
        .source(Fixed(&[("region", "us-east")]))
        .build()
}

#[test]
fn override_lets_later_sources_win() {
    let mut settings = Settings::default();
    layered(LoadMode::Override).load(&mut settings).expect("两个来源均合法");
    assert_eq!(settings.region, "us-east");
    assert_eq!(settings.replicas, 2);
}

#[test]
fn fill_missing_lets_earlier_sources_win() {
    let mut settings = Settings::default();
    layered(LoadMode::FillMissing).load(&mut settings).expect("两个来源均合法");
    assert_eq!(settings.region, "eu-west");
    assert_eq!(settings.replicas, 2);
}

#[test]
fn default_mode_is_override() {
    let loader = Loader::builder().build();
    assert_eq!(loader.mode(), LoadMode::Override);
    assert!(loader.is_empty());
    let mut settings = Settings::default();
    loader.load(&mut settings).expect("空编排器直接成功");
}

#[test]
#[traced_test]
fn failing_source_is_attributed_and_does_not_stop_the_rest() {
    let loader = Loader::builder()
        .source(Fixed(&[("replicas", "3")]))
        .source(Broken)
        .source(Fixed(&[("region", "ap-south"), ("replicas", "many")]))
        .build();
    assert_eq!(loader.len(), 3);

    let mut settings = Settings::default();
    let err = loader.load(&mut settings).expect_err("两个来源失败");
    assert_eq!(settings.region, "ap-south");
    assert_eq!(settings.replicas, 3);

    let LoadError::Aggregated(aggregated) = &err else {
        panic!("应为聚合错误：{err}");
    };
    assert_eq!(aggregated.len(), 2);
    let attributions: Vec<_> = aggregated
        .failures()
        .iter()
        .map(|failure| match failure {
            LoadError::SourceFailed { index, name, .. } => (*index, name.to_string()),
            other => panic!("应为来源失败：{other}"),
        })
        .collect();
    assert_eq!(attributions[0].0, 1);
    assert!(attributions[0].1.ends_with("Broken"), "{}", attributions[0].1);
    assert_eq!(attributions[1].0, 2);
    assert!(attributions[1].1.ends_with("Fixed"), "{}", attributions[1].1);

    assert_eq!(aggregated.failures()[0].code(), codes::SOURCE_FAILED);
    assert_eq!(err.field_failures().len(), 1);
    assert_eq!(err.field_failures()[0].path(), "replicas");
    assert!(
        err.to_string()
            .contains("source at index 1 named loader_contract::Broken failed: broken document unavailable"),
        "{err}"
    );

    assert!(logs_contain("source loaded"));
    assert!(logs_contain("source failed"));
    assert!(logs_contain("config.document.unavailable"));
}

#[test]
fn load_mode_deserializes_from_kebab_case() {
    let mode: LoadMode = serde_json::from_str("\"fill-missing\"").expect("合法模式名");
    assert_eq!(mode, LoadMode::FillMissing);
    assert!(serde_json::from_str::<LoadMode>("\"merge\"").is_err());
}
