//! 命令行参数来源。
//!
//! # 逻辑解析（How）
//! - [`parse_arguments`] 把参数向量解析为“名称 → 值”表：
//!   - `--name=value`、`--name value`（下一个参数不以 `-` 开头时）；
//!   - `--no-name` 与 `--no-name=...` 记为 `"false"`；
//!   - 单独的 `--name` / `-x` 记为空串，单独的 `--` 与位置参数被忽略；
//!   - `-x=value`、`-x value` 与长选项同理，但不识别 `no-` 前缀；
//! - 只有声明了 `key` 属性的叶子参与填充，`key` 即长名；长名缺席时回退到 `short` 属性；
//! - 嵌套记录不引入前缀，全部字段共享同一个名称空间。
//!
//! # 契约说明（What）
//! - 出现但值为空的参数：布尔字段视为 `"true"`，其他字段报告 `EmptyValue` 解析失败；
//! - 失败消息形如 `flags port=x field port: ...`，键为实际命中的长名或短名。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use spark_config_core::{
    CastError, CastRegistry, EmptyValue, Field, FieldDescriptor, FieldProvider, Input, LoadError,
    LoadMode, Lookup, Nested, Source, Traversal, TypeInfo, ensure_target_record,
};

use crate::naming::{normalize_delimited, resolve_delimiter};

/// 把参数向量解析为名称到值的映射；同名参数后出现者生效。
pub fn parse_arguments<S: AsRef<str>>(args: &[S]) -> HashMap<String, String> {
    let mut parsed = HashMap::new();
    let mut index = 0;
    while index < args.len() {
        let token = args[index].as_ref();
        index += 1;
        let (name, long) = if let Some(name) = token.strip_prefix("--") {
            (name, true)
        } else if let Some(name) = token.strip_prefix('-') {
            (name, false)
        } else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        if let Some((key, value)) = name.split_once('=') {
            match key.strip_prefix("no-") {
                Some(negated) if long => parsed.insert(negated.to_owned(), "false".to_owned()),
                _ => parsed.insert(key.to_owned(), value.to_owned()),
            };
            continue;
        }
        if long && let Some(negated) = name.strip_prefix("no-") {
            parsed.insert(negated.to_owned(), "false".to_owned());
            continue;
        }
        let next: Option<&str> = args.get(index).map(AsRef::as_ref);
        match next {
            Some(next) if !next.starts_with('-') => {
                parsed.insert(name.to_owned(), next.to_owned());
                index += 1;
            }
            _ => {
                parsed.insert(name.to_owned(), String::new());
            }
        }
    }
    parsed
}

/// 从命令行参数填充记录的来源。
#[derive(Clone)]
pub struct FlagsSource {
    args: Option<Arc<[String]>>,
    delimiter: String,
    registry: Arc<CastRegistry>,
}

impl FlagsSource {
    /// 在 `load` 时读取进程参数（跳过程序名）。
    pub fn new() -> Self {
        Self {
            args: None,
            delimiter: ",".to_owned(),
            registry: CastRegistry::shared(),
        }
    }

    /// 以固定的参数向量代替进程参数；不含程序名。
    pub fn from_args<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// 序列字段的默认分隔符；空串保持 `,`。
    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        if !delimiter.is_empty() {
            self.delimiter = delimiter.to_owned();
        }
        self
    }

    pub fn with_registry(mut self, registry: Arc<CastRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn parsed(&self) -> HashMap<String, String> {
        match &self.args {
            Some(args) => parse_arguments(&args[..]),
            None => {
                let args: Vec<String> = std::env::args().skip(1).collect();
                parse_arguments(&args)
            }
        }
    }
}

impl Default for FlagsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlagsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagsSource")
            .field("args", &self.args)
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

impl Source for FlagsSource {
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        let record = ensure_target_record(target)?;
        let parsed = self.parsed();
        tracing::debug!(flags = parsed.len(), "command line parsed");
        let provider = FlagsProvider {
            parsed: &parsed,
            delimiter: &self.delimiter,
        };
        Traversal::new(&self.registry, mode).run(record, &provider)
    }
}

struct FlagsProvider<'a> {
    parsed: &'a HashMap<String, String>,
    delimiter: &'a str,
}

impl FieldProvider for FlagsProvider<'_> {
    type Scope<'s>
        = ()
    where
        Self: 's;

    fn origin(&self) -> &'static str {
        "flags"
    }

    fn root(&self) {}

    fn nested<'s>(&'s self, _scope: &(), _field: &FieldDescriptor) -> Nested<()> {
        Nested::Enter(())
    }

    fn lookup<'s>(&'s self, _scope: &(), field: &FieldDescriptor, _target: &TypeInfo) -> Lookup {
        let Some(long) = field.attrs.key.filter(|long| !long.is_empty()) else {
            return Lookup::new(field.name);
        };
        let hit = self
            .parsed
            .get(long)
            .map(|value| (long.to_owned(), value))
            .or_else(|| {
                let short = field.attrs.short.filter(|short| !short.is_empty())?;
                self.parsed.get(short).map(|value| (short.to_owned(), value))
            });
        match hit {
            Some((key, value)) => Lookup::new(key)
                .with_value(Input::Text(value.clone()))
                .with_default(field.default_value()),
            None => Lookup::new(long).with_default(field.default_value()),
        }
    }

    fn prepare(&self, field: &FieldDescriptor, input: Input, target: &TypeInfo) -> Result<Input, CastError> {
        let Input::Text(text) = input else {
            return Ok(input);
        };
        if text.is_empty() {
            if target.is_boolean() {
                return Ok(Input::Text("true".to_owned()));
            }
            let reported = target.pointee().unwrap_or(*target);
            return Err(CastError::parse_failed(&reported, text, EmptyValue));
        }
        let delimited = target.is_sequence() || target.pointee().is_some_and(|inner| inner.is_sequence());
        if delimited {
            let delimiter = resolve_delimiter(field.attrs.delimiter, self.delimiter);
            return Ok(Input::Text(normalize_delimited(&text, delimiter)));
        }
        Ok(Input::Text(text))
    }

    fn keyed_failures(&self) -> bool {
        true
    }
}
