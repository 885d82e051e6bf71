//! 来源契约与多来源编排。
//!
//! # 设计目的（Why）
//! - 每个来源只负责取得原始数据并驱动一次遍历；
//! - [`Loader`] 按顺序执行来源：`Override` 下后执行者优先，`FillMissing` 下先执行者优先，
//!   因此分层叠加时来源应按“低优先级在前”或“高优先级在前”排列。
//!
//! # 契约说明（What）
//! - 某个来源失败不会阻止后续来源执行；
//! - 失败被包装为 [`LoadError::SourceFailed`]（带下标与来源类型名），最终折叠为一个聚合错误；
//! - 目标校验失败同样按来源归属上报，目标保持原样。

use std::borrow::Cow;
use std::fmt;

use crate::error::LoadError;
use crate::policy::LoadMode;
use crate::record::Field;

/// 可填充目标记录的配置来源。
pub trait Source {
    /// 来源名，默认取实现类型的完整路径。
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// 以指定模式填充目标；目标必须是存在的记录。
    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }

    fn load(&self, target: &mut dyn Field, mode: LoadMode) -> Result<(), LoadError> {
        (**self).load(target, mode)
    }
}

/// 有序的来源列表。
pub struct Loader {
    sources: Vec<Box<dyn Source + Send + Sync>>,
    mode: LoadMode,
}

impl Loader {
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// 依次执行全部来源并聚合失败。
    pub fn load(&self, target: &mut dyn Field) -> Result<(), LoadError> {
        let mut failures = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            let name = source.name();
            match source.load(target, self.mode) {
                Ok(()) => tracing::debug!(index, source = %name, "source loaded"),
                Err(cause) => {
                    tracing::debug!(
                        index,
                        source = %name,
                        code = cause.code(),
                        "source failed"
                    );
                    failures.push(LoadError::SourceFailed {
                        index,
                        name,
                        cause: Box::new(cause),
                    });
                }
            }
        }
        LoadError::aggregate(failures)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.sources.iter().map(|source| source.name()).collect();
        f.debug_struct("Loader")
            .field("mode", &self.mode)
            .field("sources", &names)
            .finish()
    }
}

/// [`Loader`] 的构建器。
#[derive(Default)]
pub struct LoaderBuilder {
    sources: Vec<Box<dyn Source + Send + Sync>>,
    mode: Option<LoadMode>,
}

impl LoaderBuilder {
    /// 合并模式；未设置时为 `Override`。
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// 追加一个来源，执行顺序即追加顺序。
    pub fn source(mut self, source: impl Source + Send + Sync + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn build(self) -> Loader {
        Loader {
            sources: self.sources,
            mode: LoadMode::resolve(self.mode),
        }
    }
}
