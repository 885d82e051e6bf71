//! 转换注册表：有序变体列表 + 类型到变体的记忆化缓存。
//!
//! # 设计目的（Why）
//! - 同一个注册表可能被多个并发的加载调用共享，解析结果只依赖类型本身，
//!   因此每种类型只需解析一次，此后的查找都应是无阻塞读；
//! - 变体列表在构造后不可变，缓存只增不删（记忆化，永不淘汰）。
//!
//! # 逻辑解析（How）
//! - 读路径：`ArcSwap::load` 取当前快照，命中即返回，不加锁；
//! - 写路径：首次解析某类型时，在写锁内复查快照、克隆并插入新条目，再原子替换快照；
//!   并发的首次解析会串行化，后到者在复查时直接命中；
//! - 不受支持的类型不写入缓存，每次都会重新扫描（通常只在出错路径上发生）。
//!
//! # 设计取舍（Trade-offs）
//! - 写时复制的代价与已缓存类型数量成正比；配置类型的种类有限，写入只发生在预热阶段。

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::cast::variant::{CastStrategy, CastVariant};
use crate::error::CastError;
use crate::types::{Shape, TypeInfo};
use crate::value::Value;

/// 有序的转换变体集合与其解析缓存。
pub struct CastRegistry {
    variants: Vec<CastVariant>,
    resolved: ArcSwap<HashMap<TypeId, usize>>,
    writer: Mutex<()>,
}

impl CastRegistry {
    /// 只含内建变体的注册表。
    pub fn new() -> Self {
        Self::with_variants(CastVariant::BUILTIN.to_vec())
    }

    /// 以构建器追加自定义策略。
    pub fn builder() -> CastRegistryBuilder {
        CastRegistryBuilder::default()
    }

    /// 进程级共享的默认注册表，首次调用时构造。
    pub fn shared() -> Arc<CastRegistry> {
        static SHARED: OnceLock<Arc<CastRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(CastRegistry::new())))
    }

    fn with_variants(variants: Vec<CastVariant>) -> Self {
        Self {
            variants,
            resolved: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// 全部变体，按优先级排列。
    pub fn variants(&self) -> &[CastVariant] {
        &self.variants
    }

    /// 已缓存的类型数量。
    pub fn cached_len(&self) -> usize {
        self.resolved.load().len()
    }

    /// 为目标类型选出第一个支持它的变体。
    pub fn resolve(&self, target: &TypeInfo) -> Option<&CastVariant> {
        if let Some(&index) = self.resolved.load().get(&target.id()) {
            return self.variants.get(index);
        }

        let index = self
            .variants
            .iter()
            .position(|variant| variant.supports(target))?;

        let _guard = self.writer.lock();
        let current = self.resolved.load_full();
        if !current.contains_key(&target.id()) {
            let mut next = HashMap::clone(&current);
            next.insert(target.id(), index);
            self.resolved.store(Arc::new(next));
            tracing::trace!(
                target_type = target.name(),
                variant = self.variants[index].name(),
                index,
                "cast variant resolved"
            );
        }
        self.variants.get(index)
    }

    /// 把原始字符串转换为目标类型的值。
    ///
    /// # 契约说明（What）
    /// - 可选目标按内部类型解析并转换，结果以新分配的可选值包装；
    ///   若转换结果本身已是可选值（原地解码），则不再重复包装；
    /// - 没有变体支持目标类型时返回 [`CastError::UnsupportedType`]。
    pub fn cast(&self, raw: &str, target: &TypeInfo) -> Result<Value, CastError> {
        if let Shape::Optional(pointee) = target.shape() {
            let pointee = pointee();
            return Ok(match self.cast(raw, &pointee)? {
                already @ Value::Optional(_) => already,
                value => Value::Optional(Some(Box::new(value))),
            });
        }

        match self.resolve(target) {
            Some(variant) => variant.cast(self, raw, target),
            None => Err(CastError::unsupported(target)),
        }
    }
}

impl Default for CastRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CastRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastRegistry")
            .field("variants", &self.variants)
            .field("cached", &self.cached_len())
            .finish()
    }
}

/// [`CastRegistry`] 的构建器。
#[derive(Default)]
pub struct CastRegistryBuilder {
    custom: Vec<CastVariant>,
}

impl CastRegistryBuilder {
    /// 追加一个自定义策略，排在内建变体与之前追加的策略之后。
    pub fn strategy(mut self, strategy: impl CastStrategy + 'static) -> Self {
        self.custom.push(CastVariant::Custom(Arc::new(strategy)));
        self
    }

    pub fn build(self) -> CastRegistry {
        let mut variants = CastVariant::BUILTIN.to_vec();
        variants.extend(self.custom);
        CastRegistry::with_variants(variants)
    }
}
