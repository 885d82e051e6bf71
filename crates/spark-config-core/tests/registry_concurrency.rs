//! 注册表缓存的并发契约。
//!
//! # 设计目的（Why）
//! - 注册表通常以 `Arc` 在多个加载线程间共享：读路径无锁，写路径互斥；
//! - 无论多少线程同时请求同一批类型，每个类型最终只占一个缓存条目，且所有线程得到相同的变体。
//!
//! # 观测方式（How）
//! - 以 `std::thread::scope` 并发解析；
//! - 通过 `tracing-subscriber` 的 fmt 层 + `EnvFilter` 打开 `trace` 级别，使首次解析事件进入测试输出，便于排查。

use std::sync::Arc;
use std::thread;

use spark_config_core::{CastRegistry, CastVariant, Describe, TypeInfo, Value};
use tracing_subscriber::EnvFilter;

fn targets() -> Vec<TypeInfo> {
    vec![
        u8::describe(),
        i64::describe(),
        f32::describe(),
        bool::describe(),
        String::describe(),
        <Vec<u16>>::describe(),
        <Option<u32>>::describe(),
    ]
}

#[test]
fn concurrent_resolution_fills_each_entry_once() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("spark_config_core=trace"))
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let registry = Arc::new(CastRegistry::new());
        let resolved: Vec<Vec<Option<CastVariant>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    scope.spawn(move || {
                        targets()
                            .iter()
                            .map(|target| registry.resolve(target).cloned())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("解析线程不应 panic"))
                .collect()
        });

        for per_thread in &resolved[1..] {
            assert_eq!(per_thread, &resolved[0]);
        }
        // 可选形状没有直接对应的变体，不进入缓存。
        assert!(resolved[0].last().is_some_and(Option::is_none));
        assert_eq!(registry.cached_len(), targets().len() - 1);
    });
}

#[test]
fn shared_registry_casts_from_many_threads() {
    let registry = CastRegistry::shared();
    thread::scope(|scope| {
        for worker in 0_u64..4 {
            let registry = Arc::clone(&registry);
            scope.spawn(move || {
                let cast = registry
                    .cast(&worker.to_string(), &u64::describe())
                    .expect("整数可解析");
                assert_eq!(cast, Value::Uint(worker));
            });
        }
    });
    assert!(Arc::ptr_eq(&registry, &CastRegistry::shared()));
}
