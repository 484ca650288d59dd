/// Benchmarks for the role resolver
///
/// Measures performance of:
/// - Fresh resolution by group count
/// - Cached resolution
/// - Permission aggregation
/// - Concurrent access

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rolegate::{
    aggregate_permissions, Catalog, IdentityRecord, MappingConfig, PrincipalId, ResolveOptions,
    ResolverConfig, RoleResolver,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn group_dn(i: usize) -> String {
    format!("cn=group-{},ou=groups,dc=example,dc=com", i)
}

fn setup_resolver(roles: usize) -> RoleResolver {
    let mut definitions = serde_json::Map::new();
    definitions.insert(
        "REQUESTER".to_string(),
        json!({ "permissions": { "request:create": true } }),
    );

    let mut mappings = MappingConfig::new();
    for i in 0..roles {
        let name = format!("ROLE_{}", i);
        definitions.insert(
            name.clone(),
            json!({ "permissions": {
                format!("resource_{}:read", i): true,
                format!("resource_{}:write", i): i % 2 == 0,
                "request:create": false
            }}),
        );
        mappings = mappings.map_group(group_dn(i), name);
    }

    let catalog = Catalog::from_value(&json!({ "roles": definitions })).unwrap();
    RoleResolver::new(catalog, mappings, ResolverConfig::default()).unwrap()
}

fn identity_with_groups(groups: usize) -> IdentityRecord {
    let mut identity = IdentityRecord::new("uid=bench,ou=people,dc=example,dc=com", "Bench User");
    for i in 0..groups {
        identity = identity.with_group(group_dn(i));
    }
    identity
}

fn bench_fresh_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh_resolution");
    let resolver = setup_resolver(64);

    for groups in [1, 8, 32, 64] {
        let identity = identity_with_groups(groups);
        group.bench_with_input(BenchmarkId::from_parameter(groups), &identity, |b, id| {
            b.iter(|| {
                resolver
                    .resolve(black_box(PrincipalId(1)), id, ResolveOptions::skip_cache())
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_cached_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_resolution");
    let resolver = setup_resolver(64);
    let identity = identity_with_groups(8);

    resolver
        .resolve(PrincipalId(1), &identity, ResolveOptions::default())
        .unwrap();

    group.bench_function("cache_hit", |b| {
        b.iter(|| {
            resolver
                .resolve(black_box(PrincipalId(1)), &identity, ResolveOptions::default())
                .unwrap()
        });
    });

    group.bench_function("cache_miss_after_invalidate", |b| {
        b.iter(|| {
            resolver.invalidate(PrincipalId(1));
            resolver
                .resolve(black_box(PrincipalId(1)), &identity, ResolveOptions::default())
                .unwrap()
        });
    });

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("permission_aggregation");
    let resolver = setup_resolver(64);

    for count in [2, 16, 64] {
        let roles: Vec<_> = (0..count)
            .filter_map(|i| resolver.get_role(&format!("ROLE_{}", i)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &roles, |b, roles| {
            b.iter(|| aggregate_permissions(black_box(roles.iter().copied())));
        });
    }

    group.finish();
}

fn bench_concurrent_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_access");
    let resolver = Arc::new(setup_resolver(16));

    for thread_count in [2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(thread_count),
            &thread_count,
            |b, &threads| {
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let resolver = Arc::clone(&resolver);
                            thread::spawn(move || {
                                let identity = identity_with_groups(4);
                                for i in 0..100u64 {
                                    resolver
                                        .resolve(PrincipalId(t * 1000 + i % 10), &identity, ResolveOptions::default())
                                        .unwrap();
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fresh_resolution,
    bench_cached_resolution,
    bench_aggregation,
    bench_concurrent_access
);
criterion_main!(benches);
