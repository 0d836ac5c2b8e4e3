use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use profsync::hash::{body_digest, digest};
use profsync::{MemoryStore, Profile, ReplicaStore, SyncEngine, DEFAULT_STRATEGY};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

fn profile(fields: usize) -> Profile {
    let mut map = Profile::new();
    for i in 0..fields {
        map.insert(
            format!("field_{}", i),
            json!({"value": i, "label": format!("entry {}", i), "tags": ["a", "b", "ü"]}),
        );
    }
    map.insert("last_sync".to_string(), Value::from("2024-01-01T00:00:00.000000"));
    map
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    for fields in [10, 100, 1000].iter() {
        let doc = profile(*fields);
        group.bench_with_input(BenchmarkId::new("full", fields), &doc, |b, doc| {
            b.iter(|| black_box(digest(black_box(doc))));
        });
        group.bench_with_input(BenchmarkId::new("body", fields), &doc, |b, doc| {
            b.iter(|| black_box(body_digest(black_box(doc))));
        });
    }
    group.finish();
}

fn bench_sync_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_all");
    let rt = Runtime::new().unwrap();

    for count in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let engine =
                        SyncEngine::new(MemoryStore::new("local"), MemoryStore::new("cloud"));
                    let doc = profile(20);
                    for i in 0..count {
                        engine
                            .local()
                            .write(&format!("profile_{}", i), &doc)
                            .await
                            .unwrap();
                    }

                    // First pass uploads everything, second pass finds it all in sync
                    black_box(engine.sync_all(DEFAULT_STRATEGY).await);
                    black_box(engine.sync_all(DEFAULT_STRATEGY).await);
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_digest, bench_sync_all);
criterion_main!(benches);
