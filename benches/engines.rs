use criterion::{criterion_group, criterion_main, Criterion};
use quadmap::{AbstractMap, Config, MapKind};
use rand::seq::SliceRandom;

fn build_cost(c: &mut Criterion) {
    let mut keys: Vec<String> = (0..10_000).map(|i| format!("word-{i:05}")).collect();
    keys.shuffle(&mut rand::rng());

    let mut group = c.benchmark_group("build 10k words");

    for kind in MapKind::ALL {
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| {
                let mut map = Config::new(kind).open::<String, u64>();

                for key in &keys {
                    *map.get_or_default(key.clone()).expect("insertion succeeds") += 1;
                }

                map.len()
            });
        });
    }

    group.finish();
}

fn point_lookup(c: &mut Criterion) {
    let mut keys: Vec<String> = (0..10_000).map(|i| format!("word-{i:05}")).collect();
    keys.shuffle(&mut rand::rng());

    let mut group = c.benchmark_group("point lookups");

    for kind in MapKind::ALL {
        let mut map = Config::new(kind).open::<String, u64>();
        for key in &keys {
            map.add(key.clone(), 1);
        }

        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| {
                let mut hits = 0;
                for key in keys.iter().take(1_000) {
                    if map.contains(key) {
                        hits += 1;
                    }
                }
                hits
            });
        });
    }

    group.finish();
}

criterion_group!(benches, build_cost, point_lookup);
criterion_main!(benches);
