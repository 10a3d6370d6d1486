use chronograph::{
    Action, Config, Entity, Interval, LogRecord, ModelBuilder, MutationLog, SnapshotDeltaModel,
    SnapshotGranularity, TemporalModel, ValidityModel,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn synthetic_records(entities: u64, updates_per_entity: u64) -> Vec<LogRecord> {
    let mut records = Vec::new();
    let mut t = 0u64;
    for id in 0..entities {
        records.push(LogRecord::new(t, Action::Create, Entity::Vertex(id)));
        t += 1;
        for u in 0..updates_per_entity {
            let mut attrs = chronograph::Attributes::new();
            attrs.insert("v".to_string(), u.to_string());
            records.push(
                LogRecord::new(t, Action::Update, Entity::Vertex(id)).with_attributes(attrs),
            );
            t += 3;
        }
        if id % 2 == 0 {
            records.push(LogRecord::new(t, Action::Delete, Entity::Vertex(id)));
            t += 1;
        }
        records.push(LogRecord::new(
            t,
            Action::Create,
            Entity::Edge {
                id,
                src: id,
                dst: (id + 1) % entities,
            },
        ));
        t += 1;
    }
    records
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let records = synthetic_records(2_000, 4);

    group.bench_function("validity", |b| {
        b.iter(|| {
            let log = MutationLog::from_records(black_box(records.clone()));
            ValidityModel::build(&log).unwrap()
        })
    });

    for bucket in [64usize, 512, 4096] {
        group.bench_with_input(
            BenchmarkId::new("snapshot_delta_count", bucket),
            &bucket,
            |b, &bucket| {
                let config = Config::default()
                    .with_granularity(SnapshotGranularity::Count(bucket))
                    .with_warn_on_churn(false);
                b.iter(|| {
                    let log = MutationLog::from_records(black_box(records.clone()));
                    SnapshotDeltaModel::build_with_config(log, &config).unwrap()
                })
            },
        );
    }

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let records = synthetic_records(2_000, 4);
    let max_t = records.iter().map(|r| r.timestamp).max().unwrap_or(0);

    let validity = ModelBuilder::new()
        .records(records.clone())
        .build_validity()
        .unwrap();
    let delta = ModelBuilder::new()
        .records(records)
        .config(
            Config::default()
                .with_granularity(SnapshotGranularity::Count(512))
                .with_warn_on_churn(false),
        )
        .build_snapshot_delta()
        .unwrap();

    let probe = Entity::Vertex(999);
    group.bench_function("validity_point_lookup", |b| {
        b.iter(|| validity.entity_at(black_box(&probe), black_box(max_t / 2)).unwrap())
    });
    group.bench_function("snapshot_delta_point_lookup", |b| {
        b.iter(|| delta.entity_at(black_box(&probe), black_box(max_t / 2)).unwrap())
    });

    group.bench_function("validity_snapshot", |b| {
        b.iter(|| validity.snapshot_at(black_box(max_t / 2)).unwrap())
    });
    group.bench_function("snapshot_delta_snapshot", |b| {
        b.iter(|| delta.snapshot_at(black_box(max_t / 2)).unwrap())
    });

    let window = Interval::new(max_t / 4, max_t / 2);
    group.bench_function("validity_neighbours", |b| {
        b.iter(|| validity.direct_neighbours(black_box(42), &window).unwrap())
    });
    group.bench_function("snapshot_delta_activated", |b| {
        b.iter(|| delta.activated_vertices(black_box(&window)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_queries);
criterion_main!(benches);
