use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use errata::{relation_report, DivByZeroStrat, NO_RELATION};
use pprof::criterion::{Output, PProfProfiler};

const RELATIONS: [&str; 8] = [
    NO_RELATION,
    "per:title",
    "per:employee_of",
    "per:origin",
    "org:founded_by",
    "org:top_members/employees",
    "org:country_of_headquarters",
    "per:cities_of_residence",
];

/// Gold and predicted relations, where roughly one prediction out of four is wrong.
fn build_vecs(size: usize) -> (Vec<&'static str>, Vec<&'static str>) {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut y_true = Vec::with_capacity(size);
    let mut y_pred = Vec::with_capacity(size);
    for _ in 0..size {
        let gold = RELATIONS[(next() % RELATIONS.len() as u64) as usize];
        let pred = if next() % 4 == 0 {
            RELATIONS[(next() % RELATIONS.len() as u64) as usize]
        } else {
            gold
        };
        y_true.push(gold);
        y_pred.push(pred);
    }
    (y_true, y_pred)
}

fn benchmark_relation_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("relation_report");
    for size in [1_000, 100_000] {
        let (y_true, y_pred) = build_vecs(size);
        for parallel in [false, true] {
            group.bench_with_input(
                BenchmarkId::new(if parallel { "parallel" } else { "sequential" }, size),
                &(&y_true, &y_pred),
                |b, (y_true, y_pred)| {
                    b.iter(|| {
                        relation_report(
                            y_true,
                            y_pred,
                            DivByZeroStrat::ReplaceBy0,
                            Some(NO_RELATION),
                            parallel,
                        )
                        .unwrap()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(
    name=report_benches;
    config = Criterion::default().sample_size(100).with_profiler(PProfProfiler::new(3000, Output::Flamegraph(None)));
    targets = benchmark_relation_report
);
criterion_main!(report_benches);
