use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use perfgraph_base_schema::units::UnitRegistry;
use perfgraph_metrics::{
    MetricRegistry, ParseOptions, ResolutionContext, TranslationRule, parse_perf_data,
    translate_metrics,
};

fn perf_data(fields: usize) -> String {
    (0..fields)
        .map(|i| format!("'if {i} in'={}.5B;80;90;0;{}", i * 1000, i * 2000))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_perf_data");

    for fields in [1, 10, 100] {
        let input = perf_data(fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &input, |b, input| {
            b.iter(|| parse_perf_data(black_box(input), None, ParseOptions::default()));
        });
    }

    group.finish();
}

fn bench_translate(c: &mut Criterion) {
    let mut registry = MetricRegistry::new();
    let rule = TranslationRule {
        name: Some("if_in_bps".into()),
        scale: Some(8.0),
        ..Default::default()
    };
    registry
        .translations_mut()
        .insert("check_mk-lnx_if", "~if_[0-9]+_in", rule)
        .unwrap();

    let units = UnitRegistry::new();
    let mut group = c.benchmark_group("translate_metrics");

    for fields in [1, 10, 100] {
        let samples = parse_perf_data(&perf_data(fields), None, ParseOptions::default())
            .unwrap()
            .samples;

        group.bench_with_input(BenchmarkId::from_parameter(fields), &samples, |b, samples| {
            b.iter(|| {
                translate_metrics(
                    black_box(samples),
                    Some("check_mk-lnx_if"),
                    &registry,
                    &units,
                    ResolutionContext::new(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_translate);
criterion_main!(benches);
