//! Pipeline 벤치마크
//!
//! Key property parsing, 응답 평탄화, 분류 성능 측정

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rjmx_collector::collector::{flatten_response, parse_response, RawAttribute};
use rjmx_collector::config::CollectionDefinition;
use rjmx_collector::integration::Integration;
use rjmx_collector::transformer::{
    classify, compile, parse_key_properties, CollectionContext, TransformEngine,
};
use std::hint::black_box;

fn benchmark_key_properties(c: &mut Criterion) {
    let inputs = [
        ("plain", "type=GarbageCollector,name=G1 Young Generation"),
        (
            "quoted",
            r#"type=RequestMetrics,name="TotalTimeMs,Fetch",request="a\"b",scope=broker"#,
        ),
    ];

    let mut group = c.benchmark_group("parse_key_properties");
    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| parse_key_properties(black_box(input)))
        });
    }
    group.finish();
}

fn benchmark_flatten(c: &mut Criterion) {
    let wildcard_json = r#"{
        "request": {"mbean": "java.lang:type=GarbageCollector,name=*", "type": "read"},
        "value": {
            "java.lang:type=GarbageCollector,name=G1 Young Generation": {
                "CollectionCount": 42,
                "CollectionTime": 1234,
                "LastGcInfo": {"duration": 5, "id": 42}
            },
            "java.lang:type=GarbageCollector,name=G1 Old Generation": {
                "CollectionCount": 5,
                "CollectionTime": 567,
                "LastGcInfo": null
            }
        },
        "timestamp": 1609459200,
        "status": 200
    }"#;

    c.bench_function("flatten_response/wildcard", |b| {
        b.iter(|| {
            let response = parse_response(black_box(wildcard_json)).unwrap();
            flatten_response(&response).unwrap()
        })
    });
}

fn generate_results(beans: usize, attrs: usize) -> Vec<RawAttribute> {
    (0..beans)
        .flat_map(|bean| {
            (0..attrs).map(move |attr| {
                RawAttribute::ok(
                    format!(
                        "kafka.server:type=BrokerTopicMetrics,name=Metric{},topic=t{},attr=Attr{}",
                        attr % 4,
                        bean,
                        attr
                    ),
                    attr as i64,
                )
            })
        })
        .collect()
}

fn benchmark_pipeline(c: &mut Criterion) {
    let yaml = r#"
collect:
  - domain: kafka.server
    beans:
      - query: type=BrokerTopicMetrics,*
        exclude_regex: Attr1.*
        attributes:
          - attr_regex: Attr[0-9]
            metric_type: gauge
          - attr_regex: Attr.*
"#;
    let domains = compile(&CollectionDefinition::from_yaml_str(yaml).unwrap()).unwrap();
    let domain = &domains[0];
    let bean = &domain.beans[0];
    let pattern = domain.query_pattern(bean);
    let engine = TransformEngine::new(CollectionContext::new("localhost", "9999"));

    let mut group = c.benchmark_group("pipeline");
    for beans in [10, 100] {
        let results = generate_results(beans, 20);
        group.bench_with_input(BenchmarkId::new("classify", beans), &results, |b, results| {
            b.iter(|| classify(&pattern, bean, black_box(results.clone())))
        });
        group.bench_with_input(BenchmarkId::new("build", beans), &results, |b, results| {
            b.iter(|| {
                let mut integration = Integration::new("bench");
                let classification = classify(&pattern, bean, results.clone());
                for (domain_name, values) in classification.groups {
                    engine.insert_domain_metrics(
                        &mut integration,
                        &domain.event_type,
                        &domain_name,
                        &bean.query,
                        values,
                    );
                }
                integration
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_key_properties,
    benchmark_flatten,
    benchmark_pipeline
);
criterion_main!(benches);
