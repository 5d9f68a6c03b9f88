use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use std::path::PathBuf;
use yafv::{FhirValidator, FhirVersion, ValidationOptions, embedded};

fn fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// ValueSet whose expansion nests `depth` levels of `contains`
fn deep_value_set(depth: usize) -> Value {
    let mut node = json!({"code": "leaf", "display": "Leaf"});
    for level in 0..depth {
        node = json!({"code": format!("c{level}"), "contains": [node]});
    }
    json!({
        "resourceType": "ValueSet",
        "status": "active",
        "expansion": {"timestamp": "2024-01-01T00:00:00Z", "contains": [node]}
    })
}

fn bench_catalog_build(c: &mut Criterion) {
    c.bench_function("build_embedded_r4_catalog", |b| {
        b.iter(|| black_box(embedded::build_catalog(FhirVersion::R4)).unwrap())
    });
}

fn bench_fixtures(c: &mut Criterion) {
    let validator = FhirValidator::for_version(FhirVersion::R4).unwrap();
    let mut group = c.benchmark_group("validate_fixture");

    for name in [
        "patient-valid.json",
        "observation-valid.json",
        "bundle-valid.json",
        "observation-invalid.json",
    ] {
        let resource = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &resource, |b, resource| {
            b.iter(|| black_box(validator.validate(resource)).unwrap())
        });
    }

    group.finish();
}

fn bench_deep_nesting(c: &mut Criterion) {
    let catalog = embedded::catalog(FhirVersion::R4).unwrap();
    let validator = FhirValidator::with_options(
        catalog,
        ValidationOptions {
            max_depth: 10_000,
            ..Default::default()
        },
    );
    let mut group = c.benchmark_group("validate_deep_value_set");

    for depth in [10usize, 100, 1000] {
        let value_set = deep_value_set(depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &value_set, |b, value_set| {
            b.iter(|| black_box(validator.validate(value_set)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_catalog_build, bench_fixtures, bench_deep_nesting);
criterion_main!(benches);
