//! Validation and export throughput for a mid-sized agent manifest.

use agentspec::export::{ExportOptions, ExporterRegistry};
use agentspec::manifest::{parse_str, Manifest};
use agentspec::migrate::Migrator;
use agentspec::validator::{ValidationMode, Validator};
use agentspec::SchemaRegistry;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn agent(tools: usize) -> Manifest {
    let mut yaml = String::from(
        "apiVersion: agentspec/v0.4.0
kind: Agent
metadata:
  name: bench-agent
spec:
  role: You answer questions.
  llm:
    provider: anthropic
    model: claude-sonnet-4
  policies:
    limits:
      maxTurns: 8
  tools:
",
    );
    for i in 0..tools {
        yaml.push_str(&format!(
            "    - type: http\n      name: call_{i}\n      endpoint: https://api.example.com/{i}\n"
        ));
    }
    parse_str(&yaml, None).expect("bench: manifest")
}

fn bench_validate(c: &mut Criterion) {
    let registry = SchemaRegistry::builtin().expect("bench: registry");
    let schema = registry.latest();
    let validator = Validator::default();

    let mut group = c.benchmark_group("validate");
    for tools in [1usize, 16, 128] {
        let manifest = agent(tools);
        group.bench_with_input(BenchmarkId::from_parameter(tools), &manifest, |b, manifest| {
            b.iter(|| black_box(validator.validate(manifest, schema, ValidationMode::Progressive)));
        });
    }
    group.finish();
}

fn bench_migrate(c: &mut Criterion) {
    let registry = SchemaRegistry::builtin().expect("bench: registry");
    let migrator = Migrator::builtin();
    let manifest = agent(16);
    let from = registry.latest();
    let to = registry.resolve_str("0.2.0").expect("bench: 0.2.0");

    c.bench_function("migrate_0.4_to_0.2", |b| {
        b.iter(|| black_box(migrator.migrate(&manifest, from, to)));
    });
}

fn bench_export(c: &mut Criterion) {
    let exporters = ExporterRegistry::builtin();
    let manifest = agent(16);
    let options = ExportOptions::default();

    for exporter in exporters.iter() {
        c.bench_function(&format!("export_{}", exporter.target().name), |b| {
            b.iter(|| black_box(exporter.export(&manifest, &options)));
        });
    }
}

criterion_group!(benches, bench_validate, bench_migrate, bench_export);
criterion_main!(benches);
