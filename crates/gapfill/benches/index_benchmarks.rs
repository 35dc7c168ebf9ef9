//! Key index performance benchmarks.
//!
//! Measures index build, missing-field scan and batch auto-fill across table sizes.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gapfill::{Dataset, FieldLinks, KeyConfig, KeyIndex, ReconciliationSession};

/// Primary table where every third row lacks company and phone.
fn generate_primary(rows: usize) -> Dataset {
    let headers = vec!["id".to_string(), "company".to_string(), "phone".to_string()];
    let data = (0..rows)
        .map(|i| {
            let filled = i % 3 != 0;
            vec![
                format!("{:06}", i),
                if filled { format!("Company {}", i) } else { String::new() },
                if filled { format!("030 {}", i) } else { String::new() },
            ]
        })
        .collect();
    Dataset::new(headers, data)
}

/// Secondary table with two rows per key.
fn generate_secondary(rows: usize) -> Dataset {
    let headers = vec!["cust".to_string(), "name".to_string(), "tel".to_string()];
    let data = (0..rows)
        .flat_map(|i| {
            [
                vec![format!("{:06}", i), String::new(), "n/a".to_string()],
                vec![format!("{:06}", i), format!("Firm {}", i), format!("+49 (0)30 {}", i)],
            ]
        })
        .collect();
    Dataset::new(headers, data)
}

fn bench_build_and_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_index");

    for size in [1_000, 10_000, 50_000] {
        let primary = generate_primary(size);
        let secondary = generate_secondary(size);
        let columns = vec!["company".to_string(), "phone".to_string()];
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("build", size), &size, |b, _| {
            b.iter(|| {
                KeyIndex::build(
                    black_box(&primary),
                    secondary.clone(),
                    KeyConfig::new("id", "cust"),
                )
                .unwrap()
            })
        });

        let index = KeyIndex::build(&primary, secondary.clone(), KeyConfig::new("id", "cust")).unwrap();
        group.bench_with_input(BenchmarkId::new("scan", size), &size, |b, _| {
            b.iter(|| index.missing_keys(black_box(&primary), &columns))
        });
    }

    group.finish();
}

fn bench_autofill_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("autofill");
    group.sample_size(20);

    for size in [1_000, 10_000] {
        let primary = generate_primary(size);
        let secondary = generate_secondary(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("all", size), &size, |b, _| {
            b.iter(|| {
                let mut session = ReconciliationSession::new(primary.clone());
                session
                    .attach_secondary(secondary.clone(), KeyConfig::new("id", "cust"))
                    .unwrap();
                session.set_links(
                    FieldLinks::new()
                        .with_link("company", "name")
                        .with_link("phone", "tel"),
                );
                session.autofill_all().unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_and_scan, bench_autofill_all);
criterion_main!(benches);
