//! Benchmarks for activity parsing, derivation and run queries
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use stridelog::activity::gpx::parse_gpx;
use stridelog::activity::{derive, ActivitySample, DeriveConfig, ParsedActivity};
use stridelog::config::Timezone;
use stridelog::storage::{NewRun, RunFilter, RunType, Store};
use tempfile::tempdir;

/// One sample per second along a straight line at roughly 8:00/mi
fn synthetic_activity(samples: usize) -> ParsedActivity {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let samples = (0..samples)
        .map(|i| ActivitySample {
            latitude: Some(45.5 + i as f64 * 0.000030),
            longitude: Some(-122.5),
            elevation_m: Some(100.0 + ((i as f64) / 60.0).sin() * 15.0),
            timestamp: Some(start + Duration::seconds(i as i64)),
            heart_rate: Some(130 + (i % 40) as u16),
            speed_mps: Some(3.35),
        })
        .collect();

    ParsedActivity {
        samples,
        ..Default::default()
    }
}

fn synthetic_gpx(points: usize) -> String {
    let mut gpx = String::from("<?xml version=\"1.0\"?>\n<gpx version=\"1.1\" creator=\"bench\"><trk><name>Bench</name><trkseg>\n");
    for i in 0..points {
        gpx.push_str(&format!(
            "<trkpt lat=\"{:.6}\" lon=\"-122.500000\"><ele>{:.1}</ele><time>2024-06-01T12:{:02}:{:02}Z</time></trkpt>\n",
            45.5 + i as f64 * 0.00003,
            100.0 + (i % 30) as f64,
            (i / 60) % 60,
            i % 60
        ));
    }
    gpx.push_str("</trkseg></trk></gpx>\n");
    gpx
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    let config = DeriveConfig { hr_max: 190 };

    for size in [600, 3600, 10800] {
        let activity = synthetic_activity(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("derive_{}", size), |b| {
            b.iter(|| derive(black_box(&activity), black_box(&config)))
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for size in [600, 3600] {
        let gpx = synthetic_gpx(size);
        group.throughput(Throughput::Bytes(gpx.len() as u64));

        group.bench_function(format!("gpx_{}", size), |b| {
            b.iter(|| parse_gpx(black_box(gpx.as_bytes())).unwrap())
        });
    }

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("bench.db")).unwrap();
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for day in 0..365 {
        let run = NewRun::manual(first + Duration::days(day), "Easy", 5.0, 2700).run_type(RunType::Easy);
        store.create_run(&run).unwrap();
    }
    let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    group.bench_function("list_runs_month", |b| {
        let filter = RunFilter::between(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        b.iter(|| store.list_runs(black_box(&filter)).unwrap())
    });

    group.bench_function("weekly_mileage_26", |b| {
        b.iter(|| store.weekly_mileage(black_box(today), 26).unwrap())
    });

    group.bench_function("summarize_import", |b| {
        let activity = synthetic_activity(3600);
        b.iter(|| stridelog::activity::summarize(black_box(&activity), &Timezone::Utc))
    });

    group.finish();
}

criterion_group!(benches, bench_derive, bench_parse, bench_store);
criterion_main!(benches);
