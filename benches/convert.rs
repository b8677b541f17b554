//! Benchmarks for profile conversion.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{Value, json};

use membership_tiers::batch::BatchRunner;
use membership_tiers::config::{BatchConfig, ConversionConfig};
use membership_tiers::convert::Converter;
use membership_tiers::intake;

fn converter() -> Converter {
    Converter::new(ConversionConfig {
        as_of: chrono::NaiveDate::from_ymd_opt(2026, 10, 16),
        clone_ifmga_membership: true,
        ..Default::default()
    })
}

fn mountain_guide() -> Value {
    json!({
        "ProfileStatus": "ACTIVE",
        "DateJoined": "2001-09-01",
        "DateEnd": "2005-01-01",
        "DateReinstate": "2005-06-01",
        "LastAnnualValidation": "2024-12-05",
        "IFMGALicenseNumber": "499",
        "SkiExamMode": "Ski",
        "MG": {"status": "Active", "date": "2009-04-01", "lastModified": null},
        "AG": {"status": null, "date": "2006-09-01", "lastModified": null},
        "SG": {"status": null, "date": "2009-04-01", "lastModified": null},
        "AAG": {"status": null, "date": "2003-09-01", "lastModified": null},
        "ASG": {"status": null, "date": "2007-03-01", "lastModified": null},
        "ARG": {"status": null, "date": "2001-09-01", "lastModified": null},
        "HG": {"status": "Active", "date": "2004-06-01", "lastModified": null},
        "HGWT": {"status": "Acquired", "date": null, "lastModified": null}
    })
}

fn bench_normalize(c: &mut Criterion) {
    let raw = mountain_guide();
    c.bench_function("normalize_profile", |bench| {
        bench.iter(|| black_box(intake::normalize(&raw).unwrap()))
    });
}

fn bench_convert(c: &mut Criterion) {
    let converter = converter();
    let profile = intake::normalize(&mountain_guide()).unwrap().profile;
    c.bench_function("convert_mountain_guide", |bench| {
        bench.iter(|| black_box(converter.convert(&profile).unwrap()))
    });
}

fn bench_batch(c: &mut Criterion) {
    let runner = BatchRunner::new(converter(), BatchConfig::default());
    let entries: Vec<(String, Result<Value, String>)> = (0..1_000)
        .map(|i| (i.to_string(), Ok(mountain_guide())))
        .collect();

    c.bench_function("batch_1k_profiles", |bench| {
        bench.iter(|| black_box(runner.run(entries.clone())))
    });
}

criterion_group!(benches, bench_normalize, bench_convert, bench_batch);
criterion_main!(benches);
