//! Performance benchmarks for voice analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use stratum_voice::{extract_biomarkers, AnalysisConfig, AnalysisPipeline, DeploymentConfig};

/// Three seconds of a harmonic tone at 16 kHz, encoded as WAV
fn synthetic_recording() -> Vec<u8> {
    let sample_rate = 16000;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..sample_rate * 3 {
            let t = i as f32 / sample_rate as f32;
            let p = 2.0 * std::f32::consts::PI * 160.0 * t;
            let s = 0.4 * p.sin() + 0.2 * (2.0 * p).sin() + 0.1 * (3.0 * p).sin();
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn bench_extract_biomarkers(c: &mut Criterion) {
    let bytes = synthetic_recording();
    let config = AnalysisConfig::default();

    c.bench_function("extract_biomarkers_3s", |b| {
        b.iter(|| {
            let _ = extract_biomarkers(black_box(&bytes), black_box(&config));
        });
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let bytes = synthetic_recording();
    let deployment_path = concat!(env!("CARGO_MANIFEST_DIR"), "/deploy/deployment.json");
    let deployment = DeploymentConfig::from_file(deployment_path).unwrap();
    let pipeline = AnalysisPipeline::from_deployment(&deployment).unwrap();

    c.bench_function("pipeline_analyze_3s", |b| {
        b.iter(|| {
            let _ = pipeline.analyze(black_box(&bytes));
        });
    });
}

criterion_group!(benches, bench_extract_biomarkers, bench_pipeline);
criterion_main!(benches);
