//! Example: Analyze multiple recordings in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--deployment PATH] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files. One shared pipeline serves every worker.
//! - Output is one JSON object per line (JSONL), in input order.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use rayon::prelude::*;
use std::env;
use std::time::Instant;
use stratum_voice::{AnalysisPipeline, AnalysisResponse, DeploymentConfig};

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut jobs: Option<usize> = None;
    let mut deployment_path =
        concat!(env!("CARGO_MANIFEST_DIR"), "/deploy/deployment.json").to_string();
    let mut paths: Vec<String> = Vec::new();

    while !args.is_empty() {
        let a = args.remove(0);
        match a.as_str() {
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--deployment" => {
                deployment_path = args.first().ok_or("--deployment requires a path")?.clone();
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--deployment PATH] <file1> <file2> ...\n\
                     \n\
                     --jobs N            Parallel workers (default: CPU-1)\n\
                     --deployment PATH   Deployment description (default: deploy/deployment.json)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let deployment = DeploymentConfig::from_file(&deployment_path)?;
    let pipeline = AnalysisPipeline::from_deployment(&deployment)?;

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<(String, AnalysisResponse)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let response = match std::fs::read(path) {
                    Ok(bytes) => pipeline.handle(&bytes),
                    Err(e) => AnalysisResponse::Failure {
                        error: format!("cannot read file: {}", e),
                    },
                };
                (path.clone(), response)
            })
            .collect()
    });

    let mut ok = 0usize;
    for (path, response) in &outs {
        if response.is_success() {
            ok += 1;
        }
        let mut line = serde_json::json!({
            "file": path,
            "status": response.status_code(),
        });
        if let (Some(obj), Ok(body)) = (
            line.as_object_mut(),
            serde_json::to_value(response),
        ) {
            obj.insert("response".to_string(), body);
        }
        println!("{}", line);
    }

    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
