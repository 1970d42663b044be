//! Example: Analyze a single recording
//!
//! Usage:
//!   cargo run --release --example analyze_file -- <audio file> [deployment.json]
//!
//! Prints the status code and the JSON body a service would return.

use std::env;
use std::process::ExitCode;
use stratum_voice::{AnalysisPipeline, DeploymentConfig};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(audio_path) = args.first() else {
        eprintln!("Usage: analyze_file <audio file> [deployment.json]");
        return ExitCode::from(2);
    };
    let deployment_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/deploy/deployment.json").to_string());

    // Artifacts are loaded once, before any request is served
    let pipeline = match DeploymentConfig::from_file(&deployment_path)
        .and_then(|deployment| AnalysisPipeline::from_deployment(&deployment))
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bytes = match std::fs::read(audio_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("ERROR: cannot read {}: {}", audio_path, e);
            return ExitCode::FAILURE;
        }
    };

    let response = pipeline.handle(&bytes);
    println!("{}", response.status_code());
    println!("{}", response.to_json());

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
