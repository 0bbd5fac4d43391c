// src/bin/geocode_escolas.rs

use std::process::ExitCode;

use clap::Parser;
use matriculas_backend::cli::{init_tracing, print_summary, run_geocode, GeocodeArgs};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let summary = match run_geocode(GeocodeArgs::parse()).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Falhas por escola já estão no resumo; não mudam o código de saída
    match print_summary(&summary) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
