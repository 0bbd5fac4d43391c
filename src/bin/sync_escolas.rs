// src/bin/sync_escolas.rs

use std::process::ExitCode;

use clap::Parser;
use matriculas_backend::cli::{init_tracing, print_summary, run_sync, SyncArgs};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let summary = match run_sync(SyncArgs::parse()).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match print_summary(&summary) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
