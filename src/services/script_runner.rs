// src/services/script_runner.rs

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tokio::process::Command;

use crate::{
    common::error::AppError,
    models::geo::{FallbackPolicy, GeocodeMode, GeocodeSummary, SyncSummary},
};

pub const SYNC_ESCOLAS: &str = "sync_escolas";
pub const GEOCODE_ESCOLAS: &str = "geocode_escolas";

/// Quanto da saída do processo volta na resposta de erro.
const OUTPUT_TAIL_CHARS: usize = 8000;

/// Últimos `max` caracteres (não bytes) de `text`.
pub fn tail_chars(text: &str, max: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(max)).collect()
}

/// Lê o resumo JSON da última linha não vazia do stdout.
pub fn parse_summary<T: DeserializeOwned>(stdout: &str) -> Option<T> {
    stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| serde_json::from_str(l.trim()).ok())
}

/// Executa os binários de manutenção como processos filhos.
#[derive(Clone, Debug)]
pub struct ScriptRunner {
    scripts_dir: Option<PathBuf>,
}

impl ScriptRunner {
    pub fn new(scripts_dir: Option<PathBuf>) -> Self {
        Self { scripts_dir }
    }

    /// Sem `SCRIPTS_DIR`, procura ao lado do executável do servidor.
    fn program(&self, name: &str) -> Result<PathBuf, AppError> {
        let dir = match &self.scripts_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_exe()
                .map_err(anyhow::Error::from)?
                .parent()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow::anyhow!("Diretório do executável desconhecido"))?,
        };
        Ok(dir.join(name))
    }

    async fn run<T: DeserializeOwned>(&self, name: &str, args: Vec<String>) -> Result<T, AppError> {
        let program = self.program(name)?;
        tracing::info!("▶️ Executando {} {}", program.display(), args.join(" "));

        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|e| AppError::ScriptFailed {
                script: name.to_string(),
                output: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let combined = format!("{stderr}\n{stdout}");
            return Err(AppError::ScriptFailed {
                script: name.to_string(),
                output: tail_chars(&combined, OUTPUT_TAIL_CHARS),
            });
        }

        parse_summary(&stdout).ok_or_else(|| AppError::ScriptFailed {
            script: name.to_string(),
            output: tail_chars(&format!("{stderr}\n{stdout}"), OUTPUT_TAIL_CHARS),
        })
    }

    pub async fn sync_escolas(&self, idcliente: i32) -> Result<SyncSummary, AppError> {
        self.run(SYNC_ESCOLAS, vec![format!("--idcliente={idcliente}")])
            .await
    }

    pub async fn geocode_escolas(
        &self,
        idcliente: i32,
        limit: Option<i64>,
        mode: GeocodeMode,
        fallback: FallbackPolicy,
    ) -> Result<GeocodeSummary, AppError> {
        let mut args = vec![
            format!("--idcliente={idcliente}"),
            format!("--mode={}", mode.as_str()),
            format!("--fallback={}", fallback.as_str()),
        ];
        if let Some(limit) = limit {
            args.push(format!("--limit={limit}"));
        }
        self.run(GEOCODE_ESCOLAS, args).await
    }
}
