// src/cli.rs
//
// Código comum aos binários `sync_escolas` e `geocode_escolas`. Logs vão
// para o stderr; a última linha do stdout é sempre o resumo em JSON.

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{connect_pool, env_or, env_required, GeocoderConfig},
    db::{EscolasGeoRepository, TenantRepository},
    models::geo::{FallbackPolicy, GeocodeMode, GeocodeSummary, SyncSummary},
    services::{
        geo_sync_service::GeoSyncService,
        geocode_service::{GeocodeOptions, GeocodeService},
    },
};

#[derive(Debug, Parser)]
#[command(name = "sync_escolas", about = "Copia as escolas de dados_matriculas para escolas_geo")]
pub struct SyncArgs {
    /// Cliente (obrigatório)
    #[arg(long)]
    pub idcliente: Option<String>,

    /// Só relata o que seria gravado
    #[arg(long = "dryRun", num_args = 0..=1, default_missing_value = "1")]
    pub dry_run: Option<String>,
}

#[derive(Debug, Parser)]
#[command(name = "geocode_escolas", about = "Geocodifica as escolas sem coordenadas")]
pub struct GeocodeArgs {
    /// Cliente (obrigatório)
    #[arg(long)]
    pub idcliente: Option<String>,

    /// Máximo de escolas neste lote
    #[arg(long)]
    pub limit: Option<i64>,

    #[arg(long, value_enum, default_value_t = GeocodeMode::Noaddr)]
    pub mode: GeocodeMode,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::None)]
    pub fallback: FallbackPolicy,

    #[arg(long = "dryRun", num_args = 0..=1, default_missing_value = "1")]
    pub dry_run: Option<String>,
}

pub fn parse_idcliente(raw: Option<&str>) -> anyhow::Result<i32> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        bail!("--idcliente é obrigatório");
    };
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => bail!("--idcliente inválido: {raw}"),
    }
}

pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|r| r.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "sim")
    )
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub fn print_summary<T: Serialize>(summary: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(summary)?);
    Ok(())
}

async fn repositories() -> anyhow::Result<(EscolasGeoRepository, TenantRepository)> {
    dotenvy::dotenv().ok();
    let database_url = env_required("DATABASE_URL")?;
    let pool = connect_pool(&database_url, env_or("DB_MAX_CONNECTIONS", 2u32)?).await?;
    Ok((EscolasGeoRepository::new(pool.clone()), TenantRepository::new(pool)))
}

pub async fn run_sync(args: SyncArgs) -> anyhow::Result<SyncSummary> {
    let idcliente = parse_idcliente(args.idcliente.as_deref())?;
    let dry_run = parse_flag(args.dry_run.as_deref());

    let (geo_repo, tenant_repo) = repositories().await?;
    let summary = GeoSyncService::new(geo_repo, tenant_repo)
        .sync(idcliente, dry_run)
        .await
        .with_context(|| format!("Sincronização do cliente {idcliente} falhou"))?;

    tracing::info!(
        "✅ {} escolas: {} inseridas, {} atualizadas, {} inalteradas{}",
        summary.escolas_encontradas,
        summary.inseridas,
        summary.atualizadas,
        summary.inalteradas,
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(summary)
}

pub async fn run_geocode(args: GeocodeArgs) -> anyhow::Result<GeocodeSummary> {
    let idcliente = parse_idcliente(args.idcliente.as_deref())?;
    if args.limit.is_some_and(|l| l <= 0) {
        bail!("--limit deve ser positivo");
    }

    let options = GeocodeOptions {
        idcliente,
        limit: args.limit,
        mode: args.mode,
        fallback: args.fallback,
        dry_run: parse_flag(args.dry_run.as_deref()),
    };

    let (geo_repo, tenant_repo) = repositories().await?;
    let summary = GeocodeService::new(geo_repo, tenant_repo, GeocoderConfig::from_env()?)
        .run(options)
        .await
        .with_context(|| format!("Geocodificação do cliente {idcliente} falhou"))?;

    tracing::info!(
        "✅ {} processadas: {} encontradas, {} aproximadas, {} baixa confiança, {} falhas",
        summary.processadas,
        summary.encontradas,
        summary.aproximadas,
        summary.baixa_confianca,
        summary.falhas
    );
    Ok(summary)
}
