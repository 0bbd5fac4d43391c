// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{MatriculasRepository, TenantRepository, UserRepository},
    services::{
        auth::AuthService,
        cache::{MemoryCache, ResponseCache},
        dashboard_service::DashboardService,
        script_runner::ScriptRunner,
    },
};

/// Lê uma variável obrigatória.
pub fn env_required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} deve ser definida"))
}

/// Lê uma variável opcional, caindo no padrão se ausente ou vazia.
pub fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} inválida ({raw}): {e}")),
        _ => Ok(default),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ---
// Configuração do geocodificador (usada pelo servidor e pelos scripts)
// ---
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub email: Option<String>,
    /// Intervalo mínimo entre requisições ao provedor.
    pub delay: Duration,
    pub timeout: Duration,
}

impl GeocoderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env_or(
                "GEOCODER_URL",
                "https://nominatim.openstreetmap.org/search".to_string(),
            )?,
            user_agent: env_or(
                "GEOCODER_USER_AGENT",
                "painel-matriculas/0.1 (geocodificacao de escolas)".to_string(),
            )?,
            email: env_optional("GEOCODER_EMAIL"),
            delay: Duration::from_millis(env_or("GEOCODER_DELAY_MS", 1100u64)?),
            timeout: Duration::from_secs(env_or("GEOCODER_TIMEOUT_SECS", 20u64)?),
        })
    }
}

// ---
// Configuração do servidor HTTP
// ---
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub cache_ttl: Duration,
    pub filtros_cache_ttl: Duration,
    pub cors_origin: Option<String>,
    /// Diretório dos binários `sync_escolas` e `geocode_escolas`.
    pub scripts_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_required("DATABASE_URL")?,
            jwt_secret: env_required("JWT_SECRET")?,
            port: env_or("PORT", 3000u16)?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5u32)?,
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", 300u64)?),
            filtros_cache_ttl: Duration::from_secs(env_or("FILTROS_CACHE_TTL_SECS", 600u64)?),
            cors_origin: env_optional("CORS_ORIGIN"),
            scripts_dir: env_optional("SCRIPTS_DIR").map(PathBuf::from),
        })
    }
}

/// Abre a pool de conexões compartilhada.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub user_repo: UserRepository,
    pub tenant_repo: TenantRepository,
    pub auth_service: AuthService,
    pub dashboard_service: DashboardService,
    pub script_runner: ScriptRunner,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = connect_pool(&config.database_url, config.db_max_connections).await?;
        Ok(Self::from_pool(db_pool, config, Arc::new(MemoryCache::new())))
    }

    /// Monta o gráfico de dependências a partir de uma pool já criada.
    pub fn from_pool(db_pool: PgPool, config: Config, cache: Arc<dyn ResponseCache>) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let matriculas_repo = MatriculasRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), config.jwt_secret.clone());
        let dashboard_service = DashboardService::new(
            matriculas_repo,
            cache,
            config.cache_ttl,
            config.filtros_cache_ttl,
        );
        let script_runner = ScriptRunner::new(config.scripts_dir.clone());

        Self {
            db_pool,
            config: Arc::new(config),
            user_repo,
            tenant_repo,
            auth_service,
            dashboard_service,
            script_runner,
        }
    }
}
