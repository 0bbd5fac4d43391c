// src/services/cache.rs

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use serde_json::{Map, Value};

use crate::models::{
    auth::{AuthUser, TenantScope},
    filters::{FilterField, MatriculaFilters, SqlParam},
};

/// Teto de respostas guardadas; acima disso o moka despeja as menos usadas.
const MAX_ENTRIES: u64 = 10_000;

/// Cache de respostas com expiração por TTL.
///
/// Injetado no `AppState` como `Arc<dyn ResponseCache>`; uma implementação
/// distribuída pode substituir a em memória sem tocar nos chamadores.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    async fn flush(&self);
}

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    ttl: Duration,
}

/// Cada entrada expira pelo TTL com que foi gravada.
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

pub struct MemoryCache {
    entries: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(EntryTtl)
            .build();
        Self { entries }
    }

    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries
            .insert(key.to_string(), CacheEntry { value, ttl })
            .await;
    }

    async fn flush(&self) {
        let removed = self.entries.entry_count();
        self.entries.invalidate_all();
        tracing::info!("🧹 Cache limpo ({} entradas removidas)", removed);
    }
}

/// Chave determinística: `prefixo|cliente(s)|{"k1":"v1","k2":"v2"}`.
///
/// Os pares vão ordenados pela chave num objeto JSON, então a ordem dos
/// campos na entrada não altera o resultado e valores com `:` ou `|` não
/// colidem com outros conjuntos de filtros.
pub fn generate_cache_key(
    prefix: &str,
    filters: &MatriculaFilters,
    user: Option<&AuthUser>,
) -> String {
    let discriminator = match user.map(AuthUser::tenant_scope) {
        Some(TenantScope::Single(id)) => id.to_string(),
        Some(TenantScope::Many(mut ids)) => {
            ids.sort_unstable();
            SqlParam::IntList(ids).to_string()
        }
        Some(TenantScope::Unscoped) | None => "anon".to_string(),
    };

    let mut pairs: Vec<(&'static str, String)> = filters
        .values()
        .into_iter()
        .map(|(field, value)| (field.key(), value.to_string()))
        .collect();
    if let Some(id) = filters.idcliente {
        pairs.push((FilterField::Idcliente.key(), id.to_string()));
    }
    pairs.sort();

    let encoded: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect();
    format!("{prefix}|{discriminator}|{}", Value::Object(encoded))
}
