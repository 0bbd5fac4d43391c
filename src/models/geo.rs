// src/models/geo.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

pub const GEOCODE_SOURCE: &str = "nominatim";
pub const GEOCODE_SOURCE_MUNICIPIO: &str = "nominatim_municipio";
pub const QUALITY_MUNICIPIO_CENTROID: &str = "municipio_centroid";

// ---
// 1. EscolaGeo (linha de `escolas_geo`)
// ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscolaGeo {
    pub idcliente: i32,
    pub idescola: i32,
    pub nome: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cep: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocode_source: Option<String>,
    pub geocode_quality: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EscolaGeo {
    pub fn has_address(&self) -> bool {
        self.logradouro
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty())
    }
}

/// Escola distinta encontrada em `dados_matriculas`.
#[derive(Debug, Clone, FromRow)]
pub struct EscolaOrigem {
    pub idescola: i32,
    pub nome: Option<String>,
}

/// Município/UF de um cliente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClienteLocal {
    pub idcliente: i32,
    pub municipio: Option<String>,
    pub uf: String,
}

// ---
// 2. Upsert com merge "não apaga campo preenchido"
// ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscolaGeoUpsert {
    pub idcliente: i32,
    pub idescola: i32,
    pub nome: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Valor novo só substitui o atual se não estiver vazio.
pub fn merge_text(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match incoming.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => existing.map(str::to_string),
    }
}

impl EscolaGeoUpsert {
    /// Linha resultante de aplicar este upsert sobre `existing`.
    pub fn merged_with(&self, existing: Option<&EscolaGeo>) -> EscolaGeo {
        let base = existing.cloned().unwrap_or_else(|| EscolaGeo {
            idcliente: self.idcliente,
            idescola: self.idescola,
            ..Default::default()
        });
        EscolaGeo {
            nome: merge_text(base.nome.as_deref(), self.nome.as_deref()),
            municipio: merge_text(base.municipio.as_deref(), self.municipio.as_deref()),
            uf: merge_text(base.uf.as_deref(), self.uf.as_deref()),
            ..base
        }
    }

    pub fn outcome(&self, existing: Option<&EscolaGeo>) -> UpsertOutcome {
        match existing {
            None => UpsertOutcome::Inserted,
            Some(current) if self.merged_with(Some(current)) == *current => {
                UpsertOutcome::Unchanged
            }
            Some(_) => UpsertOutcome::Updated,
        }
    }
}

// ---
// 3. Coordenadas resolvidas
// ---
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoCoordenada {
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub quality: String,
}

impl GeoCoordenada {
    pub fn is_aproximada(&self) -> bool {
        self.quality == QUALITY_MUNICIPIO_CENTROID
    }
}

// ---
// 4. Modos e políticas dos scripts
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeMode {
    /// Sem endereço: vários candidatos pontuados.
    #[default]
    Noaddr,
    /// Com endereço: primeiro resultado vence.
    Addr,
}

impl GeocodeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GeocodeMode::Noaddr => "noaddr",
            GeocodeMode::Addr => "addr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Usa o centro do município quando a escola não é encontrada.
    Municipio,
    #[default]
    None,
}

impl FallbackPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackPolicy::Municipio => "municipio",
            FallbackPolicy::None => "none",
        }
    }
}

/// Parâmetros dos endpoints administrativos, por query string ou corpo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GeoScriptParams {
    pub idcliente: Option<i32>,
    pub limit: Option<i64>,
    pub mode: Option<GeocodeMode>,
    pub fallback: Option<FallbackPolicy>,
}

impl GeoScriptParams {
    /// O corpo tem precedência sobre a query string, campo a campo.
    pub fn merged(self, body: Option<Self>) -> Self {
        let Some(body) = body else { return self };
        Self {
            idcliente: body.idcliente.or(self.idcliente),
            limit: body.limit.or(self.limit),
            mode: body.mode.or(self.mode),
            fallback: body.fallback.or(self.fallback),
        }
    }
}

// ---
// 5. Resumos impressos pelos scripts (última linha do stdout)
// ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub idcliente: i32,
    pub escolas_encontradas: usize,
    pub inseridas: usize,
    pub atualizadas: usize,
    pub inalteradas: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeSummary {
    pub idcliente: i32,
    pub mode: GeocodeMode,
    pub processadas: usize,
    pub encontradas: usize,
    pub aproximadas: usize,
    pub baixa_confianca: usize,
    pub falhas: usize,
    pub dry_run: bool,
}
