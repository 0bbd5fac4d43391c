// src/services/dashboard_service.rs

use std::{future::Future, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    common::error::AppError,
    db::{matriculas_repo::Dimensao, MatriculasRepository},
    models::{
        auth::AuthUser,
        dashboard::{
            AlertasResponse, AnalyticsResponse, BreakdownItem, BreakdownsResponse,
            EscolaIndicadores, EscolaMapa, FiltrosResponse, MapaResponse, SerieMensal,
            TotaisResponse,
        },
        filters::{FilterField, MatriculaFilters},
        geo::QUALITY_MUNICIPIO_CENTROID,
    },
    services::{
        cache::{generate_cache_key, ResponseCache},
        filters::build_where_clause,
        metrics::{build_alertas, compare_years, rate, safe_count, safe_f64},
    },
};

#[derive(Clone)]
pub struct DashboardService {
    repo: MatriculasRepository,
    cache: Arc<dyn ResponseCache>,
    ttl: Duration,
    filtros_ttl: Duration,
}

impl DashboardService {
    pub fn new(
        repo: MatriculasRepository,
        cache: Arc<dyn ResponseCache>,
        ttl: Duration,
        filtros_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            ttl,
            filtros_ttl,
        }
    }

    /// Lê do cache ou executa `load` e guarda o resultado.
    async fn cached<T, F, Fut>(&self, key: String, ttl: Duration, load: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(hit) = self.cache.get(&key).await {
            match serde_json::from_value::<T>(hit) {
                Ok(value) => {
                    tracing::debug!("cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => tracing::warn!("Entrada de cache ilegível ({}): {}", key, e),
            }
        }

        let value = load().await?;
        match serde_json::to_value(&value) {
            Ok(json) => self.cache.set(&key, json, ttl).await,
            Err(e) => tracing::warn!("Falha ao serializar para o cache ({}): {}", key, e),
        }
        Ok(value)
    }

    // 1. Totais + comparativo anual
    pub async fn get_totais(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<TotaisResponse, AppError> {
        let key = generate_cache_key("totais", filters, Some(user));
        self.cached(key, self.ttl, || self.load_totais(filters, user))
            .await
    }

    async fn load_totais(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<TotaisResponse, AppError> {
        let clause = build_where_clause(filters, Some(user));
        let row = self.repo.get_totais(&clause).await?;
        let especiais = self.repo.count_especiais(&clause).await?;

        let total = safe_count(row.total);
        let ativas = safe_count(row.ativas);
        let saidas = safe_count(row.saidas);
        let capacidade = safe_count(row.capacidade);

        let comparativo = self.comparativo_anual(filters, user).await?;

        Ok(TotaisResponse {
            total_matriculas: total,
            matriculas_ativas: ativas,
            total_escolas: safe_count(row.escolas),
            total_turmas: safe_count(row.turmas),
            capacidade_total: capacidade,
            vagas_disponiveis: (capacidade - ativas).max(0),
            taxa_ocupacao: rate(row.taxa_ocupacao, ativas, capacidade),
            entradas: safe_count(row.entradas),
            saidas,
            taxa_evasao: rate(row.taxa_evasao, saidas, total),
            matriculas_especiais: safe_count(especiais),
            comparativo,
        })
    }

    /// Mesma contagem com o ano letivo trocado por `ano - 1`.
    async fn comparativo_anual(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<crate::models::dashboard::ComparativoAnual, AppError> {
        let ano = match filters.ano_letivo {
            Some(ano) => Some(ano),
            None => {
                let clause = build_where_clause(filters, Some(user));
                self.repo.max_ano_letivo(&clause).await?
            }
        };

        let Some(ano) = ano else {
            return Ok(compare_years(None, 0, 0));
        };

        let atual = build_where_clause(&filters.with_ano_letivo(ano), Some(user));
        let anterior = build_where_clause(&filters.with_ano_letivo(ano - 1), Some(user));
        let total_atual = safe_count(self.repo.count_matriculas(&atual).await?);
        let total_anterior = safe_count(self.repo.count_matriculas(&anterior).await?);

        Ok(compare_years(Some(ano), total_atual, total_anterior))
    }

    // 2. Opções dos filtros
    pub async fn get_filtros(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<FiltrosResponse, AppError> {
        let key = generate_cache_key("filtros", filters, Some(user));
        self.cached(key, self.filtros_ttl, || async {
            let clause = build_where_clause(filters, Some(user));
            let mut anos = self.repo.distinct_values(&clause, FilterField::AnoLetivo).await?;
            anos.sort_by(|a, b| b.cmp(a));

            Ok::<_, AppError>(FiltrosResponse {
                anos_letivos: anos,
                escolas: self.repo.list_escolas(&clause).await?,
                grupos_etapa: self.repo.distinct_values(&clause, FilterField::GrupoEtapa).await?,
                etapas_matricula: self
                    .repo
                    .distinct_values(&clause, FilterField::EtapaMatricula)
                    .await?,
                etapas_turma: self.repo.distinct_values(&clause, FilterField::EtapaTurma).await?,
                situacoes_matricula: self
                    .repo
                    .distinct_values(&clause, FilterField::SituacaoMatricula)
                    .await?,
                turnos: self.repo.distinct_values(&clause, FilterField::Turno).await?,
                tipos_matricula: self
                    .repo
                    .distinct_values(&clause, FilterField::TipoMatricula)
                    .await?,
                tipos_transporte: self
                    .repo
                    .distinct_values(&clause, FilterField::TipoTransporte)
                    .await?,
            })
        })
        .await
    }

    async fn breakdown(
        &self,
        clause: &crate::services::filters::WhereClause,
        dimensao: Dimensao,
    ) -> Result<Vec<BreakdownItem>, AppError> {
        let rows = self.repo.breakdown(clause, dimensao).await?;
        Ok(rows
            .into_iter()
            .map(|row| BreakdownItem {
                categoria: row.categoria.unwrap_or_else(|| "NÃO INFORMADO".to_string()),
                total: safe_count(row.total),
            })
            .collect())
    }

    async fn indicadores(
        &self,
        clause: &crate::services::filters::WhereClause,
    ) -> Result<Vec<EscolaIndicadores>, AppError> {
        let rows = self.repo.indicadores_por_escola(clause).await?;
        Ok(rows.into_iter().map(EscolaIndicadores::from).collect())
    }

    // 3. Quebras
    pub async fn get_breakdowns(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<BreakdownsResponse, AppError> {
        let key = generate_cache_key("breakdowns", filters, Some(user));
        self.cached(key, self.ttl, || async {
            let clause = build_where_clause(filters, Some(user));
            Ok::<_, AppError>(BreakdownsResponse {
                por_sexo: self.breakdown(&clause, Dimensao::Sexo).await?,
                por_turno: self.breakdown(&clause, Dimensao::Turno).await?,
                por_situacao: self.breakdown(&clause, Dimensao::SituacaoMatricula).await?,
                por_grupo_etapa: self.breakdown(&clause, Dimensao::GrupoEtapa).await?,
                por_etapa_matricula: self.breakdown(&clause, Dimensao::EtapaMatricula).await?,
                por_deficiencia: self.breakdown(&clause, Dimensao::Deficiencia).await?,
                por_transporte_escolar: self
                    .breakdown(&clause, Dimensao::TransporteEscolar)
                    .await?,
                escolas: self.indicadores(&clause).await?,
            })
        })
        .await
    }

    // 4. Analytics
    pub async fn get_analytics(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<AnalyticsResponse, AppError> {
        let key = generate_cache_key("analytics", filters, Some(user));
        self.cached(key, self.ttl, || async {
            let clause = build_where_clause(filters, Some(user));
            let row = self.repo.get_totais(&clause).await?;
            let total = safe_count(row.total);
            let ativas = safe_count(row.ativas);
            let saidas = safe_count(row.saidas);
            let capacidade = safe_count(row.capacidade);

            let serie_mensal = self
                .repo
                .serie_mensal(&clause)
                .await?
                .into_iter()
                .filter_map(|row| {
                    row.mes.map(|mes| SerieMensal {
                        mes,
                        entradas: safe_count(row.entradas),
                        saidas: safe_count(row.saidas),
                    })
                })
                .collect();

            Ok::<_, AppError>(AnalyticsResponse {
                total_matriculas: total,
                capacidade_total: capacidade,
                entradas: safe_count(row.entradas),
                saidas,
                taxa_ocupacao: rate(row.taxa_ocupacao, ativas, capacidade),
                taxa_evasao: rate(row.taxa_evasao, saidas, total),
                serie_mensal,
                saidas_por_tipo: self.breakdown(&clause, Dimensao::TipoSaida).await?,
                escolas: self.indicadores(&clause).await?,
            })
        })
        .await
    }

    // 5. Alertas
    pub async fn get_alertas(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<AlertasResponse, AppError> {
        let key = generate_cache_key("alertas", filters, Some(user));
        self.cached(key, self.ttl, || async {
            let clause = build_where_clause(filters, Some(user));
            let escolas = self.indicadores(&clause).await?;
            let alertas = build_alertas(&escolas);
            Ok::<_, AppError>(AlertasResponse {
                total: alertas.len(),
                alertas,
            })
        })
        .await
    }

    // 6. Mapa
    pub async fn get_mapa(
        &self,
        filters: &MatriculaFilters,
        user: &AuthUser,
    ) -> Result<MapaResponse, AppError> {
        let key = generate_cache_key("mapa", filters, Some(user));
        self.cached(key, self.ttl, || async {
            let clause = build_where_clause(filters, Some(user));
            let escolas: Vec<EscolaMapa> = self
                .repo
                .escolas_ativas_mapa(&clause)
                .await?
                .into_iter()
                .map(|row| EscolaMapa {
                    idescola: row.idescola,
                    nome: row.nome.unwrap_or_default(),
                    municipio: row.municipio,
                    latitude: safe_f64(row.latitude),
                    longitude: safe_f64(row.longitude),
                    precisa: row.geocode_quality.as_deref() != Some(QUALITY_MUNICIPIO_CENTROID),
                    geocode_source: row.geocode_source,
                    geocode_quality: row.geocode_quality,
                    matriculas_ativas: safe_count(row.ativas),
                })
                .collect();

            Ok::<_, AppError>(MapaResponse {
                total: escolas.len(),
                escolas,
            })
        })
        .await
    }

    pub async fn flush_cache(&self) {
        self.cache.flush().await;
    }
}
