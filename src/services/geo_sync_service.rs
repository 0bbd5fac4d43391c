// src/services/geo_sync_service.rs

use std::collections::HashMap;

use crate::{
    common::error::AppError,
    db::{EscolasGeoRepository, TenantRepository},
    models::geo::{ClienteLocal, EscolaGeo, EscolaGeoUpsert, EscolaOrigem, SyncSummary, UpsertOutcome},
};

#[derive(Clone)]
pub struct GeoSyncService {
    geo_repo: EscolasGeoRepository,
    tenant_repo: TenantRepository,
}

/// Upserts planejados para as escolas de origem, com o desfecho de cada um.
pub fn planejar(
    local: &ClienteLocal,
    origem: &[EscolaOrigem],
    existentes: &HashMap<i32, EscolaGeo>,
) -> Vec<(EscolaGeoUpsert, UpsertOutcome)> {
    origem
        .iter()
        .map(|escola| {
            let upsert = EscolaGeoUpsert {
                idcliente: local.idcliente,
                idescola: escola.idescola,
                nome: escola.nome.clone(),
                municipio: local.municipio.clone(),
                uf: Some(local.uf.clone()),
            };
            let outcome = upsert.outcome(existentes.get(&escola.idescola));
            (upsert, outcome)
        })
        .collect()
}

fn resumir(idcliente: i32, plano: &[(EscolaGeoUpsert, UpsertOutcome)], dry_run: bool) -> SyncSummary {
    let contar = |alvo: UpsertOutcome| plano.iter().filter(|(_, o)| *o == alvo).count();
    SyncSummary {
        idcliente,
        escolas_encontradas: plano.len(),
        inseridas: contar(UpsertOutcome::Inserted),
        atualizadas: contar(UpsertOutcome::Updated),
        inalteradas: contar(UpsertOutcome::Unchanged),
        dry_run,
    }
}

impl GeoSyncService {
    pub fn new(geo_repo: EscolasGeoRepository, tenant_repo: TenantRepository) -> Self {
        Self {
            geo_repo,
            tenant_repo,
        }
    }

    /// Copia as escolas distintas de `dados_matriculas` para `escolas_geo`.
    pub async fn sync(&self, idcliente: i32, dry_run: bool) -> Result<SyncSummary, AppError> {
        let local = self
            .tenant_repo
            .find_localizacao(idcliente)
            .await?
            .ok_or(AppError::ClienteNotFound(idcliente))?;

        let origem = self.geo_repo.list_escolas_origem(idcliente).await?;
        let existentes: HashMap<i32, EscolaGeo> = self
            .geo_repo
            .list_by_cliente(idcliente)
            .await?
            .into_iter()
            .map(|e| (e.idescola, e))
            .collect();

        let plano = planejar(&local, &origem, &existentes);
        tracing::info!(
            "Cliente {}: {} escolas na origem, {} já mapeadas",
            idcliente,
            origem.len(),
            existentes.len()
        );

        if !dry_run {
            for (upsert, outcome) in &plano {
                if *outcome == UpsertOutcome::Unchanged {
                    continue;
                }
                self.geo_repo.upsert(upsert).await?;
            }
        }

        Ok(resumir(idcliente, &plano, dry_run))
    }
}
