// src/services/geocode_service.rs

use crate::{
    common::error::AppError,
    config::GeocoderConfig,
    db::{EscolasGeoRepository, TenantRepository},
    models::geo::{FallbackPolicy, GeocodeMode, GeocodeSummary},
    services::geocoding::{GeocodeMatcher, MatchOutcome, NominatimClient},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocodeOptions {
    pub idcliente: i32,
    pub limit: Option<i64>,
    pub mode: GeocodeMode,
    pub fallback: FallbackPolicy,
    pub dry_run: bool,
}

#[derive(Clone)]
pub struct GeocodeService {
    geo_repo: EscolasGeoRepository,
    tenant_repo: TenantRepository,
    config: GeocoderConfig,
}

impl GeocodeSummary {
    fn registrar(&mut self, outcome: &MatchOutcome) {
        self.processadas += 1;
        match outcome {
            MatchOutcome::Encontrada(_) => self.encontradas += 1,
            MatchOutcome::Aproximada(_) => self.aproximadas += 1,
            MatchOutcome::BaixaConfianca { .. } | MatchOutcome::SemResultado => {
                self.baixa_confianca += 1
            }
        }
    }

    fn registrar_falha(&mut self) {
        self.processadas += 1;
        self.falhas += 1;
    }
}

impl GeocodeService {
    pub fn new(
        geo_repo: EscolasGeoRepository,
        tenant_repo: TenantRepository,
        config: GeocoderConfig,
    ) -> Self {
        Self {
            geo_repo,
            tenant_repo,
            config,
        }
    }

    /// Geocodifica, em sequência, as escolas do cliente ainda sem coordenadas.
    /// Falhas por escola são contadas e o lote segue.
    pub async fn run(&self, options: GeocodeOptions) -> Result<GeocodeSummary, AppError> {
        let local = self
            .tenant_repo
            .find_localizacao(options.idcliente)
            .await?
            .ok_or(AppError::ClienteNotFound(options.idcliente))?;

        let pendentes = self
            .geo_repo
            .list_pendentes(options.idcliente, options.limit)
            .await?;

        let matcher = GeocodeMatcher::new(
            NominatimClient::new(&self.config)?,
            options.mode,
            options.fallback,
        );

        let mut summary = GeocodeSummary {
            idcliente: options.idcliente,
            mode: options.mode,
            dry_run: options.dry_run,
            ..Default::default()
        };

        if pendentes.is_empty() {
            tracing::info!("Cliente {}: nenhuma escola pendente", options.idcliente);
            return Ok(summary);
        }

        let centro = match matcher.resolve_municipio(&local).await {
            Ok(centro) => centro,
            Err(e) => {
                tracing::warn!("Centro do município indisponível: {}", e);
                None
            }
        };

        tracing::info!(
            "Cliente {}: {} escolas pendentes (modo {}, fallback {})",
            options.idcliente,
            pendentes.len(),
            options.mode.as_str(),
            options.fallback.as_str()
        );

        for escola in &pendentes {
            let outcome = match matcher.geocode_escola(escola, &local, centro.as_ref()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Escola {}: {}", escola.idescola, e);
                    summary.registrar_falha();
                    continue;
                }
            };

            if let Some(coordenada) = outcome.coordenada() {
                if !options.dry_run {
                    if let Err(e) = self
                        .geo_repo
                        .update_coordenadas(escola.idcliente, escola.idescola, coordenada)
                        .await
                    {
                        tracing::warn!("Escola {}: falha ao gravar coordenadas: {}", escola.idescola, e);
                        summary.registrar_falha();
                        continue;
                    }
                }
                tracing::info!(
                    "Escola {} -> ({}, {}) [{}]",
                    escola.idescola,
                    coordenada.latitude,
                    coordenada.longitude,
                    coordenada.quality
                );
            } else {
                tracing::info!("Escola {}: sem correspondência confiável", escola.idescola);
            }
            summary.registrar(&outcome);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geo::GeoCoordenada;

    fn coordenada(quality: &str) -> GeoCoordenada {
        GeoCoordenada {
            latitude: -5.3,
            longitude: -49.1,
            source: "nominatim".into(),
            quality: quality.into(),
        }
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut summary = GeocodeSummary::default();
        summary.registrar(&MatchOutcome::Encontrada(coordenada("score:11")));
        summary.registrar(&MatchOutcome::Aproximada(coordenada("municipio_centroid")));
        summary.registrar(&MatchOutcome::BaixaConfianca { melhor_pontuacao: 2 });
        summary.registrar(&MatchOutcome::SemResultado);
        summary.registrar_falha();

        assert_eq!(summary.processadas, 5);
        assert_eq!(summary.encontradas, 1);
        assert_eq!(summary.aproximadas, 1);
        assert_eq!(summary.baixa_confianca, 2);
        assert_eq!(summary.falhas, 1);
    }
}
