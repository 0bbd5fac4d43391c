// src/services/geocoding/client.rs

use reqwest::Client;
use thiserror::Error;

use super::{pacer::RequestPacer, score::Candidato};
use crate::config::GeocoderConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Falha na requisição ao geocodificador: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocodificador respondeu {status}: {body}")]
    Status { status: u16, body: String },
}

/// Caixa de busca no formato do provedor (`lon_min,lat_max,lon_max,lat_min`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewbox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl Viewbox {
    /// A partir do `boundingbox` do provedor: `[lat_min, lat_max, lon_min, lon_max]`.
    pub fn from_boundingbox(bbox: &[String]) -> Option<Self> {
        let valores: Vec<f64> = bbox
            .iter()
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match valores[..] {
            [lat_min, lat_max, lon_min, lon_max] => Some(Self {
                lon_min,
                lat_min,
                lon_max,
                lat_max,
            }),
            _ => None,
        }
    }

    pub fn as_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.lon_min, self.lat_max, self.lon_max, self.lat_min
        )
    }
}

/// Cliente do endpoint `/search` (compatível com Nominatim).
pub struct NominatimClient {
    http: Client,
    base_url: String,
    email: Option<String>,
    pacer: RequestPacer,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            email: config.email.clone(),
            pacer: RequestPacer::new(config.delay),
        })
    }

    pub(crate) fn search_params(
        &self,
        q: &str,
        limit: u8,
        viewbox: Option<&Viewbox>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", q.to_string()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
            ("countrycodes", "br".to_string()),
        ];
        if let Some(vb) = viewbox {
            params.push(("viewbox", vb.as_param()));
            params.push(("bounded", "1".to_string()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// Uma busca; respeita a cadência antes de sair para a rede.
    pub async fn search(
        &self,
        q: &str,
        limit: u8,
        viewbox: Option<&Viewbox>,
    ) -> Result<Vec<Candidato>, GeocodeError> {
        self.pacer.wait().await;
        tracing::debug!("geocode q={:?} limit={}", q, limit);

        let response = self
            .http
            .get(&self.base_url)
            .query(&self.search_params(q, limit, viewbox))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.json::<Vec<Candidato>>().await?)
    }
}
