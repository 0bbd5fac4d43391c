// src/services/geocoding/matcher.rs

use super::{
    client::{GeocodeError, NominatimClient, Viewbox},
    query::{municipio_query, AlvoBusca},
    score::{aceito, melhor, Candidato},
};
use crate::models::geo::{
    ClienteLocal, EscolaGeo, FallbackPolicy, GeoCoordenada, GeocodeMode, GEOCODE_SOURCE,
    GEOCODE_SOURCE_MUNICIPIO, QUALITY_MUNICIPIO_CENTROID,
};

const LIMITE_CANDIDATOS: u8 = 5;

/// Centro do município, resolvido uma vez por lote.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroMunicipio {
    pub latitude: f64,
    pub longitude: f64,
    pub viewbox: Option<Viewbox>,
}

impl CentroMunicipio {
    fn como_coordenada(&self) -> GeoCoordenada {
        GeoCoordenada {
            latitude: self.latitude,
            longitude: self.longitude,
            source: GEOCODE_SOURCE_MUNICIPIO.to_string(),
            quality: QUALITY_MUNICIPIO_CENTROID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Encontrada(GeoCoordenada),
    Aproximada(GeoCoordenada),
    /// Houve candidatos, nenhum acima do limiar.
    BaixaConfianca { melhor_pontuacao: i32 },
    SemResultado,
}

impl MatchOutcome {
    pub fn coordenada(&self) -> Option<&GeoCoordenada> {
        match self {
            MatchOutcome::Encontrada(c) | MatchOutcome::Aproximada(c) => Some(c),
            _ => None,
        }
    }
}

fn coordenada_de(candidato: &Candidato, quality: String) -> Option<GeoCoordenada> {
    let (latitude, longitude) = candidato.coordenadas()?;
    Some(GeoCoordenada {
        latitude,
        longitude,
        source: GEOCODE_SOURCE.to_string(),
        quality,
    })
}

pub struct GeocodeMatcher {
    client: NominatimClient,
    mode: GeocodeMode,
    fallback: FallbackPolicy,
}

impl GeocodeMatcher {
    pub fn new(client: NominatimClient, mode: GeocodeMode, fallback: FallbackPolicy) -> Self {
        Self {
            client,
            mode,
            fallback,
        }
    }

    pub async fn resolve_municipio(
        &self,
        local: &ClienteLocal,
    ) -> Result<Option<CentroMunicipio>, GeocodeError> {
        let Some(q) = municipio_query(local) else {
            return Ok(None);
        };
        let resultados = self.client.search(&q, 1, None).await?;
        Ok(resultados.first().and_then(|c| {
            let (latitude, longitude) = c.coordenadas()?;
            Some(CentroMunicipio {
                latitude,
                longitude,
                viewbox: Viewbox::from_boundingbox(&c.boundingbox),
            })
        }))
    }

    /// Tenta as buscas em ordem; o fallback só entra se nada for aceito.
    pub async fn geocode_escola(
        &self,
        escola: &EscolaGeo,
        local: &ClienteLocal,
        centro: Option<&CentroMunicipio>,
    ) -> Result<MatchOutcome, GeocodeError> {
        let alvo = AlvoBusca::new(escola, local);
        let viewbox = centro.and_then(|c| c.viewbox.as_ref());
        let mut melhor_rejeitado: Option<i32> = None;

        for q in alvo.queries(self.mode) {
            match self.mode {
                GeocodeMode::Addr => {
                    let resultados = self.client.search(&q, 1, viewbox).await?;
                    if let Some(c) = resultados.first().and_then(|c| coordenada_de(c, "addr".into())) {
                        return Ok(MatchOutcome::Encontrada(c));
                    }
                }
                GeocodeMode::Noaddr => {
                    let resultados = self.client.search(&q, LIMITE_CANDIDATOS, viewbox).await?;
                    if let Some((candidato, pontos)) = melhor(&alvo, &resultados) {
                        if aceito(pontos) {
                            if let Some(c) = coordenada_de(candidato, format!("score:{pontos}")) {
                                return Ok(MatchOutcome::Encontrada(c));
                            }
                        }
                        tracing::debug!("Escola {}: melhor pontuação {} para {:?}", escola.idescola, pontos, q);
                        melhor_rejeitado = Some(melhor_rejeitado.map_or(pontos, |p| p.max(pontos)));
                    }
                }
            }
        }

        if self.fallback == FallbackPolicy::Municipio {
            if let Some(centro) = centro {
                return Ok(MatchOutcome::Aproximada(centro.como_coordenada()));
            }
        }

        Ok(match melhor_rejeitado {
            Some(melhor_pontuacao) => MatchOutcome::BaixaConfianca { melhor_pontuacao },
            None => MatchOutcome::SemResultado,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderConfig;
    use axum::{
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    // ---
    // Provedor local: respostas fixas por `q`, registra cada chamada
    // ---
    struct Provedor {
        respostas: HashMap<String, Value>,
        padrao: Value,
        indisponivel: bool,
        recebidas: Mutex<Vec<HashMap<String, String>>>,
    }

    impl Provedor {
        fn novo(padrao: Value) -> Self {
            Self {
                respostas: HashMap::new(),
                padrao,
                indisponivel: false,
                recebidas: Mutex::new(Vec::new()),
            }
        }

        fn com(mut self, q: &str, resposta: Value) -> Self {
            self.respostas.insert(q.to_string(), resposta);
            self
        }

        fn buscas(&self) -> Vec<String> {
            self.recebidas
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.get("q").cloned().unwrap_or_default())
                .collect()
        }

        fn parametro(&self, indice: usize, nome: &str) -> Option<String> {
            self.recebidas.lock().unwrap()[indice].get(nome).cloned()
        }
    }

    async fn search(
        State(provedor): State<Arc<Provedor>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        provedor.recebidas.lock().unwrap().push(params.clone());
        if provedor.indisponivel {
            return (StatusCode::SERVICE_UNAVAILABLE, "sobrecarregado").into_response();
        }
        let q = params.get("q").cloned().unwrap_or_default();
        let resposta = provedor
            .respostas
            .get(&q)
            .cloned()
            .unwrap_or_else(|| provedor.padrao.clone());
        Json(resposta).into_response()
    }

    async fn iniciar(provedor: Provedor) -> (NominatimClient, Arc<Provedor>) {
        let provedor = Arc::new(provedor);
        let app = Router::new()
            .route("/search", get(search))
            .with_state(provedor.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = GeocoderConfig {
            base_url: format!("http://{addr}/search"),
            user_agent: "teste/1.0".into(),
            email: None,
            delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };
        (NominatimClient::new(&config).unwrap(), provedor)
    }

    fn local() -> ClienteLocal {
        ClienteLocal {
            idcliente: 1,
            municipio: Some("Belém".into()),
            uf: "PA".into(),
        }
    }

    fn escola() -> EscolaGeo {
        EscolaGeo {
            idcliente: 1,
            idescola: 10,
            nome: Some("EMEF José Alves".into()),
            ..Default::default()
        }
    }

    fn escola_com_endereco() -> EscolaGeo {
        EscolaGeo {
            logradouro: Some("Rua A".into()),
            numero: Some("10".into()),
            bairro: Some("Centro".into()),
            ..escola()
        }
    }

    /// Pontua 15: país, estado, cidade, tipo, addresstype e nome batem.
    fn escola_certa() -> Value {
        json!({
            "lat": "-1.4500", "lon": "-48.4900",
            "display_name": "EMEF José Alves, Belém, Pará, Brasil",
            "name": "EMEF José Alves",
            "category": "amenity", "type": "school", "addresstype": "school",
            "address": { "country_code": "br", "state": "Pará", "city": "Belém" }
        })
    }

    /// Pontua -1: nada bate e a categoria não é `amenity`.
    fn rua_qualquer() -> Value {
        json!({
            "lat": "-1.1000", "lon": "-48.1000",
            "display_name": "Rua Qualquer",
            "name": "Rua Qualquer",
            "category": "highway", "type": "residential"
        })
    }

    fn centro() -> CentroMunicipio {
        CentroMunicipio {
            latitude: -1.4558,
            longitude: -48.5044,
            viewbox: Some(Viewbox {
                lon_min: -48.6,
                lat_min: -1.5,
                lon_max: -48.3,
                lat_max: -1.3,
            }),
        }
    }

    #[tokio::test]
    async fn noaddr_stops_at_first_accepted_query() {
        let provedor = Provedor::novo(json!([rua_qualquer()]))
            .com("Escola EMEF José Alves, Belém, Pará", json!([rua_qualquer(), escola_certa()]));
        let (client, provedor) = iniciar(provedor).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::None);

        let outcome = matcher.geocode_escola(&escola(), &local(), None).await.unwrap();
        let MatchOutcome::Encontrada(c) = outcome else {
            panic!("esperava correspondência, veio {outcome:?}");
        };
        assert_eq!(c.latitude, -1.45);
        assert_eq!(c.quality, "score:15");
        assert_eq!(c.source, GEOCODE_SOURCE);

        assert_eq!(
            provedor.buscas(),
            vec![
                "EMEF José Alves, Belém, Pará".to_string(),
                "Escola EMEF José Alves, Belém, Pará".to_string(),
            ]
        );
        assert_eq!(provedor.parametro(0, "limit").as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn noaddr_reports_low_confidence_after_every_query() {
        let (client, provedor) = iniciar(Provedor::novo(json!([rua_qualquer()]))).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::None);

        let outcome = matcher
            .geocode_escola(&escola(), &local(), Some(&centro()))
            .await
            .unwrap();
        assert_eq!(outcome, MatchOutcome::BaixaConfianca { melhor_pontuacao: -1 });
        assert_eq!(provedor.buscas().len(), 4);
    }

    #[tokio::test]
    async fn municipio_fallback_only_after_all_queries_fail() {
        let (client, provedor) = iniciar(Provedor::novo(json!([]))).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::Municipio);

        let outcome = matcher
            .geocode_escola(&escola(), &local(), Some(&centro()))
            .await
            .unwrap();
        let MatchOutcome::Aproximada(c) = outcome else {
            panic!("esperava o centro do município, veio {outcome:?}");
        };
        assert_eq!(c.latitude, -1.4558);
        assert_eq!(c.quality, QUALITY_MUNICIPIO_CENTROID);
        assert_eq!(provedor.buscas().len(), 4);
        assert_eq!(provedor.parametro(0, "bounded").as_deref(), Some("1"));
        assert_eq!(
            provedor.parametro(0, "viewbox").as_deref(),
            Some("-48.6,-1.3,-48.3,-1.5")
        );
    }

    #[tokio::test]
    async fn fallback_without_centroid_is_no_result() {
        let (client, _) = iniciar(Provedor::novo(json!([]))).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::Municipio);

        let outcome = matcher.geocode_escola(&escola(), &local(), None).await.unwrap();
        assert_eq!(outcome, MatchOutcome::SemResultado);
    }

    #[tokio::test]
    async fn addr_mode_takes_the_first_hit() {
        let provedor = Provedor::novo(json!([escola_certa()]))
            .com("Rua A 10, Centro, Belém, Pará", json!([rua_qualquer(), escola_certa()]));
        let (client, provedor) = iniciar(provedor).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Addr, FallbackPolicy::None);

        let outcome = matcher
            .geocode_escola(&escola_com_endereco(), &local(), None)
            .await
            .unwrap();
        let MatchOutcome::Encontrada(c) = outcome else {
            panic!("esperava correspondência, veio {outcome:?}");
        };
        assert_eq!(c.latitude, -1.1);
        assert_eq!(c.quality, "addr");
        assert_eq!(provedor.buscas(), vec!["Rua A 10, Centro, Belém, Pará".to_string()]);
        assert_eq!(provedor.parametro(0, "limit").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn addr_mode_moves_on_when_address_finds_nothing() {
        let provedor = Provedor::novo(json!([escola_certa()]))
            .com("Rua A 10, Centro, Belém, Pará", json!([]));
        let (client, provedor) = iniciar(provedor).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Addr, FallbackPolicy::None);

        let outcome = matcher
            .geocode_escola(&escola_com_endereco(), &local(), None)
            .await
            .unwrap();
        assert_eq!(outcome.coordenada().map(|c| c.latitude), Some(-1.45));
        assert_eq!(provedor.buscas()[1], "EMEF José Alves, Belém, Pará");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut provedor = Provedor::novo(json!([]));
        provedor.indisponivel = true;
        let (client, _) = iniciar(provedor).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::Municipio);

        let err = matcher
            .geocode_escola(&escola(), &local(), Some(&centro()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::Status { status: 503, ref body } if body == "sobrecarregado"
        ));
    }

    #[tokio::test]
    async fn municipio_center_carries_its_viewbox() {
        let provedor = Provedor::novo(json!([])).com(
            "Belém, Pará, Brasil",
            json!([{
                "lat": "-1.4558", "lon": "-48.5044",
                "display_name": "Belém, Pará, Brasil",
                "boundingbox": ["-1.5", "-1.3", "-48.6", "-48.3"]
            }]),
        );
        let (client, provedor) = iniciar(provedor).await;
        let matcher = GeocodeMatcher::new(client, GeocodeMode::Noaddr, FallbackPolicy::Municipio);

        let centro = matcher.resolve_municipio(&local()).await.unwrap().unwrap();
        assert_eq!(centro, self::centro());
        assert_eq!(provedor.parametro(0, "limit").as_deref(), Some("1"));
    }

    #[test]
    fn centroid_is_tagged_as_approximate() {
        let centro = CentroMunicipio {
            latitude: -1.45,
            longitude: -48.5,
            viewbox: None,
        };
        let c = centro.como_coordenada();
        assert!(c.is_aproximada());
        assert_eq!(c.source, GEOCODE_SOURCE_MUNICIPIO);
        assert_eq!(
            MatchOutcome::Aproximada(c.clone()).coordenada(),
            Some(&c)
        );
        assert_eq!(MatchOutcome::SemResultado.coordenada(), None);
    }

    #[test]
    fn precise_match_keeps_score_in_quality() {
        let candidato = Candidato {
            lat: "-1.4".into(),
            lon: "-48.4".into(),
            ..Default::default()
        };
        let c = coordenada_de(&candidato, "score:11".into()).unwrap();
        assert_eq!(c.source, GEOCODE_SOURCE);
        assert!(!c.is_aproximada());
    }
}
