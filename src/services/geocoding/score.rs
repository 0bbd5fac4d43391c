// src/services/geocoding/score.rs

use serde::Deserialize;

use super::query::{normalize, AlvoBusca};

/// Pontuação mínima para aceitar um candidato.
pub const LIMIAR_ACEITE: i32 = 3;

const TIPOS_ESCOLARES: &[&str] = &["school", "college", "university"];
const ADDRESSTYPES_EDUCACIONAIS: &[&str] = &["school", "college", "university", "kindergarten"];

// ---
// Resultado do provedor (formato jsonv2 com addressdetails=1)
// ---
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Candidato {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub addresstype: Option<String>,
    /// `[lat_min, lat_max, lon_min, lon_max]`
    #[serde(default)]
    pub boundingbox: Vec<String>,
    pub address: Option<Endereco>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Endereco {
    pub country_code: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
}

impl Endereco {
    fn municipio(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.municipality.as_deref())
    }
}

impl Candidato {
    pub fn coordenadas(&self) -> Option<(f64, f64)> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lon = self.lon.trim().parse::<f64>().ok()?;
        (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
    }

    /// Nome do lugar; sem `name`, o primeiro trecho de `display_name`.
    fn nome(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => self.display_name.split(',').next().unwrap_or_default().trim(),
        }
    }
}

fn palavras_em_comum(a: &str, b: &str) -> i32 {
    let de_b: Vec<&str> = b.split_whitespace().filter(|w| w.len() > 2).collect();
    let mut vistas: Vec<&str> = Vec::new();
    for w in a.split_whitespace().filter(|w| w.len() > 2) {
        if de_b.contains(&w) && !vistas.contains(&w) {
            vistas.push(w);
        }
    }
    vistas.len() as i32
}

/// Pontuação aditiva de um candidato. Função pura.
pub fn score(alvo: &AlvoBusca, candidato: &Candidato) -> i32 {
    let mut pontos = 0;
    let endereco = candidato.address.clone().unwrap_or_default();

    if endereco.country_code.as_deref().map(normalize).as_deref() == Some("br") {
        pontos += 2;
    }

    if let Some(estado) = alvo.estado.as_deref().map(normalize) {
        match endereco.state.as_deref().map(normalize) {
            Some(s) if s.contains(&estado) => pontos += 3,
            Some(_) => pontos -= 1,
            None => {}
        }
    }

    if let (Some(esperado), Some(achado)) = (
        alvo.municipio.as_deref().map(normalize),
        endereco.municipio().map(normalize),
    ) {
        if esperado == achado {
            pontos += 3;
        } else if !achado.is_empty() && (esperado.contains(&achado) || achado.contains(&esperado)) {
            pontos += 1;
        }
    }

    let kind = candidato.kind.as_deref().map(normalize).unwrap_or_default();
    if TIPOS_ESCOLARES.contains(&kind.as_str()) {
        pontos += 3;
    }
    let category = candidato.category.as_deref().map(normalize).unwrap_or_default();
    let addresstype = candidato.addresstype.as_deref().map(normalize).unwrap_or_default();
    if category == "education" || ADDRESSTYPES_EDUCACIONAIS.contains(&addresstype.as_str()) {
        pontos += 2;
    }

    let nome_alvo = normalize(&alvo.nome);
    let nome_achado = normalize(candidato.nome());
    if !nome_alvo.is_empty() && !nome_achado.is_empty() {
        if nome_alvo.contains(&nome_achado) || nome_achado.contains(&nome_alvo) {
            pontos += 2;
        } else {
            pontos += palavras_em_comum(&nome_alvo, &nome_achado).min(3);
        }
    }

    if category != "amenity" {
        pontos -= 1;
    }

    pontos
}

/// Melhor candidato; empates ficam com o primeiro pontuado.
pub fn melhor<'a>(alvo: &AlvoBusca, candidatos: &'a [Candidato]) -> Option<(&'a Candidato, i32)> {
    let mut melhor: Option<(&Candidato, i32)> = None;
    for candidato in candidatos {
        let pontos = score(alvo, candidato);
        match melhor {
            Some((_, atual)) if atual >= pontos => {}
            _ => melhor = Some((candidato, pontos)),
        }
    }
    melhor
}

pub fn aceito(pontos: i32) -> bool {
    pontos >= LIMIAR_ACEITE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alvo() -> AlvoBusca {
        AlvoBusca {
            nome: "EMEF Rio Branco".into(),
            municipio: Some("Belém".into()),
            estado: Some("Pará".into()),
            endereco: None,
        }
    }

    fn escola_em_belem() -> Candidato {
        Candidato {
            lat: "-1.45".into(),
            lon: "-48.49".into(),
            display_name: "Escola Municipal, Belém, Pará, Brasil".into(),
            name: Some("Escola Municipal".into()),
            category: Some("amenity".into()),
            kind: Some("school".into()),
            addresstype: Some("amenity".into()),
            address: Some(Endereco {
                country_code: Some("br".into()),
                state: Some("Pará".into()),
                city: Some("Belém".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn school_in_the_right_city_is_accepted() {
        let pontos = score(&alvo(), &escola_em_belem());
        assert!(pontos >= 11, "pontos = {pontos}");
        assert!(aceito(pontos));
    }

    #[test]
    fn wrong_state_without_name_overlap_is_rejected() {
        let candidato = Candidato {
            lat: "-23.5".into(),
            lon: "-46.6".into(),
            name: Some("Padaria Central".into()),
            category: Some("shop".into()),
            kind: Some("bakery".into()),
            address: Some(Endereco {
                country_code: Some("us".into()),
                state: Some("São Paulo".into()),
                city: Some("Campinas".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let pontos = score(&alvo(), &candidato);
        assert!(pontos <= 0, "pontos = {pontos}");
        assert!(!aceito(pontos));
    }

    #[test]
    fn name_substring_and_shared_words() {
        let mut c = escola_em_belem();
        c.name = Some("Rio Branco".into());
        let com_substring = score(&alvo(), &c);
        c.name = Some("Colégio Rio Branco Novo".into());
        let com_palavras = score(&alvo(), &c);
        // "rio" e "branco" em comum
        assert_eq!(com_substring, com_palavras);
    }

    #[test]
    fn partial_municipality_scores_less_than_exact() {
        let mut c = escola_em_belem();
        let exata = score(&alvo(), &c);
        c.address.as_mut().unwrap().city = Some("Distrito de Belém".into());
        assert_eq!(score(&alvo(), &c), exata - 2);
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let mut segundo = escola_em_belem();
        segundo.lat = "-1.0".into();
        let candidatos = vec![escola_em_belem(), segundo];
        let (escolhido, _) = melhor(&alvo(), &candidatos).unwrap();
        assert_eq!(escolhido.lat, "-1.45");
    }

    #[test]
    fn higher_score_wins_regardless_of_order() {
        let mut fraco = escola_em_belem();
        fraco.kind = Some("yes".into());
        let candidatos = vec![fraco, escola_em_belem()];
        let (escolhido, pontos) = melhor(&alvo(), &candidatos).unwrap();
        assert_eq!(pontos, score(&alvo(), &escola_em_belem()));
        assert_eq!(escolhido.kind.as_deref(), Some("school"));
    }

    #[test]
    fn parses_coordinates() {
        assert_eq!(escola_em_belem().coordenadas(), Some((-1.45, -48.49)));
        let mut c = escola_em_belem();
        c.lat = "abc".into();
        assert_eq!(c.coordenadas(), None);
    }

    #[test]
    fn deserializes_provider_payload() {
        let raw = r#"[{"lat":"-1.4","lon":"-48.4","display_name":"X, Belém","category":"amenity",
            "type":"school","addresstype":"amenity","boundingbox":["-1.5","-1.3","-48.5","-48.3"],
            "address":{"country_code":"br","state":"Pará","town":"Belém"}}]"#;
        let parsed: Vec<Candidato> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed[0].kind.as_deref(), Some("school"));
        assert_eq!(parsed[0].boundingbox.len(), 4);
    }
}
