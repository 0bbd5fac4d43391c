// src/services/geocoding/query.rs

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::models::geo::{ClienteLocal, EscolaGeo, GeocodeMode};

/// Remove acentos (NFD + descarte das marcas combinantes).
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Forma usada nas comparações: sem acento, minúscula, espaços colapsados.
pub fn normalize(text: &str) -> String {
    strip_diacritics(text)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Nome do estado a partir da sigla.
pub fn estado_nome(uf: &str) -> Option<&'static str> {
    let nome = match uf.trim().to_uppercase().as_str() {
        "AC" => "Acre",
        "AL" => "Alagoas",
        "AP" => "Amapá",
        "AM" => "Amazonas",
        "BA" => "Bahia",
        "CE" => "Ceará",
        "DF" => "Distrito Federal",
        "ES" => "Espírito Santo",
        "GO" => "Goiás",
        "MA" => "Maranhão",
        "MT" => "Mato Grosso",
        "MS" => "Mato Grosso do Sul",
        "MG" => "Minas Gerais",
        "PA" => "Pará",
        "PB" => "Paraíba",
        "PR" => "Paraná",
        "PE" => "Pernambuco",
        "PI" => "Piauí",
        "RJ" => "Rio de Janeiro",
        "RN" => "Rio Grande do Norte",
        "RS" => "Rio Grande do Sul",
        "RO" => "Rondônia",
        "RR" => "Roraima",
        "SC" => "Santa Catarina",
        "SP" => "São Paulo",
        "SE" => "Sergipe",
        "TO" => "Tocantins",
        _ => return None,
    };
    Some(nome)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn join_parts(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .filter_map(|p| non_empty(*p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// O que se sabe da escola na hora de montar as buscas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlvoBusca {
    pub nome: String,
    pub municipio: Option<String>,
    /// Nome por extenso (ou a própria sigla, se desconhecida).
    pub estado: Option<String>,
    pub endereco: Option<String>,
}

impl AlvoBusca {
    pub fn new(escola: &EscolaGeo, local: &ClienteLocal) -> Self {
        let municipio = non_empty(escola.municipio.as_deref())
            .or(non_empty(local.municipio.as_deref()))
            .map(str::to_string);
        let uf = non_empty(escola.uf.as_deref()).unwrap_or(&local.uf);
        let estado = non_empty(Some(uf)).map(|uf| estado_nome(uf).map_or(uf, |n| n).to_string());

        let endereco = if escola.has_address() {
            let rua = [escola.logradouro.as_deref(), escola.numero.as_deref()]
                .into_iter()
                .filter_map(non_empty)
                .collect::<Vec<_>>()
                .join(" ");
            Some(join_parts(&[
                Some(rua.as_str()),
                escola.bairro.as_deref(),
                municipio.as_deref(),
                estado.as_deref(),
                escola.cep.as_deref(),
            ]))
        } else {
            None
        };

        Self {
            nome: escola.nome.as_deref().unwrap_or_default().trim().to_string(),
            municipio,
            estado,
            endereco,
        }
    }

    /// Buscas em ordem de especificidade decrescente, sem repetição.
    pub fn queries(&self, mode: GeocodeMode) -> Vec<String> {
        let nome = self.nome.as_str();
        let municipio = self.municipio.as_deref();
        let estado = self.estado.as_deref();

        let com_palavra_escola = if normalize(nome).contains("escola") {
            nome.to_string()
        } else {
            format!("Escola {nome}")
        };

        let completa = join_parts(&[Some(nome), municipio, estado]);
        let mut candidatas = Vec::new();
        if mode == GeocodeMode::Addr {
            if let Some(endereco) = &self.endereco {
                candidatas.push(endereco.clone());
            }
        }
        candidatas.push(completa.clone());
        candidatas.push(join_parts(&[Some(com_palavra_escola.as_str()), municipio, estado]));
        candidatas.push(join_parts(&[Some(nome), municipio]));
        candidatas.push(strip_diacritics(&completa));

        let mut vistas = Vec::with_capacity(candidatas.len());
        for q in candidatas {
            if !q.is_empty() && !vistas.contains(&q) {
                vistas.push(q);
            }
        }
        vistas
    }
}

/// Busca do centro do município.
pub fn municipio_query(local: &ClienteLocal) -> Option<String> {
    let municipio = non_empty(local.municipio.as_deref())?;
    let estado = estado_nome(&local.uf).map_or(local.uf.as_str(), |n| n);
    Some(join_parts(&[Some(municipio), Some(estado), Some("Brasil")]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> ClienteLocal {
        ClienteLocal {
            idcliente: 1,
            municipio: Some("Belém".into()),
            uf: "PA".into(),
        }
    }

    fn escola(nome: &str) -> EscolaGeo {
        EscolaGeo {
            idcliente: 1,
            idescola: 10,
            nome: Some(nome.into()),
            ..Default::default()
        }
    }

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(normalize("  São  João do Araguaia "), "sao joao do araguaia");
        assert_eq!(strip_diacritics("Pará"), "Para");
    }

    #[test]
    fn relaxes_in_order() {
        let alvo = AlvoBusca::new(&escola("EMEF José Alves"), &local());
        assert_eq!(
            alvo.queries(GeocodeMode::Noaddr),
            vec![
                "EMEF José Alves, Belém, Pará".to_string(),
                "Escola EMEF José Alves, Belém, Pará".to_string(),
                "EMEF José Alves, Belém".to_string(),
                "EMEF Jose Alves, Belem, Para".to_string(),
            ]
        );
    }

    #[test]
    fn duplicates_are_removed() {
        let alvo = AlvoBusca::new(&escola("Escola Bosque"), &local());
        let queries = alvo.queries(GeocodeMode::Noaddr);
        assert_eq!(queries[0], "Escola Bosque, Belém, Pará");
        assert_eq!(queries.len(), 3);
    }

    #[test]
    fn addr_mode_starts_with_street() {
        let mut e = escola("EMEF Rio Branco");
        e.logradouro = Some("Av. Nazaré".into());
        e.numero = Some("100".into());
        e.bairro = Some("Nazaré".into());
        let alvo = AlvoBusca::new(&e, &local());
        let queries = alvo.queries(GeocodeMode::Addr);
        assert_eq!(queries[0], "Av. Nazaré 100, Nazaré, Belém, Pará");
        assert_eq!(alvo.queries(GeocodeMode::Noaddr)[0], "EMEF Rio Branco, Belém, Pará");
    }

    #[test]
    fn unknown_uf_is_kept_as_is() {
        let mut l = local();
        l.uf = "XX".into();
        let alvo = AlvoBusca::new(&escola("A"), &l);
        assert_eq!(alvo.estado.as_deref(), Some("XX"));
        assert_eq!(municipio_query(&l).as_deref(), Some("Belém, XX, Brasil"));
    }
}
