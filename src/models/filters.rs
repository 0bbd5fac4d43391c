// src/models/filters.rs

use std::fmt;

use serde::{de, Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};

// ---
// 1. SqlParam (valor vinculado a um placeholder `$n`)
// ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i32),
    Bool(bool),
    Text(String),
    IntList(Vec<i32>),
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Int(v) => write!(f, "{v}"),
            SqlParam::Bool(v) => write!(f, "{v}"),
            SqlParam::Text(v) => f.write_str(v),
            SqlParam::IntList(v) => {
                let joined: Vec<String> = v.iter().map(|id| id.to_string()).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

// ---
// 2. FilterField (a lista fechada de dimensões filtráveis)
// ---
/// Cada variante mapeia para exatamente uma coluna de `dados_matriculas`.
/// Nenhum nome de coluna vem da requisição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    AnoLetivo,
    Deficiencia,
    GrupoEtapa,
    EtapaMatricula,
    EtapaTurma,
    SituacaoMatricula,
    Turno,
    TipoMatricula,
    TipoTransporte,
    TransporteEscolar,
    Idescola,
    Idcliente,
}

impl FilterField {
    pub const fn column(self) -> &'static str {
        match self {
            FilterField::AnoLetivo => "ano_letivo",
            FilterField::Deficiencia => "deficiencia",
            FilterField::GrupoEtapa => "grupo_etapa",
            FilterField::EtapaMatricula => "etapa_matricula",
            FilterField::EtapaTurma => "etapa_turma",
            FilterField::SituacaoMatricula => "situacao_matricula",
            FilterField::Turno => "turno",
            FilterField::TipoMatricula => "tipo_matricula",
            FilterField::TipoTransporte => "tipo_transporte",
            FilterField::TransporteEscolar => "transporte_escolar",
            FilterField::Idescola => "idescola",
            FilterField::Idcliente => "idcliente",
        }
    }

    /// Nome do filtro no JSON da requisição.
    pub const fn key(self) -> &'static str {
        match self {
            FilterField::AnoLetivo => "anoLetivo",
            FilterField::Deficiencia => "deficiencia",
            FilterField::GrupoEtapa => "grupoEtapa",
            FilterField::EtapaMatricula => "etapaMatricula",
            FilterField::EtapaTurma => "etapaTurma",
            FilterField::SituacaoMatricula => "situacaoMatricula",
            FilterField::Turno => "turno",
            FilterField::TipoMatricula => "tipoMatricula",
            FilterField::TipoTransporte => "tipoTransporte",
            FilterField::TransporteEscolar => "transporteEscolar",
            FilterField::Idescola => "idescola",
            FilterField::Idcliente => "idcliente",
        }
    }
}

// ---
// 3. MatriculaFilters (o corpo enviado pelo painel)
// ---
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MatriculaFilters {
    #[serde(default, deserialize_with = "lenient::int")]
    #[schema(example = 2024)]
    pub ano_letivo: Option<i32>,

    #[serde(default, deserialize_with = "lenient::boolean")]
    pub deficiencia: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text")]
    #[schema(example = "ENSINO FUNDAMENTAL")]
    pub grupo_etapa: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub etapa_matricula: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub etapa_turma: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    #[schema(example = "ATIVO")]
    pub situacao_matricula: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    #[schema(example = "MATUTINO")]
    pub turno: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub tipo_matricula: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub tipo_transporte: Option<String>,

    #[serde(default, deserialize_with = "lenient::boolean")]
    pub transporte_escolar: Option<bool>,

    #[serde(default, deserialize_with = "lenient::int")]
    pub idescola: Option<i32>,

    #[serde(default, deserialize_with = "lenient::int")]
    pub idcliente: Option<i32>,
}

impl MatriculaFilters {
    /// Filtros preenchidos, exceto o de cliente (tratado pelo escopo do tenant).
    pub fn values(&self) -> Vec<(FilterField, SqlParam)> {
        let mut out = Vec::new();
        let mut int = |field, v: Option<i32>| {
            if let Some(v) = v {
                out.push((field, SqlParam::Int(v)));
            }
        };
        int(FilterField::AnoLetivo, self.ano_letivo);
        int(FilterField::Idescola, self.idescola);

        for (field, v) in [
            (FilterField::Deficiencia, self.deficiencia),
            (FilterField::TransporteEscolar, self.transporte_escolar),
        ] {
            if let Some(v) = v {
                out.push((field, SqlParam::Bool(v)));
            }
        }

        for (field, v) in [
            (FilterField::GrupoEtapa, &self.grupo_etapa),
            (FilterField::EtapaMatricula, &self.etapa_matricula),
            (FilterField::EtapaTurma, &self.etapa_turma),
            (FilterField::SituacaoMatricula, &self.situacao_matricula),
            (FilterField::Turno, &self.turno),
            (FilterField::TipoMatricula, &self.tipo_matricula),
            (FilterField::TipoTransporte, &self.tipo_transporte),
        ] {
            if let Some(v) = v {
                out.push((field, SqlParam::Text(v.clone())));
            }
        }
        out
    }

    /// Cópia com o ano letivo trocado (comparativo ano a ano).
    pub fn with_ano_letivo(&self, ano: i32) -> Self {
        Self {
            ano_letivo: Some(ano),
            ..self.clone()
        }
    }
}

// ---
// 4. Desserialização tolerante
// ---
/// O painel envia `""` para "sem filtro" e às vezes números como texto.
pub(crate) mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(match Option::<Raw>::deserialize(d)? {
            None => None,
            Some(Raw::Int(v)) => Some(i32::try_from(v).map_err(de::Error::custom)?),
            Some(Raw::Float(v)) if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => {
                Some(v as i32)
            }
            Some(Raw::Text(s)) => match s.trim() {
                "" => None,
                t => Some(t.parse::<i32>().map_err(|_| {
                    de::Error::custom(format!("valor numérico inválido: {t}"))
                })?),
            },
            Some(_) => return Err(de::Error::custom("valor numérico inválido")),
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Raw>::deserialize(d)? {
            None => None,
            Some(Raw::Bool(v)) => Some(v),
            Some(Raw::Int(0)) => Some(false),
            Some(Raw::Int(1)) => Some(true),
            Some(Raw::Text(s)) => match s.trim().to_lowercase().as_str() {
                "" => None,
                "true" | "1" | "sim" | "s" => Some(true),
                "false" | "0" | "não" | "nao" | "n" => Some(false),
                other => {
                    return Err(de::Error::custom(format!("valor booleano inválido: {other}")));
                }
            },
            Some(_) => return Err(de::Error::custom("valor booleano inválido")),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Raw>::deserialize(d)? {
            None => None,
            Some(Raw::Text(s)) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Some(Raw::Int(v)) => Some(v.to_string()),
            Some(Raw::Float(v)) => Some(v.to_string()),
            Some(Raw::Bool(v)) => Some(v.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_null_values_are_skipped() {
        let filters: MatriculaFilters = serde_json::from_value(json!({
            "anoLetivo": "",
            "turno": null,
            "grupoEtapa": "   ",
        }))
        .unwrap();
        assert_eq!(filters, MatriculaFilters::default());
        assert!(filters.values().is_empty());
    }

    #[test]
    fn zero_and_false_are_real_filters() {
        let filters: MatriculaFilters = serde_json::from_value(json!({
            "idescola": 0,
            "deficiencia": false,
            "transporteEscolar": "NÃO",
        }))
        .unwrap();
        assert_eq!(filters.idescola, Some(0));
        assert_eq!(filters.deficiencia, Some(false));
        assert_eq!(filters.transporte_escolar, Some(false));
        assert_eq!(filters.values().len(), 3);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let filters: MatriculaFilters =
            serde_json::from_value(json!({ "anoLetivo": "2024", "idcliente": 12 })).unwrap();
        assert_eq!(filters.ano_letivo, Some(2024));
        assert_eq!(filters.idcliente, Some(12));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let filters: MatriculaFilters =
            serde_json::from_value(json!({ "coluna; DROP TABLE x": "1", "turno": "NOTURNO" }))
                .unwrap();
        assert_eq!(filters.values(), vec![(FilterField::Turno, SqlParam::Text("NOTURNO".into()))]);
    }

    #[test]
    fn with_ano_letivo_keeps_other_filters() {
        let filters = MatriculaFilters {
            ano_letivo: Some(2024),
            turno: Some("VESPERTINO".into()),
            ..Default::default()
        };
        let anterior = filters.with_ano_letivo(2023);
        assert_eq!(anterior.ano_letivo, Some(2023));
        assert_eq!(anterior.turno, filters.turno);
    }
}
