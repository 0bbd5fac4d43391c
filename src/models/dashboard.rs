// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// ---
// Linhas cruas do banco (antes da normalização numérica)
// ---
#[derive(Debug, FromRow)]
pub struct TotaisRow {
    pub total: Option<i64>,
    pub ativas: Option<i64>,
    pub escolas: Option<i64>,
    pub turmas: Option<i64>,
    pub entradas: Option<i64>,
    pub saidas: Option<i64>,
    pub capacidade: Option<i64>,
    pub taxa_ocupacao: Option<Decimal>,
    pub taxa_evasao: Option<Decimal>,
}

#[derive(Debug, FromRow)]
pub struct EscolaIndicadoresRow {
    pub idescola: Option<i32>,
    pub escola: Option<String>,
    pub total: Option<i64>,
    pub ativas: Option<i64>,
    pub saidas: Option<i64>,
    pub turmas: Option<i64>,
    pub capacidade: Option<i64>,
    pub taxa_ocupacao: Option<Decimal>,
    pub taxa_evasao: Option<Decimal>,
}

#[derive(Debug, FromRow)]
pub struct CategoriaRow {
    pub categoria: Option<String>,
    pub total: Option<i64>,
}

#[derive(Debug, FromRow)]
pub struct SerieMensalRow {
    pub mes: Option<i32>,
    pub entradas: Option<i64>,
    pub saidas: Option<i64>,
}

#[derive(Debug, FromRow)]
pub struct EscolaMapaRow {
    pub idescola: i32,
    pub nome: Option<String>,
    pub municipio: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocode_source: Option<String>,
    pub geocode_quality: Option<String>,
    pub ativas: Option<i64>,
}

// ---
// 1. Totais (os cards do topo)
// ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotaisResponse {
    pub total_matriculas: i64,
    pub matriculas_ativas: i64,
    pub total_escolas: i64,
    pub total_turmas: i64,
    pub capacidade_total: i64,
    pub vagas_disponiveis: i64,
    pub taxa_ocupacao: f64,
    pub entradas: i64,
    pub saidas: i64,
    pub taxa_evasao: f64,
    /// Matrículas nas etapas especiais (98/99), fora dos demais totais.
    pub matriculas_especiais: i64,
    pub comparativo: ComparativoAnual,
}

/// Comparativo com o ano letivo anterior, mantidos os demais filtros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComparativoAnual {
    pub ano_atual: Option<i32>,
    pub ano_anterior: Option<i32>,
    pub total_atual: i64,
    pub total_anterior: i64,
    /// `total_anterior - total_atual`.
    pub missing: i64,
    pub percent: f64,
    /// `"up"`, `"down"` ou `""` quando os totais são iguais.
    pub arrow: String,
}

// ---
// 2. Opções dos filtros
// ---
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosResponse {
    pub anos_letivos: Vec<String>,
    pub escolas: Vec<EscolaOpcao>,
    pub grupos_etapa: Vec<String>,
    pub etapas_matricula: Vec<String>,
    pub etapas_turma: Vec<String>,
    pub situacoes_matricula: Vec<String>,
    pub turnos: Vec<String>,
    pub tipos_matricula: Vec<String>,
    pub tipos_transporte: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EscolaOpcao {
    pub idescola: i32,
    pub nome: Option<String>,
}

// ---
// 3. Quebras (gráficos de pizza/barras)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BreakdownItem {
    pub categoria: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownsResponse {
    pub por_sexo: Vec<BreakdownItem>,
    pub por_turno: Vec<BreakdownItem>,
    pub por_situacao: Vec<BreakdownItem>,
    pub por_grupo_etapa: Vec<BreakdownItem>,
    pub por_etapa_matricula: Vec<BreakdownItem>,
    pub por_deficiencia: Vec<BreakdownItem>,
    pub por_transporte_escolar: Vec<BreakdownItem>,
    pub escolas: Vec<EscolaIndicadores>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscolaIndicadores {
    pub idescola: i32,
    pub escola: String,
    pub total_matriculas: i64,
    pub matriculas_ativas: i64,
    pub saidas: i64,
    pub turmas: i64,
    pub capacidade: i64,
    pub vagas: i64,
    pub taxa_ocupacao: f64,
    pub taxa_evasao: f64,
}

// ---
// 4. Analytics
// ---
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_matriculas: i64,
    pub capacidade_total: i64,
    pub entradas: i64,
    pub saidas: i64,
    pub taxa_ocupacao: f64,
    pub taxa_evasao: f64,
    pub serie_mensal: Vec<SerieMensal>,
    pub saidas_por_tipo: Vec<BreakdownItem>,
    pub escolas: Vec<EscolaIndicadores>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SerieMensal {
    pub mes: i32,
    pub entradas: i64,
    pub saidas: i64,
}

// ---
// 5. Alertas
// ---
/// Ordem das variantes = prioridade de exibição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertaTipo {
    EvasaoAlta,
    Lotada,
    Subutilizada,
    Normal,
}

impl AlertaTipo {
    pub fn descricao(self) -> &'static str {
        match self {
            AlertaTipo::EvasaoAlta => "Evasão acima de 10%",
            AlertaTipo::Lotada => "Ocupação acima de 90%",
            AlertaTipo::Subutilizada => "Ocupação abaixo de 50%",
            AlertaTipo::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertaEscola {
    pub idescola: i32,
    pub escola: String,
    pub tipo: AlertaTipo,
    pub descricao: String,
    pub taxa_ocupacao: f64,
    pub taxa_evasao: f64,
    pub matriculas_ativas: i64,
    pub capacidade: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AlertasResponse {
    pub total: usize,
    pub alertas: Vec<AlertaEscola>,
}

// ---
// 6. Mapa
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscolaMapa {
    pub idescola: i32,
    pub nome: String,
    pub municipio: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub geocode_source: Option<String>,
    pub geocode_quality: Option<String>,
    /// `false` quando a posição é o centro do município.
    pub precisa: bool,
    pub matriculas_ativas: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MapaResponse {
    pub total: usize,
    pub escolas: Vec<EscolaMapa>,
}
