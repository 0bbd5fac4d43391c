// src/services/metrics.rs

use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::models::dashboard::{
    AlertaEscola, AlertaTipo, ComparativoAnual, EscolaIndicadores, EscolaIndicadoresRow,
};

pub const EVASAO_ALTA: f64 = 10.0;
pub const OCUPACAO_LOTADA: f64 = 90.0;
pub const OCUPACAO_BAIXA: f64 = 50.0;

// ---
// Normalização numérica ("safe parse")
// ---
/// Contagem nula ou negativa vira zero.
pub fn safe_count(value: Option<i64>) -> i64 {
    value.unwrap_or(0).max(0)
}

/// Converte qualquer valor numérico vindo do banco em um `f64` finito.
pub fn safe_f64(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn safe_decimal(value: Option<Decimal>) -> f64 {
    safe_f64(value.and_then(|d| d.to_f64()))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn clamp_percent(value: f64) -> f64 {
    safe_f64(Some(value)).clamp(0.0, 100.0)
}

/// `numerador * 100 / denominador`, com denominador zero resultando em 0.
pub fn percent(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    round2(numerator as f64 * 100.0 / denominator as f64)
}

/// Taxa calculada no banco, limitada a [0, 100].
///
/// Se o banco devolveu exatamente zero mas as contagens não são zero, a taxa
/// é recalculada localmente.
pub fn rate(sql_value: Option<Decimal>, numerator: i64, denominator: i64) -> f64 {
    let primary = safe_decimal(sql_value);
    let value = if primary == 0.0 && numerator > 0 && denominator > 0 {
        percent(numerator, denominator)
    } else {
        primary
    };
    clamp_percent(value)
}

// ---
// Comparativo ano a ano
// ---
pub fn compare_years(
    ano_atual: Option<i32>,
    total_atual: i64,
    total_anterior: i64,
) -> ComparativoAnual {
    let missing = total_anterior - total_atual;
    let percent = if total_anterior > 0 {
        round2(missing as f64 * 100.0 / total_anterior as f64)
    } else {
        0.0
    };
    let arrow = match missing {
        m if m > 0 => "up",
        m if m < 0 => "down",
        _ => "",
    };

    ComparativoAnual {
        ano_atual,
        ano_anterior: ano_atual.map(|ano| ano - 1),
        total_atual,
        total_anterior,
        missing,
        percent,
        arrow: arrow.to_string(),
    }
}

// ---
// Indicadores por escola + alertas
// ---
impl From<EscolaIndicadoresRow> for EscolaIndicadores {
    fn from(row: EscolaIndicadoresRow) -> Self {
        let total = safe_count(row.total);
        let ativas = safe_count(row.ativas);
        let saidas = safe_count(row.saidas);
        let capacidade = safe_count(row.capacidade);

        Self {
            idescola: row.idescola.unwrap_or(0),
            escola: row.escola.unwrap_or_default(),
            total_matriculas: total,
            matriculas_ativas: ativas,
            saidas,
            turmas: safe_count(row.turmas),
            capacidade,
            vagas: (capacidade - ativas).max(0),
            taxa_ocupacao: rate(row.taxa_ocupacao, ativas, capacidade),
            taxa_evasao: rate(row.taxa_evasao, saidas, total),
        }
    }
}

/// Regras avaliadas em ordem; a primeira que casar vence.
pub fn classify(taxa_evasao: f64, taxa_ocupacao: f64) -> AlertaTipo {
    if taxa_evasao > EVASAO_ALTA {
        AlertaTipo::EvasaoAlta
    } else if taxa_ocupacao > OCUPACAO_LOTADA {
        AlertaTipo::Lotada
    } else if taxa_ocupacao < OCUPACAO_BAIXA {
        AlertaTipo::Subutilizada
    } else {
        AlertaTipo::Normal
    }
}

/// Só as escolas fora do normal, por prioridade e depois por nome.
pub fn build_alertas(escolas: &[EscolaIndicadores]) -> Vec<AlertaEscola> {
    let mut alertas: Vec<AlertaEscola> = escolas
        .iter()
        .filter_map(|e| {
            let tipo = classify(e.taxa_evasao, e.taxa_ocupacao);
            (tipo != AlertaTipo::Normal).then(|| AlertaEscola {
                idescola: e.idescola,
                escola: e.escola.clone(),
                tipo,
                descricao: tipo.descricao().to_string(),
                taxa_ocupacao: e.taxa_ocupacao,
                taxa_evasao: e.taxa_evasao,
                matriculas_ativas: e.matriculas_ativas,
                capacidade: e.capacidade,
            })
        })
        .collect();

    alertas.sort_by(|a, b| a.tipo.cmp(&b.tipo).then_with(|| a.escola.cmp(&b.escola)));
    alertas
}
