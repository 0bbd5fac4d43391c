// src/db/matriculas_repo.rs

use sqlx::PgPool;

use crate::{
    common::{db_utils::bind_params, error::AppError},
    models::{
        dashboard::{
            CategoriaRow, EscolaIndicadoresRow, EscolaMapaRow, EscolaOpcao, SerieMensalRow,
            TotaisRow,
        },
        filters::FilterField,
    },
    services::filters::WhereClause,
};

/// Etapas "especiais", fora dos totais agregados.
pub const ETAPAS_ESPECIAIS: [i32; 2] = [98, 99];

/// Dimensões de quebra (group by). Lista fechada, como os filtros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensao {
    Sexo,
    Turno,
    SituacaoMatricula,
    GrupoEtapa,
    EtapaMatricula,
    Deficiencia,
    TransporteEscolar,
    TipoSaida,
}

impl Dimensao {
    pub const fn column(self) -> &'static str {
        match self {
            Dimensao::Sexo => "sexo",
            Dimensao::Turno => FilterField::Turno.column(),
            Dimensao::SituacaoMatricula => FilterField::SituacaoMatricula.column(),
            Dimensao::GrupoEtapa => FilterField::GrupoEtapa.column(),
            Dimensao::EtapaMatricula => FilterField::EtapaMatricula.column(),
            Dimensao::Deficiencia => FilterField::Deficiencia.column(),
            Dimensao::TransporteEscolar => FilterField::TransporteEscolar.column(),
            Dimensao::TipoSaida => "tipo_saida",
        }
    }

    /// Rótulo de uma coluna booleana.
    const fn is_boolean(self) -> bool {
        matches!(self, Dimensao::Deficiencia | Dimensao::TransporteEscolar)
    }
}

/// CTE `base`: o conjunto filtrado, sem as etapas especiais.
fn base_cte(clause: &WhereClause) -> String {
    format!(
        r#"base AS (
            SELECT * FROM dados_matriculas
            WHERE {}
              AND COALESCE(idetapa_matricula, 0) NOT IN ({}, {})
        )"#,
        clause.sql, ETAPAS_ESPECIAIS[0], ETAPAS_ESPECIAIS[1]
    )
}

#[derive(Clone)]
pub struct MatriculasRepository {
    pool: PgPool,
}

impl MatriculasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Totais gerais (cards)
    pub async fn get_totais(&self, clause: &WhereClause) -> Result<TotaisRow, AppError> {
        let sql = format!(
            r#"
            WITH {base},
            turmas AS (
                SELECT idturma, MAX(COALESCE(limite_maximo_aluno, 0)) AS capacidade
                FROM base
                WHERE idturma IS NOT NULL
                GROUP BY idturma
            ),
            contagens AS (
                SELECT
                    COUNT(DISTINCT idmatricula) AS total,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_saida IS NULL) AS ativas,
                    COUNT(DISTINCT idescola) AS escolas,
                    COUNT(DISTINCT idturma) AS turmas,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_entrada IS NOT NULL) AS entradas,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_saida IS NOT NULL) AS saidas
                FROM base
            ),
            capacidade AS (
                SELECT COALESCE(SUM(capacidade), 0)::BIGINT AS capacidade FROM turmas
            )
            SELECT
                c.total, c.ativas, c.escolas, c.turmas, c.entradas, c.saidas,
                cap.capacidade,
                ROUND(c.ativas * 100.0 / NULLIF(cap.capacidade, 0), 2) AS taxa_ocupacao,
                ROUND(c.saidas * 100.0 / NULLIF(c.total, 0), 2) AS taxa_evasao
            FROM contagens c CROSS JOIN capacidade cap
            "#,
            base = base_cte(clause)
        );

        let row = bind_params(sqlx::query_as::<_, TotaisRow>(&sql), &clause.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Matrículas distintas no conjunto filtrado (comparativo anual).
    pub async fn count_matriculas(&self, clause: &WhereClause) -> Result<Option<i64>, AppError> {
        let sql = format!(
            "WITH {} SELECT COUNT(DISTINCT idmatricula) FROM base",
            base_cte(clause)
        );
        let (total,) = bind_params(sqlx::query_as::<_, (Option<i64>,)>(&sql), &clause.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Matrículas nas etapas especiais, que ficam fora dos demais totais.
    pub async fn count_especiais(&self, clause: &WhereClause) -> Result<Option<i64>, AppError> {
        let sql = format!(
            r#"
            SELECT COUNT(DISTINCT idmatricula)
            FROM dados_matriculas
            WHERE {} AND idetapa_matricula IN ({}, {})
            "#,
            clause.sql, ETAPAS_ESPECIAIS[0], ETAPAS_ESPECIAIS[1]
        );
        let (total,) = bind_params(sqlx::query_as::<_, (Option<i64>,)>(&sql), &clause.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Último ano letivo disponível no escopo.
    pub async fn max_ano_letivo(&self, clause: &WhereClause) -> Result<Option<i32>, AppError> {
        let sql = format!("SELECT MAX(ano_letivo) FROM dados_matriculas WHERE {}", clause.sql);
        let (ano,) = bind_params(sqlx::query_as::<_, (Option<i32>,)>(&sql), &clause.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(ano)
    }

    // 2. Opções de filtro
    pub async fn distinct_values(
        &self,
        clause: &WhereClause,
        field: FilterField,
    ) -> Result<Vec<String>, AppError> {
        let column = field.column();
        let sql = format!(
            r#"
            SELECT DISTINCT {column}::TEXT AS valor
            FROM dados_matriculas
            WHERE {} AND {column} IS NOT NULL
            ORDER BY 1
            "#,
            clause.sql
        );
        let rows = bind_params(sqlx::query_as::<_, (Option<String>,)>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(v,)| v)
            .filter(|v| !v.trim().is_empty())
            .collect())
    }

    pub async fn list_escolas(&self, clause: &WhereClause) -> Result<Vec<EscolaOpcao>, AppError> {
        let sql = format!(
            r#"
            SELECT idescola, MAX(escola) AS nome
            FROM dados_matriculas
            WHERE {} AND idescola IS NOT NULL
            GROUP BY idescola
            ORDER BY nome
            "#,
            clause.sql
        );
        let rows = bind_params(sqlx::query_as::<_, EscolaOpcao>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // 3. Quebras por dimensão
    pub async fn breakdown(
        &self,
        clause: &WhereClause,
        dimensao: Dimensao,
    ) -> Result<Vec<CategoriaRow>, AppError> {
        let column = dimensao.column();
        let categoria = if dimensao.is_boolean() {
            format!("CASE WHEN {column} IS NULL THEN NULL WHEN {column} THEN 'SIM' ELSE 'NÃO' END")
        } else {
            format!("NULLIF(TRIM({column}::TEXT), '')")
        };
        let restricao = if dimensao == Dimensao::TipoSaida {
            "WHERE mes_saida IS NOT NULL"
        } else {
            ""
        };

        let sql = format!(
            r#"
            WITH {base}
            SELECT COALESCE({categoria}, 'NÃO INFORMADO') AS categoria,
                   COUNT(DISTINCT idmatricula) AS total
            FROM base
            {restricao}
            GROUP BY 1
            ORDER BY total DESC, categoria
            "#,
            base = base_cte(clause)
        );
        let rows = bind_params(sqlx::query_as::<_, CategoriaRow>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // 4. Indicadores por escola (ocupação e evasão)
    pub async fn indicadores_por_escola(
        &self,
        clause: &WhereClause,
    ) -> Result<Vec<EscolaIndicadoresRow>, AppError> {
        let sql = format!(
            r#"
            WITH {base},
            turmas AS (
                SELECT idescola, idturma, MAX(COALESCE(limite_maximo_aluno, 0)) AS capacidade
                FROM base
                WHERE idturma IS NOT NULL
                GROUP BY idescola, idturma
            ),
            capacidade AS (
                SELECT idescola, SUM(capacidade)::BIGINT AS capacidade
                FROM turmas
                GROUP BY idescola
            ),
            matriculas AS (
                SELECT
                    idescola,
                    MAX(escola) AS escola,
                    COUNT(DISTINCT idmatricula) AS total,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_saida IS NULL) AS ativas,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_saida IS NOT NULL) AS saidas,
                    COUNT(DISTINCT idturma) AS turmas
                FROM base
                WHERE idescola IS NOT NULL
                GROUP BY idescola
            )
            SELECT
                m.idescola, m.escola, m.total, m.ativas, m.saidas, m.turmas,
                COALESCE(c.capacidade, 0)::BIGINT AS capacidade,
                ROUND(m.ativas * 100.0 / NULLIF(c.capacidade, 0), 2) AS taxa_ocupacao,
                ROUND(m.saidas * 100.0 / NULLIF(m.total, 0), 2) AS taxa_evasao
            FROM matriculas m
            LEFT JOIN capacidade c ON c.idescola = m.idescola
            ORDER BY m.escola
            "#,
            base = base_cte(clause)
        );
        let rows = bind_params(sqlx::query_as::<_, EscolaIndicadoresRow>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // 5. Série mensal de entradas e saídas
    pub async fn serie_mensal(&self, clause: &WhereClause) -> Result<Vec<SerieMensalRow>, AppError> {
        let sql = format!(
            r#"
            WITH {base},
            eventos AS (
                SELECT mes_entrada AS mes, idmatricula, 'E' AS tipo
                FROM base WHERE mes_entrada IS NOT NULL
                UNION ALL
                SELECT mes_saida AS mes, idmatricula, 'S' AS tipo
                FROM base WHERE mes_saida IS NOT NULL
            )
            SELECT
                mes,
                COUNT(DISTINCT idmatricula) FILTER (WHERE tipo = 'E') AS entradas,
                COUNT(DISTINCT idmatricula) FILTER (WHERE tipo = 'S') AS saidas
            FROM eventos
            GROUP BY mes
            ORDER BY mes
            "#,
            base = base_cte(clause)
        );
        let rows = bind_params(sqlx::query_as::<_, SerieMensalRow>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // 6. Escolas com coordenadas e matrículas ativas (mapa)
    pub async fn escolas_ativas_mapa(
        &self,
        clause: &WhereClause,
    ) -> Result<Vec<EscolaMapaRow>, AppError> {
        let sql = format!(
            r#"
            WITH {base},
            ativas AS (
                SELECT
                    idcliente, idescola, MAX(escola) AS escola,
                    COUNT(DISTINCT idmatricula) FILTER (WHERE mes_saida IS NULL) AS ativas
                FROM base
                WHERE idescola IS NOT NULL
                GROUP BY idcliente, idescola
            )
            SELECT
                a.idescola,
                COALESCE(NULLIF(TRIM(g.nome), ''), a.escola) AS nome,
                g.municipio,
                g.latitude,
                g.longitude,
                g.geocode_source,
                g.geocode_quality,
                a.ativas
            FROM ativas a
            JOIN escolas_geo g ON g.idcliente = a.idcliente AND g.idescola = a.idescola
            WHERE g.latitude IS NOT NULL
              AND g.longitude IS NOT NULL
              AND a.ativas > 0
            ORDER BY nome
            "#,
            base = base_cte(clause)
        );
        let rows = bind_params(sqlx::query_as::<_, EscolaMapaRow>(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::filters::{MatriculaFilters, SqlParam};
    use crate::services::filters::build_where_clause;

    #[test]
    fn base_cte_excludes_special_stages() {
        let clause = build_where_clause(&MatriculaFilters::default(), None);
        let cte = base_cte(&clause);
        assert!(cte.contains("NOT IN (98, 99)"));
        assert!(cte.contains("WHERE 1=1"));
    }

    #[test]
    fn base_cte_keeps_placeholders_only() {
        let filters = MatriculaFilters {
            turno: Some("NOTURNO".into()),
            ..Default::default()
        };
        let clause = build_where_clause(&filters, None);
        let cte = base_cte(&clause);
        assert!(cte.contains("turno = $1"));
        assert!(!cte.contains("NOTURNO"));
        assert_eq!(clause.params, vec![SqlParam::Text("NOTURNO".into())]);
    }

    #[test]
    fn breakdown_columns_are_fixed() {
        assert_eq!(Dimensao::Sexo.column(), "sexo");
        assert_eq!(Dimensao::Turno.column(), "turno");
        assert!(Dimensao::Deficiencia.is_boolean());
        assert!(!Dimensao::TipoSaida.is_boolean());
    }
}
