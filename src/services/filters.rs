// src/services/filters.rs

use crate::models::{
    auth::{AuthUser, TenantScope},
    filters::{FilterField, MatriculaFilters, SqlParam},
};

/// Expressão booleana SQL + parâmetros posicionais.
///
/// `sql` sempre começa com `1=1`, então novos predicados podem ser
/// concatenados com `AND` sem se preocupar com a contagem. Os placeholders
/// começam em `$offset + 1`; os `offset` primeiros ficam para o chamador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub offset: usize,
}

impl Default for WhereClause {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl WhereClause {
    pub fn starting_at(offset: usize) -> Self {
        Self {
            sql: "1=1".to_string(),
            params: Vec::new(),
            offset,
        }
    }

    /// Registra um parâmetro e devolve o seu placeholder (`$n`).
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.offset + self.params.len())
    }

    fn push_eq(&mut self, field: FilterField, param: SqlParam) {
        let placeholder = self.bind(param);
        self.sql
            .push_str(&format!(" AND {} = {}", field.column(), placeholder));
    }

    fn push_any(&mut self, field: FilterField, ids: Vec<i32>) {
        let placeholder = self.bind(SqlParam::IntList(ids));
        self.sql
            .push_str(&format!(" AND {} = ANY({})", field.column(), placeholder));
    }

    /// Quantidade de placeholders `$n` distintos no SQL.
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.sql.as_bytes();
        let mut seen = std::collections::BTreeSet::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    seen.insert(&self.sql[start..end]);
                }
                i = end.max(i + 1);
            } else {
                i += 1;
            }
        }
        seen.len()
    }
}

/// Traduz os filtros do painel + o usuário autenticado em uma cláusula WHERE.
///
/// Precedência do cliente (tenant):
/// 1. usuário com um único cliente: esse valor é imposto e o `idcliente` da
///    requisição é ignorado;
/// 2. usuário com vários clientes: `idcliente = ANY($n)` sobre a lista;
/// 3. sem contexto autenticado: usa o `idcliente` enviado.
pub fn build_where_clause(filters: &MatriculaFilters, user: Option<&AuthUser>) -> WhereClause {
    build_where_clause_from(0, filters, user)
}

/// Igual a [`build_where_clause`], mas numerando a partir de `$offset + 1`
/// para quem já ligou `offset` parâmetros próprios antes da cláusula.
pub fn build_where_clause_from(
    offset: usize,
    filters: &MatriculaFilters,
    user: Option<&AuthUser>,
) -> WhereClause {
    let mut clause = WhereClause::starting_at(offset);

    match user.map(AuthUser::tenant_scope) {
        Some(TenantScope::Single(id)) => clause.push_eq(FilterField::Idcliente, SqlParam::Int(id)),
        Some(TenantScope::Many(ids)) => clause.push_any(FilterField::Idcliente, ids),
        Some(TenantScope::Unscoped) | None => {
            if let Some(id) = filters.idcliente {
                clause.push_eq(FilterField::Idcliente, SqlParam::Int(id));
            }
        }
    }

    for (field, param) in filters.values() {
        clause.push_eq(field, param);
    }

    clause
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(clientes: Vec<i32>) -> AuthUser {
        AuthUser { id: 7, cpf: "00000000000".into(), clientes }
    }

    fn all_filters() -> MatriculaFilters {
        MatriculaFilters {
            ano_letivo: Some(2024),
            deficiencia: Some(false),
            grupo_etapa: Some("ENSINO FUNDAMENTAL".into()),
            etapa_matricula: Some("1º ANO".into()),
            etapa_turma: Some("1º ANO A".into()),
            situacao_matricula: Some("ATIVO".into()),
            turno: Some("MATUTINO".into()),
            tipo_matricula: Some("REGULAR".into()),
            tipo_transporte: Some("ÔNIBUS".into()),
            transporte_escolar: Some(true),
            idescola: Some(0),
            idcliente: Some(99),
        }
    }

    #[test]
    fn empty_filters_yield_tautology() {
        let clause = build_where_clause(&MatriculaFilters::default(), None);
        assert_eq!(clause.sql, "1=1");
        assert!(clause.params.is_empty());
    }

    #[test]
    fn params_match_placeholders() {
        for u in [None, Some(user(vec![1])), Some(user(vec![1, 2, 3]))] {
            let clause = build_where_clause(&all_filters(), u.as_ref());
            assert!(clause.sql.starts_with("1=1"));
            assert_eq!(clause.params.len(), clause.placeholder_count());
        }
    }

    #[test]
    fn values_never_reach_the_sql_text() {
        let filters = MatriculaFilters {
            turno: Some("'; DROP TABLE dados_matriculas; --".into()),
            grupo_etapa: Some("MATUTINO".into()),
            ..Default::default()
        };
        let clause = build_where_clause(&filters, None);
        assert!(!clause.sql.contains("DROP"));
        assert!(!clause.sql.contains("MATUTINO"));
        assert!(clause.params.contains(&SqlParam::Text("'; DROP TABLE dados_matriculas; --".into())));
    }

    #[test]
    fn single_tenant_claim_overrides_request() {
        let clause = build_where_clause(&all_filters(), Some(&user(vec![5])));
        assert!(clause.sql.contains("idcliente = $1"));
        assert_eq!(clause.params[0], SqlParam::Int(5));
        assert!(!clause.params.contains(&SqlParam::Int(99)));
    }

    #[test]
    fn multi_tenant_claim_uses_any() {
        let clause = build_where_clause(&all_filters(), Some(&user(vec![3, 8])));
        assert!(clause.sql.contains("idcliente = ANY($1)"));
        assert_eq!(clause.params[0], SqlParam::IntList(vec![3, 8]));
        assert!(!clause.params.contains(&SqlParam::Int(99)));
    }

    #[test]
    fn unscoped_falls_back_to_request_tenant() {
        let clause = build_where_clause(&all_filters(), Some(&user(vec![])));
        assert_eq!(clause.params[0], SqlParam::Int(99));

        let anon = build_where_clause(&all_filters(), None);
        assert_eq!(anon.params[0], SqlParam::Int(99));
    }

    #[test]
    fn extra_binds_continue_numbering() {
        let mut clause = build_where_clause(&all_filters(), Some(&user(vec![1])));
        let n = clause.params.len();
        let placeholder = clause.bind(SqlParam::Int(10));
        assert_eq!(placeholder, format!("${}", n + 1));
    }

    #[test]
    fn offset_leaves_room_for_caller_params() {
        let clause = build_where_clause_from(2, &all_filters(), Some(&user(vec![5])));
        assert!(clause.sql.contains("idcliente = $3"));
        assert!(!clause.sql.contains("$1 ") && !clause.sql.contains("$2 "));
        assert_eq!(clause.params[0], SqlParam::Int(5));
        assert_eq!(clause.params.len(), clause.placeholder_count());

        let mut clause = clause;
        let next = clause.bind(SqlParam::Int(10));
        assert_eq!(next, format!("${}", 2 + clause.params.len()));
    }

    #[test]
    fn placeholder_count_reads_multi_digit_indexes() {
        let clause = WhereClause {
            sql: "1=1 AND a = $1 AND b = $10 AND c = $10".into(),
            params: vec![],
            offset: 0,
        };
        assert_eq!(clause.placeholder_count(), 2);
    }
}
