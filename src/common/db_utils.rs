use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};

use crate::models::filters::SqlParam;

// ---
// Helper de binding: a "Chave" entre o filtro e o banco
// ---
/// Vincula os parâmetros posicionais (`$1..$n`) na ordem em que foram gerados.
pub(crate) fn bind_params<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    params: &[SqlParam],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::IntList(v) => query.bind(v.clone()),
        };
    }
    query
}
