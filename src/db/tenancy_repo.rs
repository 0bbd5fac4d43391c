// src/db/tenancy_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{geo::ClienteLocal, tenancy::Cliente},
};

/// UF usada quando a base não tem a coluna `clientes.uf`.
pub const UF_PADRAO: &str = "PA";

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_clientes(&self, ids: &[i32]) -> Result<Vec<Cliente>, AppError> {
        let rows = sqlx::query_as::<_, Cliente>(
            r#"
            SELECT idcliente, nome, municipio
            FROM clientes
            WHERE idcliente = ANY($1)
            ORDER BY nome
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Nem toda instalação tem `clientes.uf`.
    async fn has_uf_column(&self) -> Result<bool, AppError> {
        let (exists,) = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_name = 'clientes' AND column_name = 'uf'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Município e UF do cliente; `None` se o cliente não existir.
    pub async fn find_localizacao(&self, idcliente: i32) -> Result<Option<ClienteLocal>, AppError> {
        let sql = if self.has_uf_column().await? {
            "SELECT municipio, uf::TEXT AS uf FROM clientes WHERE idcliente = $1"
        } else {
            tracing::warn!("Coluna clientes.uf ausente; usando UF padrão {}", UF_PADRAO);
            "SELECT municipio, NULL::TEXT AS uf FROM clientes WHERE idcliente = $1"
        };

        let row = sqlx::query_as::<_, (Option<String>, Option<String>)>(sql)
            .bind(idcliente)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(municipio, uf)| ClienteLocal {
            idcliente,
            municipio: municipio.filter(|m| !m.trim().is_empty()),
            uf: uf
                .map(|u| u.trim().to_uppercase())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| UF_PADRAO.to_string()),
        }))
    }
}
