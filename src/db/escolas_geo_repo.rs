// src/db/escolas_geo_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::geo::{EscolaGeo, EscolaGeoUpsert, EscolaOrigem, GeoCoordenada},
};

#[derive(Clone)]
pub struct EscolasGeoRepository {
    pool: PgPool,
}

impl EscolasGeoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Escolas distintas do cliente, com o nome mais recente (MAX) como referência.
    pub async fn list_escolas_origem(&self, idcliente: i32) -> Result<Vec<EscolaOrigem>, AppError> {
        let rows = sqlx::query_as::<_, EscolaOrigem>(
            r#"
            SELECT idescola, MAX(escola) AS nome
            FROM dados_matriculas
            WHERE idcliente = $1 AND idescola IS NOT NULL
            GROUP BY idescola
            ORDER BY idescola
            "#,
        )
        .bind(idcliente)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_cliente(&self, idcliente: i32) -> Result<Vec<EscolaGeo>, AppError> {
        let rows = sqlx::query_as::<_, EscolaGeo>(
            "SELECT * FROM escolas_geo WHERE idcliente = $1 ORDER BY idescola",
        )
        .bind(idcliente)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Escolas ainda sem coordenadas.
    pub async fn list_pendentes(
        &self,
        idcliente: i32,
        limit: Option<i64>,
    ) -> Result<Vec<EscolaGeo>, AppError> {
        let rows = sqlx::query_as::<_, EscolaGeo>(
            r#"
            SELECT * FROM escolas_geo
            WHERE idcliente = $1
              AND (latitude IS NULL OR longitude IS NULL)
            ORDER BY idescola
            LIMIT $2
            "#,
        )
        .bind(idcliente)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insere ou atualiza a escola; campos vazios nunca sobrescrevem valores
    /// preenchidos, e a linha só é tocada se algo mudar.
    pub async fn upsert(&self, escola: &EscolaGeoUpsert) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO escolas_geo (idcliente, idescola, nome, municipio, uf, updated_at)
            VALUES ($1, $2, NULLIF(TRIM($3), ''), NULLIF(TRIM($4), ''), NULLIF(TRIM($5), ''), NOW())
            ON CONFLICT (idcliente, idescola) DO UPDATE SET
                nome = COALESCE(EXCLUDED.nome, escolas_geo.nome),
                municipio = COALESCE(EXCLUDED.municipio, escolas_geo.municipio),
                uf = COALESCE(EXCLUDED.uf, escolas_geo.uf),
                updated_at = NOW()
            WHERE (escolas_geo.nome, escolas_geo.municipio, escolas_geo.uf)
                IS DISTINCT FROM (
                    COALESCE(EXCLUDED.nome, escolas_geo.nome),
                    COALESCE(EXCLUDED.municipio, escolas_geo.municipio),
                    COALESCE(EXCLUDED.uf, escolas_geo.uf)
                )
            "#,
        )
        .bind(escola.idcliente)
        .bind(escola.idescola)
        .bind(escola.nome.as_deref())
        .bind(escola.municipio.as_deref())
        .bind(escola.uf.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_coordenadas(
        &self,
        idcliente: i32,
        idescola: i32,
        coordenada: &GeoCoordenada,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE escolas_geo
            SET latitude = $3,
                longitude = $4,
                geocode_source = $5,
                geocode_quality = $6,
                updated_at = NOW()
            WHERE idcliente = $1 AND idescola = $2
            "#,
        )
        .bind(idcliente)
        .bind(idescola)
        .bind(coordenada.latitude)
        .bind(coordenada.longitude)
        .bind(&coordenada.source)
        .bind(&coordenada.quality)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
