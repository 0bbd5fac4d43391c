// src/db/user_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::auth::Usuario};

// O repositório de usuários: `usuarios` + a ponte `usuario_clientes`
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo CPF (comparando só os dígitos)
    pub async fn find_by_cpf(&self, cpf_digits: &str) -> Result<Option<Usuario>, AppError> {
        let user = sqlx::query_as::<_, Usuario>(
            r#"
            SELECT id, cpf, nome, email, senha_hash, COALESCE(admin, false) AS admin
            FROM usuarios
            WHERE regexp_replace(cpf, '\D', '', 'g') = $1
              AND COALESCE(ativo, true)
            "#,
        )
        .bind(cpf_digits)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Usuario>, AppError> {
        let user = sqlx::query_as::<_, Usuario>(
            r#"
            SELECT id, cpf, nome, email, senha_hash, COALESCE(admin, false) AS admin
            FROM usuarios
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Clientes (tenants) vinculados ao usuário.
    pub async fn list_cliente_ids(&self, usuario_id: i32) -> Result<Vec<i32>, AppError> {
        let rows = sqlx::query_as::<_, (i32,)>(
            "SELECT idcliente FROM usuario_clientes WHERE usuario_id = $1 ORDER BY idcliente",
        )
        .bind(usuario_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn is_admin(&self, usuario_id: i32) -> Result<bool, AppError> {
        let row = sqlx::query_as::<_, (Option<bool>,)>("SELECT admin FROM usuarios WHERE id = $1")
            .bind(usuario_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(matches!(row, Some((Some(true),))))
    }
}
