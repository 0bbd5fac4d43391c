// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: i32,
    pub cpf: String,
    pub nome: Option<String>,
    pub email: Option<String>,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub senha_hash: String,

    pub admin: bool,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 11, max = 14, message = "O CPF informado é inválido."))]
    #[schema(example = "123.456.789-00")]
    pub cpf: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub senha: String,
}

impl LoginPayload {
    /// CPF só com dígitos.
    pub fn cpf_digits(&self) -> String {
        self.cpf.chars().filter(char::is_ascii_digit).collect()
    }
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UsuarioResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioResponse {
    pub id: i32,
    pub cpf: String,
    pub nome: Option<String>,
    pub email: Option<String>,
    pub admin: bool,
    pub clientes: Vec<i32>,
}

impl UsuarioResponse {
    pub fn from_usuario(usuario: Usuario, clientes: Vec<i32>) -> Self {
        Self {
            id: usuario.id,
            cpf: usuario.cpf,
            nome: usuario.nome,
            email: usuario.email,
            admin: usuario.admin,
            clientes,
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,           // ID do usuário
    pub cpf: String,
    pub clientes: Vec<i32>, // Clientes (tenants) autorizados
    pub exp: usize,
    pub iat: usize,
}

// ---
// Usuário autenticado (derivado só do token, sem sessão)
// ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub cpf: String,
    pub clientes: Vec<i32>,
}

/// Como o usuário está restrito aos clientes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Single(i32),
    Many(Vec<i32>),
    Unscoped,
}

impl AuthUser {
    pub fn tenant_scope(&self) -> TenantScope {
        match self.clientes.as_slice() {
            [] => TenantScope::Unscoped,
            [id] => TenantScope::Single(*id),
            many => TenantScope::Many(many.to_vec()),
        }
    }

    pub fn can_access(&self, idcliente: i32) -> bool {
        self.clientes.contains(&idcliente)
    }

    /// O mesmo usuário restrito a um único cliente.
    pub fn narrowed_to(&self, idcliente: i32) -> Self {
        Self {
            clientes: vec![idcliente],
            ..self.clone()
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            cpf: claims.cpf,
            clientes: claims.clientes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(clientes: Vec<i32>) -> AuthUser {
        AuthUser { id: 1, cpf: "12345678900".into(), clientes }
    }

    #[test]
    fn tenant_scope_follows_claim_count() {
        assert_eq!(user(vec![]).tenant_scope(), TenantScope::Unscoped);
        assert_eq!(user(vec![4]).tenant_scope(), TenantScope::Single(4));
        assert_eq!(user(vec![4, 9]).tenant_scope(), TenantScope::Many(vec![4, 9]));
    }

    #[test]
    fn cpf_digits_strips_punctuation() {
        let payload = LoginPayload { cpf: "123.456.789-00".into(), senha: "x".into() };
        assert_eq!(payload.cpf_digits(), "12345678900");
    }
}
