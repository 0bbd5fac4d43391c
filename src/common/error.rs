use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Token não fornecido")]
    MissingToken,

    #[error("Token expirado")]
    ExpiredToken,

    #[error("Token inválido")]
    InvalidToken,

    // As duas mensagens de login continuam distintas (ver DESIGN.md).
    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Senha incorreta")]
    WrongPassword,

    #[error("Acesso negado ao cliente {0}")]
    TenantForbidden(i32),

    #[error("Usuário sem clientes vinculados")]
    NoTenantAccess,

    #[error("Acesso restrito a administradores")]
    AdminRequired,

    #[error("Cliente {0} não encontrado")]
    ClienteNotFound(i32),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Geocode(#[from] crate::services::geocoding::GeocodeError),

    #[error("Falha ao executar {script}")]
    ScriptFailed { script: String, output: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken
            | AppError::ExpiredToken
            | AppError::InvalidToken
            | AppError::UserNotFound
            | AppError::WrongPassword => StatusCode::UNAUTHORIZED,
            AppError::TenantForbidden(_) | AppError::NoTenantAccess | AppError::AdminRequired => {
                StatusCode::FORBIDDEN
            }
            AppError::ClienteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Corpo JSON do erro: `{ "error": ..., "details"?: ... }`.
    pub fn body(&self) -> Value {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({ "error": "Um ou mais campos são inválidos.", "details": details })
            }
            AppError::BadRequest(message) => json!({ "error": message }),
            AppError::MissingToken => json!({ "error": "Token não fornecido." }),
            AppError::ExpiredToken => json!({ "error": "Token expirado. Faça login novamente." }),
            AppError::InvalidToken => json!({ "error": "Token inválido." }),
            AppError::UserNotFound => json!({ "error": "Usuário não encontrado." }),
            AppError::WrongPassword => json!({ "error": "Senha incorreta." }),
            AppError::TenantForbidden(id) => {
                json!({ "error": format!("Acesso negado ao cliente {id}.") })
            }
            AppError::NoTenantAccess => {
                json!({ "error": "Usuário não possui clientes vinculados." })
            }
            AppError::AdminRequired => {
                json!({ "error": "Operação restrita a administradores." })
            }
            AppError::ClienteNotFound(id) => {
                json!({ "error": format!("Cliente {id} não encontrado.") })
            }
            AppError::Geocode(e) => json!({
                "error": "Falha na geocodificação.",
                "details": e.to_string(),
            }),
            AppError::ScriptFailed { script, output } => json!({
                "error": format!("Falha ao executar {script}."),
                "output": output,
            }),
            AppError::DatabaseError(e) => json!({
                "error": "Erro ao consultar o banco de dados.",
                "details": e.to_string(),
            }),
            AppError::InternalServerError(e) => json!({
                "error": "Ocorreu um erro inesperado.",
                "details": e.to_string(),
            }),
            AppError::BcryptError(e) => json!({
                "error": "Ocorreu um erro inesperado.",
                "details": e.to_string(),
            }),
            AppError::JwtError(e) => json!({
                "error": "Ocorreu um erro inesperado.",
                "details": e.to_string(),
            }),
        }
    }

    /// Anexa um corpo "zerado" à resposta de erro, para que o frontend
    /// sempre receba todos os campos.
    pub fn with_fallback<T: Serialize>(self, fallback: T) -> FallbackError<T> {
        FallbackError {
            error: self,
            fallback,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}

// ---
// Erro com corpo de fallback (endpoints de analytics)
// ---
#[derive(Debug)]
pub struct FallbackError<T> {
    pub error: AppError,
    pub fallback: T,
}

impl<T: Default + Serialize> From<AppError> for FallbackError<T> {
    fn from(error: AppError) -> Self {
        error.with_fallback(T::default())
    }
}

impl<T: Serialize> IntoResponse for FallbackError<T> {
    fn into_response(self) -> Response {
        let status = self.error.status();
        // 4xx não leva o corpo zerado
        if !status.is_server_error() {
            return self.error.into_response();
        }
        tracing::error!("Erro Interno do Servidor: {}", self.error);

        let mut body = serde_json::to_value(&self.fallback).unwrap_or_else(|_| json!({}));
        if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), self.error.body()) {
            target.extend(extra);
        }
        (status, Json(body)).into_response()
    }
}
