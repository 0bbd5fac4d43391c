// src/handlers/auth.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{LoginPayload, LoginResponse, UsuarioResponse},
        tenancy::ClientesResponse,
    },
};

// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login realizado", body = LoginResponse),
        (status = 400, description = "CPF ou senha em formato inválido"),
        (status = 401, description = "Usuário não encontrado ou senha incorreta")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state
        .auth_service
        .login(&payload.cpf_digits(), &payload.senha)
        .await?;

    Ok(Json(response))
}

// GET /api/usuario
#[utoipa::path(
    get,
    path = "/api/usuario",
    tag = "Auth",
    responses(
        (status = 200, description = "Dados do usuário logado", body = UsuarioResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_usuario(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UsuarioResponse>, AppError> {
    let usuario = app_state.auth_service.get_usuario(&user).await?;
    Ok(Json(usuario))
}

// GET /api/client
#[utoipa::path(
    get,
    path = "/api/client",
    tag = "Auth",
    responses(
        (status = 200, description = "Clientes (municípios) do token", body = ClientesResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ClientesResponse>, AppError> {
    let clientes = app_state.tenant_repo.list_clientes(&user.clientes).await?;
    Ok(Json(ClientesResponse { clientes }))
}
