// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState, models::auth::AuthUser};

// O middleware em si: valida o Bearer token e guarda o usuário nos extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|rejection| {
        if rejection.is_missing() {
            AppError::MissingToken
        } else {
            AppError::InvalidToken
        }
    })?;

    let user = app_state.auth_service.validate_token(bearer.token())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::MissingToken)
    }
}

/// Guardião das rotas administrativas. A flag `admin` é lida do banco a cada
/// chamada, não do token.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !app_state.user_repo.is_admin(user.id).await? {
            tracing::warn!("Usuário {} tentou acessar rota administrativa", user.id);
            return Err(AppError::AdminRequired);
        }
        Ok(RequireAdmin(user))
    }
}
