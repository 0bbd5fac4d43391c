// src/handlers/geo.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::RequireAdmin, tenancy::authorize_tenant},
    models::{
        auth::AuthUser,
        geo::{GeoScriptParams, GeocodeSummary, SyncSummary},
    },
};

/// Cliente alvo: o informado, ou o único cliente do administrador.
fn resolve_cliente(user: &AuthUser, requested: Option<i32>) -> Result<i32, AppError> {
    let scoped = authorize_tenant(user, requested)?;
    match scoped.clientes.as_slice() {
        [id] => Ok(*id),
        _ => Err(AppError::BadRequest(
            "Informe o idcliente (o usuário tem mais de um cliente).".to_string(),
        )),
    }
}

// POST /api/geo/sync-escolas
#[utoipa::path(
    post,
    path = "/api/geo/sync-escolas",
    tag = "Geo",
    params(GeoScriptParams),
    request_body(content = GeoScriptParams, description = "Opcional; mesmos campos da query string"),
    responses(
        (status = 200, description = "Resumo da sincronização", body = SyncSummary),
        (status = 403, description = "Apenas administradores"),
        (status = 500, description = "Falha no script; `output` traz o fim do stdout/stderr")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn sync_escolas(
    State(app_state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<GeoScriptParams>,
    body: Option<Json<GeoScriptParams>>,
) -> Result<Json<SyncSummary>, AppError> {
    let params = query.merged(body.map(|Json(b)| b));
    let idcliente = resolve_cliente(&user, params.idcliente)?;

    let summary = app_state.script_runner.sync_escolas(idcliente).await?;
    // Nomes de escola podem ter mudado
    app_state.dashboard_service.flush_cache().await;
    Ok(Json(summary))
}

// POST /api/geo/geocode-escolas
#[utoipa::path(
    post,
    path = "/api/geo/geocode-escolas",
    tag = "Geo",
    params(GeoScriptParams),
    request_body(content = GeoScriptParams, description = "Opcional; mesmos campos da query string"),
    responses(
        (status = 200, description = "Resumo da geocodificação", body = GeocodeSummary),
        (status = 403, description = "Apenas administradores"),
        (status = 500, description = "Falha no script; `output` traz o fim do stdout/stderr")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn geocode_escolas(
    State(app_state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<GeoScriptParams>,
    body: Option<Json<GeoScriptParams>>,
) -> Result<Json<GeocodeSummary>, AppError> {
    let params = query.merged(body.map(|Json(b)| b));
    let idcliente = resolve_cliente(&user, params.idcliente)?;

    if params.limit.is_some_and(|l| l <= 0) {
        return Err(AppError::BadRequest("limit deve ser positivo.".to_string()));
    }

    let summary = app_state
        .script_runner
        .geocode_escolas(
            idcliente,
            params.limit,
            params.mode.unwrap_or_default(),
            params.fallback.unwrap_or_default(),
        )
        .await?;
    app_state.dashboard_service.flush_cache().await;
    Ok(Json(summary))
}
