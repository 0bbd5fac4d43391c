// src/handlers/admin.rs

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{config::AppState, middleware::auth::RequireAdmin};

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Admin",
    responses(
        (status = 200, description = "Servidor no ar")
    )
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// POST /api/cache/flush
#[utoipa::path(
    post,
    path = "/api/cache/flush",
    tag = "Admin",
    responses(
        (status = 200, description = "Cache de respostas esvaziado"),
        (status = 403, description = "Apenas administradores")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn flush_cache(
    State(app_state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
) -> Json<Value> {
    app_state.dashboard_service.flush_cache().await;
    tracing::info!("🧹 Cache esvaziado pelo usuário {}", user.id);
    Json(json!({ "flushed": true }))
}
