// src/routes.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(e)) => {
            tracing::warn!("CORS_ORIGIN inválida ({}); liberando qualquer origem", e);
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/health", get(handlers::admin::health))
        .route("/login", post(handlers::auth::login));

    // Rotas protegidas pelo token
    let protected_routes = Router::new()
        .route("/usuario", get(handlers::auth::get_usuario))
        .route("/client", get(handlers::auth::get_client))
        .route("/filtros", get(handlers::dashboard::get_filtros))
        .route("/totais", post(handlers::dashboard::post_totais))
        .route("/breakdowns", post(handlers::dashboard::post_breakdowns))
        .route("/analytics", post(handlers::dashboard::post_analytics))
        .route("/alertas", post(handlers::dashboard::post_alertas))
        .route("/map/escolas-ativas", post(handlers::dashboard::post_mapa_escolas))
        // Administrativas: o extrator RequireAdmin confere a flag no banco
        .route("/geo/sync-escolas", post(handlers::geo::sync_escolas))
        .route("/geo/geocode-escolas", post(handlers::geo::geocode_escolas))
        .route("/cache/flush", post(handlers::admin::flush_cache))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(app_state.config.cors_origin.as_deref());

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
