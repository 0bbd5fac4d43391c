// src/handlers/dashboard.rs
//
// Todos os endpoints recebem os mesmos filtros. Em erro 500 a resposta traz
// o DTO zerado junto de `error`/`details`.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::{AppError, FallbackError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::authorize_tenant},
    models::{
        dashboard::{
            AlertasResponse, AnalyticsResponse, BreakdownsResponse, FiltrosResponse, MapaResponse,
            TotaisResponse,
        },
        filters::MatriculaFilters,
    },
};

// POST /api/totais
#[utoipa::path(
    post,
    path = "/api/totais",
    tag = "Dashboard",
    request_body = MatriculaFilters,
    responses(
        (status = 200, description = "Cards de totais e comparativo com o ano anterior", body = TotaisResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente"),
        (status = 500, description = "Erro; corpo zerado com error/details", body = TotaisResponse)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn post_totais(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(filters): Json<MatriculaFilters>,
) -> Result<Json<TotaisResponse>, FallbackError<TotaisResponse>> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let totais = app_state.dashboard_service.get_totais(&filters, &user).await?;
    Ok(Json(totais))
}

// GET /api/filtros
#[utoipa::path(
    get,
    path = "/api/filtros",
    tag = "Dashboard",
    params(MatriculaFilters),
    responses(
        (status = 200, description = "Opções disponíveis para os filtros", body = FiltrosResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_filtros(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filters): Query<MatriculaFilters>,
) -> Result<Json<FiltrosResponse>, AppError> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let filtros = app_state.dashboard_service.get_filtros(&filters, &user).await?;
    Ok(Json(filtros))
}

// POST /api/breakdowns
#[utoipa::path(
    post,
    path = "/api/breakdowns",
    tag = "Dashboard",
    request_body = MatriculaFilters,
    responses(
        (status = 200, description = "Quebras por categoria e tabela por escola", body = BreakdownsResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente"),
        (status = 500, description = "Erro; corpo zerado com error/details", body = BreakdownsResponse)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn post_breakdowns(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(filters): Json<MatriculaFilters>,
) -> Result<Json<BreakdownsResponse>, FallbackError<BreakdownsResponse>> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let breakdowns = app_state
        .dashboard_service
        .get_breakdowns(&filters, &user)
        .await?;
    Ok(Json(breakdowns))
}

// POST /api/analytics
#[utoipa::path(
    post,
    path = "/api/analytics",
    tag = "Dashboard",
    request_body = MatriculaFilters,
    responses(
        (status = 200, description = "Série mensal, taxas e indicadores por escola", body = AnalyticsResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente"),
        (status = 500, description = "Erro; corpo zerado com error/details", body = AnalyticsResponse)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn post_analytics(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(filters): Json<MatriculaFilters>,
) -> Result<Json<AnalyticsResponse>, FallbackError<AnalyticsResponse>> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let analytics = app_state
        .dashboard_service
        .get_analytics(&filters, &user)
        .await?;
    Ok(Json(analytics))
}

// POST /api/alertas
#[utoipa::path(
    post,
    path = "/api/alertas",
    tag = "Dashboard",
    request_body = MatriculaFilters,
    responses(
        (status = 200, description = "Escolas com evasão alta, lotadas ou subutilizadas", body = AlertasResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente"),
        (status = 500, description = "Erro; corpo zerado com error/details", body = AlertasResponse)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn post_alertas(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(filters): Json<MatriculaFilters>,
) -> Result<Json<AlertasResponse>, FallbackError<AlertasResponse>> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let alertas = app_state.dashboard_service.get_alertas(&filters, &user).await?;
    Ok(Json(alertas))
}

// POST /api/map/escolas-ativas
#[utoipa::path(
    post,
    path = "/api/map/escolas-ativas",
    tag = "Dashboard",
    request_body = MatriculaFilters,
    responses(
        (status = 200, description = "Escolas com coordenadas e matrículas ativas", body = MapaResponse),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao cliente"),
        (status = 500, description = "Erro; corpo zerado com error/details", body = MapaResponse)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn post_mapa_escolas(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(filters): Json<MatriculaFilters>,
) -> Result<Json<MapaResponse>, FallbackError<MapaResponse>> {
    let user = authorize_tenant(&user, filters.idcliente)?;
    let mapa = app_state.dashboard_service.get_mapa(&filters, &user).await?;
    Ok(Json(mapa))
}
