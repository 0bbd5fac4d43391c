// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Admin ---
        handlers::admin::health,
        handlers::admin::flush_cache,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_usuario,
        handlers::auth::get_client,

        // --- Dashboard ---
        handlers::dashboard::post_totais,
        handlers::dashboard::get_filtros,
        handlers::dashboard::post_breakdowns,
        handlers::dashboard::post_analytics,
        handlers::dashboard::post_alertas,
        handlers::dashboard::post_mapa_escolas,

        // --- Geo ---
        handlers::geo::sync_escolas,
        handlers::geo::geocode_escolas,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginPayload,
            models::auth::LoginResponse,
            models::auth::UsuarioResponse,
            models::tenancy::Cliente,
            models::tenancy::ClientesResponse,

            // --- Filtros ---
            models::filters::MatriculaFilters,

            // --- DASHBOARD ---
            models::dashboard::TotaisResponse,
            models::dashboard::ComparativoAnual,
            models::dashboard::FiltrosResponse,
            models::dashboard::EscolaOpcao,
            models::dashboard::BreakdownItem,
            models::dashboard::BreakdownsResponse,
            models::dashboard::EscolaIndicadores,
            models::dashboard::AnalyticsResponse,
            models::dashboard::SerieMensal,
            models::dashboard::AlertaTipo,
            models::dashboard::AlertaEscola,
            models::dashboard::AlertasResponse,
            models::dashboard::EscolaMapa,
            models::dashboard::MapaResponse,

            // --- Geo ---
            models::geo::GeoScriptParams,
            models::geo::GeocodeMode,
            models::geo::FallbackPolicy,
            models::geo::SyncSummary,
            models::geo::GeocodeSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Login e dados do usuário"),
        (name = "Dashboard", description = "Indicadores de matrículas"),
        (name = "Geo", description = "Sincronização e geocodificação de escolas"),
        (name = "Admin", description = "Saúde e manutenção")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
