// tests/api.rs
//
// Testes do router completo com uma pool "preguiçosa": nada aqui precisa de
// um Postgres de verdade.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use matriculas_backend::{
    build_router,
    models::auth::Claims,
    services::cache::MemoryCache,
    AppState, Config,
};

const SECRET: &str = "segredo-de-teste";

fn test_config() -> Config {
    Config {
        database_url: "postgres://postgres@127.0.0.1:1/matriculas_test".into(),
        jwt_secret: SECRET.into(),
        port: 0,
        db_max_connections: 1,
        cache_ttl: Duration::from_secs(60),
        filtros_cache_ttl: Duration::from_secs(60),
        cors_origin: None,
        scripts_dir: None,
    }
}

fn app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(&config.database_url)
        .unwrap();
    build_router(AppState::from_pool(pool, config, Arc::new(MemoryCache::new())))
}

fn token(clientes: Vec<i32>, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        cpf: "12345678900".into(),
        clientes,
        exp: (now + exp_offset_secs) as usize,
        iat: now as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let response = app()
        .oneshot(post_json("/api/totais", None, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"], "Token não fornecido.");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let response = app()
        .oneshot(post_json("/api/totais", Some("Bearer abc.def.ghi"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"], "Token inválido.");
}

#[tokio::test]
async fn non_bearer_scheme_is_invalid() {
    let response = app()
        .oneshot(post_json("/api/totais", Some("Basic dXNlcjpwYXNz"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"], "Token inválido.");
}

#[tokio::test]
async fn expired_token_is_reported_as_expired() {
    let auth = format!("Bearer {}", token(vec![1], -3600));
    let response = app()
        .oneshot(post_json("/api/totais", Some(&auth), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        read_json(response).await["error"],
        "Token expirado. Faça login novamente."
    );
}

#[tokio::test]
async fn tenant_outside_the_token_is_forbidden() {
    let auth = format!("Bearer {}", token(vec![1, 2], 3600));
    let response = app()
        .oneshot(post_json("/api/breakdowns", Some(&auth), json!({ "idcliente": 9 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert!(body.get("porSexo").is_none());
}

#[tokio::test]
async fn user_without_tenants_is_forbidden() {
    let auth = format!("Bearer {}", token(vec![], 3600));
    let response = app()
        .oneshot(
            Request::get("/api/filtros?anoLetivo=2024")
                .header(header::AUTHORIZATION, auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn database_failure_returns_zeroed_analytics() {
    let auth = format!("Bearer {}", token(vec![1], 3600));
    let response = app()
        .oneshot(post_json("/api/analytics", Some(&auth), json!({ "anoLetivo": "2024" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = read_json(response).await;
    assert_eq!(body["totalMatriculas"], 0);
    assert_eq!(body["taxaEvasao"], 0.0);
    assert!(body["serieMensal"].as_array().unwrap().is_empty());
    assert!(body["error"].is_string());
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn login_payload_is_validated_before_the_database() {
    let response = app()
        .oneshot(post_json("/api/login", None, json!({ "cpf": "123", "senha": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["details"]["cpf"].is_array());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = app()
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["paths"]["/api/totais"].is_object());
}
