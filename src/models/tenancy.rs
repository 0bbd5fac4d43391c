// src/models/tenancy.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// ---
// Cliente (o tenant: um município/rede de ensino)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Cliente {
    pub idcliente: i32,
    pub nome: Option<String>,
    pub municipio: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientesResponse {
    pub clientes: Vec<Cliente>,
}
