// src/lib.rs

pub mod cli;
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use config::{AppState, Config};
pub use routes::build_router;
