pub mod auth;
pub mod cache;
pub mod dashboard_service;
pub mod filters;
pub mod geo_sync_service;
pub mod geocode_service;
pub mod geocoding;
pub mod metrics;
pub mod script_runner;
