pub mod auth;
pub mod dashboard;
pub mod filters;
pub mod geo;
pub mod tenancy;
