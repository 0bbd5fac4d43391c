// src/services/geocoding.rs
//
// Busca -> cadência -> requisição -> pontuação -> aceite por limiar.

pub mod client;
pub mod matcher;
pub mod pacer;
pub mod query;
pub mod score;

pub use client::{GeocodeError, NominatimClient};
pub use matcher::{CentroMunicipio, GeocodeMatcher, MatchOutcome};
