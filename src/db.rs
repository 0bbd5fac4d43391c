pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod matriculas_repo;
pub use matriculas_repo::MatriculasRepository;
pub mod escolas_geo_repo;
pub use escolas_geo_repo::EscolasGeoRepository;
