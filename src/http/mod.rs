//! HTTP surface: router and admission checks

pub mod middleware;
pub mod routes;

pub use routes::build_router;
