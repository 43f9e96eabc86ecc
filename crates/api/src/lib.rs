//! HTTP API layer for the audience ETL.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
