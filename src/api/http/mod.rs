// src/api/http/mod.rs

pub mod diagnosis;
pub mod handlers;
pub mod history;
pub mod router;

pub use router::{api_router, http_router, API_VERSION};
