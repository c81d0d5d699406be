// src/lib.rs

pub mod api;
pub mod config;
pub mod diagnosis;
pub mod history;
pub mod server;
pub mod state;

pub use state::AppState;
