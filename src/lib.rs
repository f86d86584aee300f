pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod router;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use router::app;
pub use state::AppState;
