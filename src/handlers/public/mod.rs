// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, registration, password recovery and service health.
pub mod auth;
pub mod health;
