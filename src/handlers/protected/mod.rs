// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind `middleware::require_auth`, so `AuthUser`
// is always present in the request extensions.
pub mod auth;
pub mod posts;
pub mod user;
