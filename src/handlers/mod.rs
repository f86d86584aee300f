// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token, `require_auth` route layer)
//
// Handlers stay thin: build the service from `AppState`, hand it the
// `Dispatch` view of the request and pass the result to `respond`.
pub mod protected;
pub mod public;
