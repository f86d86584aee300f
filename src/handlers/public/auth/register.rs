// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::State, response::Response};

use crate::api::{respond, Dispatch};
use crate::middleware::Reply;
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/register - Create an account and send the welcome email
///
/// Input: `{ "email", "password", "firstName", "lastName" }`
pub async fn register_post(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = AuthService::new(&state)
        .register(request.body)
        .await
        .map(|_| Reply::success());
    respond(&state, result)
}
