// handlers/public/auth/forgot_password.rs - POST /auth/forgot-password and
// PATCH /auth/forgot-password/:id handlers

use axum::{extract::State, response::Response};

use crate::api::{respond, Dispatch};
use crate::middleware::Reply;
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/forgot-password - Email a reset link. Answers the same way
/// for unknown addresses.
pub async fn forgot_password_post(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = AuthService::new(&state)
        .forgot_password(request.body)
        .await
        .map(|_| Reply::success());
    respond(&state, result)
}

/// PATCH /auth/forgot-password/:id - Set a new password with a reset token
pub async fn forgot_password_patch(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = match request.id() {
        Ok(id) => AuthService::new(&state).reset_password(id, request.body).await,
        Err(e) => Err(e),
    };
    respond(&state, result.map(|_| Reply::success()))
}
