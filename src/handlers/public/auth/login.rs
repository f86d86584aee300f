// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, response::Response};

use crate::api::{respond, Dispatch};
use crate::middleware::Reply;
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/login - Exchange credentials for a session token
///
/// Input: `{ "email", "password", "keepMeSignedIn"? }`
///
/// Output: `{ "data": { "token", "user": { "userId", "organizationId", "type", "is_archived" }, "expiresIn" } }`
/// where `expiresIn` is the token lifetime in seconds.
pub async fn login_post(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = AuthService::new(&state).login(request.body).await.map(Reply::ok);
    respond(&state, result)
}
