// handlers/protected/user.rs - GET /user and PUT /user/:id handlers

use axum::{extract::State, response::Response};

use crate::api::{respond, Dispatch};
use crate::middleware::Reply;
use crate::services::UserService;
use crate::state::AppState;

/// GET /user - The caller's own profile
pub async fn user_get(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = match request.user() {
        Ok(caller) => UserService::new(&state).profile(caller).await.map(Reply::ok),
        Err(e) => Err(e),
    };
    respond(&state, result)
}

/// PUT /user/:id - Profile update; a `password` key in the body is ignored
pub async fn user_put(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = match (request.user(), request.id()) {
        (Ok(caller), Ok(id)) => UserService::new(&state)
            .update(caller, id, request.body.clone())
            .await
            .map(Reply::ok),
        (Err(e), _) | (_, Err(e)) => Err(e),
    };
    respond(&state, result)
}
