// handlers/protected/posts.rs - /posts and /posts/:id handlers

use axum::{extract::State, response::Response};

use crate::api::{respond, Dispatch};
use crate::middleware::Reply;
use crate::services::PostService;
use crate::state::AppState;

/// GET /posts?filter=&sort=&search=&skip=&limit= - `{ data: Post[], count }`
pub async fn posts_get(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = PostService::new(&state).list(request).await.map(Reply::page);
    respond(&state, result)
}

/// POST /posts - Create a post authored by the caller, 201 on success
pub async fn posts_post(State(state): State<AppState>, request: Dispatch) -> Response {
    let result = PostService::new(&state).create(request).await.map(Reply::created);
    respond(&state, result)
}

/// GET /posts/:id
pub async fn post_get(State(state): State<AppState>, request: Dispatch) -> Response {
    let service = PostService::new(&state);
    let result = match request.id() {
        Ok(id) => service.get(id).await.map(Reply::ok),
        Err(e) => Err(e),
    };
    respond(&state, result)
}

/// PATCH /posts/:id - Partial update
pub async fn post_patch(State(state): State<AppState>, request: Dispatch) -> Response {
    let service = PostService::new(&state);
    let result = match request.id() {
        Ok(id) => service.update(id, request).await.map(Reply::ok),
        Err(e) => Err(e),
    };
    respond(&state, result)
}

/// DELETE /posts/:id - Returns the deleted post
pub async fn post_delete(State(state): State<AppState>, request: Dispatch) -> Response {
    let service = PostService::new(&state);
    let result = match request.id() {
        Ok(id) => service.delete(id).await.map(Reply::ok),
        Err(e) => Err(e),
    };
    respond(&state, result)
}
