// handlers/protected/auth/valid.rs - GET /auth/valid handler

use axum::Json;
use serde_json::Value;

use crate::middleware::AuthUser;
use crate::services::AuthService;

/// GET /auth/valid - `{ "success": true, "userType": "user" | "super_admin" }`
///
/// Reaching the handler means the token passed the authorization pipeline.
pub async fn valid_get(user: AuthUser) -> Json<Value> {
    Json(AuthService::valid(&user))
}
