use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::Role;
use crate::database::users;
use crate::entity::User;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_EXPIRED: &str = "Session expired, please login again.";

/// The caller behind a protected request, loaded fresh from the store.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<Uuid>,
    pub role: Role,
}

impl AuthUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            organization_id: user.organization_id,
            role: Role::from_super_admin(user.is_super_admin),
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Invalid token"))
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Missing and archived accounts are both reported as an expired session.
pub fn check_user(user: Option<User>) -> Result<User, ApiError> {
    match user {
        Some(user) if !user.is_archived => Ok(user),
        _ => Err(ApiError::unauthorized(SESSION_EXPIRED)),
    }
}

/// Verifies the bearer token, reloads the user and applies the optional
/// role list. An empty list admits every active user.
pub async fn authorize(state: &AppState, headers: &HeaderMap, permissions: &[Role]) -> Result<AuthUser, ApiError> {
    let token = extract_bearer(headers).ok_or_else(|| ApiError::unauthorized("Invalid token"))?;
    let claims = state.tokens.verify(token)?;

    let user = users::find_by_id(&state.store, claims.user_id).await?;
    let user = AuthUser::from(check_user(user)?);

    if !permissions.is_empty() && !permissions.contains(&user.role) {
        return Err(ApiError::forbidden("You do not have permission to perform this action"));
    }
    Ok(user)
}

/// Route layer for protected routes. Short-circuits with the error response
/// on failure, otherwise stores `AuthUser` in the request extensions.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authorize(&state, request.headers(), &[]).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "Request authorized");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), error = %err, "Authorization failed");
            err.to_response(state.expose_error_detail())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims, test_state};
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    fn user(is_archived: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password: "$argon2id$stub".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            is_super_admin: false,
            organization_id: None,
            is_archived,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn protected() -> Router {
        let state = test_state();
        Router::new()
            .route("/secret", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().uri("/secret");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = protected().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn archived_or_missing_user_is_an_expired_session() {
        for candidate in [None, Some(user(true))] {
            match check_user(candidate) {
                Err(err) => {
                    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
                    assert_eq!(err.message(), SESSION_EXPIRED);
                }
                Ok(_) => panic!("expected rejection"),
            }
        }
        assert!(check_user(Some(user(false))).is_ok());
    }

    #[test]
    fn auth_user_role_follows_the_stored_flag() {
        let mut admin = user(false);
        admin.is_super_admin = true;
        assert!(AuthUser::from(admin).is_super_admin());
        assert_eq!(AuthUser::from(user(false)).role, Role::User);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let state = test_state();
        let issued = state
            .tokens
            .issue_at(&claims(Role::User), Utc::now() - Duration::hours(2), Duration::hours(1))
            .unwrap();
        let (status, body) = call(Some(&issued.token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Expired token");
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let state = test_state();
        let issued = state.tokens.issue(&claims(Role::User), false).unwrap();
        let tampered = format!("{}x", issued.token);
        let (status, body) = call(Some(&tampered)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }
}
