use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(cors(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/", get(public::health::root))
        .route("/health", get(public::health::health))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/register", post(auth::register_post))
        .route("/auth/forgot-password", post(auth::forgot_password_post))
        .route("/auth/forgot-password/:id", patch(auth::forgot_password_patch))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, posts, user};

    Router::new()
        .route("/auth/valid", get(auth::valid_get))
        .route("/posts", get(posts::posts_get).post(posts::posts_post))
        .route(
            "/posts/:id",
            get(posts::post_get).patch(posts::post_patch).delete(posts::post_delete),
        )
        .route("/user", get(user::user_get))
        .route("/user/:id", put(user::user_put))
        .route_layer(from_fn_with_state(state, require_auth))
}

/// `*` allows any origin; otherwise only the listed ones.
fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AnyOrigin);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Server Error" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;
    use axum::body::{to_bytes, Body};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app(test_state()).oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn root_names_the_service() {
        let (status, body) = send(Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Atlas API");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for (method, uri) in [
            (Method::GET, "/posts"),
            (Method::POST, "/posts"),
            (Method::GET, "/auth/valid"),
            (Method::GET, "/user"),
            (Method::DELETE, "/posts/5f8d0d55-b54b-4e2b-9f6e-0a1f1e4bd3c1"),
        ] {
            let (status, body) = send(method, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["message"], "Invalid token");
        }
    }

    #[tokio::test]
    async fn login_validation_runs_before_any_lookup() {
        let (status, body) =
            send(Method::POST, "/auth/login", Some(json!({ "email": "nope", "password": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["err"]["errors"]["email"].is_string());
    }

    #[tokio::test]
    async fn reset_with_malformed_id_is_a_bad_request() {
        let (status, body) = send(
            Method::PATCH,
            "/auth/forgot-password/not-a-uuid",
            Some(json!({ "password": "Secret2" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid id");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = send(Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn wildcard_and_listed_origins_build() {
        let _ = cors(&["*".to_string()]);
        let _ = cors(&["https://app.example".to_string(), "bad\norigin".to_string()]);
    }
}
