//! Boundary between axum and the controllers in `services`.
//!
//! `Dispatch` pulls the path id, JSON body, query options and caller out of
//! the request; `respond` is the single place a controller result or error
//! turns into an HTTP response.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::error::ApiError;
use crate::filter::{Filter, FilterError, FilterOp, QueryOptions, Value as FilterValue};
use crate::middleware::{AuthUser, Reply};
use crate::state::AppState;

/// Typed view of a request, handed to a controller.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub method: Method,
    pub id: Option<Uuid>,
    pub body: Value,
    pub query: QueryOptions,
    pub user: Option<AuthUser>,
}

impl Dispatch {
    /// The `:id` path segment, required by single-record routes.
    pub fn id(&self) -> Result<Uuid, ApiError> {
        self.id.ok_or_else(|| ApiError::bad_request("Missing id"))
    }

    /// The caller, required by routes behind `require_auth`.
    pub fn user(&self) -> Result<&AuthUser, ApiError> {
        self.user.as_ref().ok_or_else(|| ApiError::unauthorized("Invalid token"))
    }
}

#[axum::async_trait]
impl FromRequest<AppState> for Dispatch {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let user = parts.extensions.get::<AuthUser>().cloned();
        let method = parts.method.clone();

        // Routes without path parameters reject `Path`; that just means no id.
        let id = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state).await {
            Ok(Path(params)) => match params.get("id") {
                Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid id"))?),
                None => None,
            },
            Err(_) => None,
        };

        let query = if method == Method::GET {
            build_query(parts.uri.query(), user.is_some(), &state.config.query)?
        } else {
            QueryOptions::default()
        };

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read request body: {}", e)))?;
        let mut body = parse_body(&bytes)?;

        if method == Method::POST {
            if let Some(user) = &user {
                inject_organization(&mut body, user.organization_id);
            }
        }

        Ok(Self {
            method,
            id,
            body,
            query,
            user,
        })
    }
}

/// An empty body reads as `{}`.
fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

/// Fills `organization_id` from the caller unless the body already names one.
pub fn inject_organization(body: &mut Value, organization_id: Option<Uuid>) {
    let (Value::Object(map), Some(org)) = (body, organization_id) else {
        return;
    };
    match map.get("organization_id") {
        Some(existing) if !existing.is_null() => {}
        _ => {
            map.insert("organization_id".to_string(), Value::String(org.to_string()));
        }
    }
}

const ARCHIVED: &str = "is_archived";

/// Collection-read options from the raw query string. Authenticated callers
/// only see live rows unless they filter on `is_archived` themselves.
///
/// An explicit `is_archived` filter must compare against booleans. Anything
/// else would be dropped by the entity layer and take the implicit filter
/// with it, so it is refused here instead.
pub fn build_query(raw: Option<&str>, authenticated: bool, config: &QueryConfig) -> Result<QueryOptions, FilterError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .into_owned()
        .collect();

    let mut options = QueryOptions::from_pairs(&pairs, config)?;
    if let Some(bad) = options.filter.iter().find(|f| f.field == ARCHIVED && !is_boolean_predicate(f)) {
        return Err(FilterError::InvalidOperatorData(format!(
            "{}{} expects true or false",
            ARCHIVED,
            bad.op.token()
        )));
    }
    if authenticated && !options.has_filter_on(ARCHIVED) {
        options.filter.push(Filter::eq(ARCHIVED, false));
    }
    Ok(options)
}

fn is_boolean_predicate(filter: &Filter) -> bool {
    filter.op != FilterOp::UpperEq && filter.values.iter().all(|v| matches!(v, FilterValue::Bool(_)))
}

/// Single exit point for controller results.
pub fn respond<T: Serialize>(state: &AppState, result: Result<Reply<T>, ApiError>) -> Response {
    match result {
        Ok(reply) => reply.into_response(),
        Err(err) => {
            if err.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!(error = %err, "Request failed");
            } else {
                tracing::debug!(status = %err.status_code(), error = %err, "Request rejected");
            }
            err.to_response(state.expose_error_detail())
        }
    }
}
