// HTTP API Error Types
use std::collections::BTreeMap;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::password::PasswordError;
use crate::auth::temp_token::TempTokenError;
use crate::auth::token::TokenError;
use crate::database::DatabaseError;
use crate::filter::FilterError;
use crate::mail::MailError;

/// Every failure a request can end in. Layer errors convert into this with
/// `From`, and the dispatch wrapper is the only place it becomes a response.
#[derive(Debug)]
pub enum ApiError {
    // 400
    Validation {
        message: String,
        errors: BTreeMap<String, String>,
    },
    BadRequest(String),

    // 401 / 403
    Authentication {
        message: String,
        status: StatusCode,
    },

    // 404
    NotFound(String),

    // 409
    Duplicate(String),

    // 500, detail only rendered outside production
    Storage {
        message: String,
        detail: Option<String>,
    },
    Server {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::Storage { .. } | ApiError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::BadRequest(msg) => msg,
            ApiError::Authentication { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::Duplicate(msg) => msg,
            ApiError::Storage { message, .. } => message,
            ApiError::Server { message, .. } => message,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Storage { detail, .. } | ApiError::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Response body. Validation errors use `{err:{message, errors}}`,
    /// everything else `{message, stack?}`.
    pub fn to_json(&self, expose_detail: bool) -> Value {
        match self {
            ApiError::Validation { message, errors } => json!({
                "err": {
                    "message": message,
                    "errors": errors,
                }
            }),
            _ => {
                let mut body = json!({ "message": self.message() });
                if expose_detail {
                    if let Some(detail) = self.detail() {
                        body["stack"] = json!(detail);
                    }
                }
                body
            }
        }
    }

    pub fn to_response(&self, expose_detail: bool) -> axum::response::Response {
        (self.status_code(), Json(self.to_json(expose_detail))).into_response()
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: BTreeMap<String, String>) -> Self {
        ApiError::Validation { message: message.into(), errors }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Authentication {
            message: message.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Authentication {
            message: message.into(),
            status: StatusCode::FORBIDDEN,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        ApiError::Duplicate(message.into())
    }

    pub fn server(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ApiError::Server {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, list)| {
                let message = list
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => format!("{}: {}", e.code, msg),
                        None => format!("{}: invalid {}", e.code, field),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                (field.to_string(), message)
            })
            .collect();
        ApiError::validation("Validation failed", errors)
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidBetween { .. } => {
                ApiError::bad_request("There can only be 2 values for between. i.e. dd-mm-yyyy,dd-mm-yyyy")
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Duplicate(msg) => ApiError::duplicate(msg),
            DatabaseError::Timeout(ms) => {
                tracing::error!("Database call exceeded {}ms", ms);
                ApiError::Storage {
                    message: "Database timeout".to_string(),
                    detail: Some(format!("query exceeded {}ms", ms)),
                }
            }
            other => {
                // Log the real error, the client only sees it outside production
                tracing::error!("Database error: {}", other);
                ApiError::Storage {
                    message: "Database error occurred".to_string(),
                    detail: Some(other.to_string()),
                }
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::unauthorized("Expired token"),
            TokenError::Invalid => ApiError::unauthorized("Invalid token"),
            TokenError::Signing(msg) => ApiError::server("Could not issue token", msg),
        }
    }
}

impl From<TempTokenError> for ApiError {
    fn from(err: TempTokenError) -> Self {
        match err {
            TempTokenError::NotFound => ApiError::unauthorized("Invalid Request, Token not found"),
            TempTokenError::Expired => ApiError::unauthorized("Invalid Request, token expired"),
            TempTokenError::TypeMismatch { .. } => ApiError::unauthorized("Invalid Token"),
            TempTokenError::Database(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing failed: {}", err);
        ApiError::server("Server Error", err)
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Mail delivery failed: {}", err);
        ApiError::server("Could not send email", err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Extractor rejections reach the client here without passing through
// `respond`. They never carry detail.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed before dispatch");
        } else {
            tracing::debug!(status = %self.status_code(), error = %self, "Request rejected before dispatch");
        }
        self.to_response(false)
    }
}
