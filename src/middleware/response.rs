use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::Page;

/// Controller result: the payload plus an optional total for list reads.
/// Serialized as `{data, count?}`.
#[derive(Debug)]
pub struct Reply<T: Serialize> {
    pub data: T,
    pub count: Option<i64>,
    pub status: StatusCode,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            count: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(Envelope {
            data: &self.data,
            count: self.count,
        })
    }
}

impl<T: Serialize> Reply<Vec<T>> {
    pub fn page(page: Page<T>) -> Self {
        Self::ok(page.data).with_count(page.count)
    }
}

impl Reply<Value> {
    /// `{data:{success:true}}`, the acknowledgement used by the auth flows.
    pub fn success() -> Self {
        Self::ok(json!({ "success": true }))
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self.to_json() {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Failed to serialize response data" })),
                )
                    .into_response()
            }
        }
    }
}
