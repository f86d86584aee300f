//! Single-use, typed, time-boxed credentials such as password-reset links.
//!
//! `consume` validates without deleting and leaves removal to the caller.
//! `take` deletes and validates in one statement on the caller's
//! connection, so inside a transaction the token is spent exactly when the
//! dependent change commits.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgConnection};
use thiserror::Error;
use uuid::Uuid;

use crate::database::{DatabaseError, Store};

pub const FORGOT_PASSWORD: &str = "forgot-password";

pub fn forgot_password_ttl() -> Duration {
    Duration::hours(48)
}

/// How long an expired token is kept so a late click still reads as
/// "expired" rather than "not found".
pub fn purge_grace() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Error)]
pub enum TempTokenError {
    #[error("temp token not found")]
    NotFound,

    #[error("temp token expired")]
    Expired,

    #[error("temp token type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for TempTokenError {
    fn from(err: sqlx::Error) -> Self {
        TempTokenError::Database(err.into())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TempToken {
    pub id: Uuid,
    pub token: Json<Value>,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TempToken {
    /// Expired once `now` reaches `expires_at`; expiry is checked before type.
    pub fn check(&self, expected_kind: &str, now: DateTime<Utc>) -> Result<(), TempTokenError> {
        if now >= self.expires_at {
            return Err(TempTokenError::Expired);
        }
        if self.kind != expected_kind {
            return Err(TempTokenError::TypeMismatch {
                expected: expected_kind.to_string(),
                found: self.kind.clone(),
            });
        }
        Ok(())
    }

    pub fn payload(&self) -> &Value {
        &self.token.0
    }
}

/// Stores a new token. Tokens past their expiry by more than
/// `purge_grace` are swept first; a failed sweep is only logged.
pub async fn create(store: &Store, payload: Value, kind: &str, ttl: Duration) -> Result<Uuid, TempTokenError> {
    let now = Utc::now();
    match purge_expired(store, now - purge_grace()).await {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "Purged expired temp tokens"),
        Err(e) => tracing::warn!(error = %e, "Could not purge expired temp tokens"),
    }

    let expires_at = now + ttl;
    let id = store
        .timed(async {
            let id: Uuid = sqlx::query_scalar(
                "INSERT INTO temp_tokens (token, type, expires_at) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(Json(&payload))
            .bind(kind)
            .bind(expires_at)
            .fetch_one(store.pool())
            .await?;
            Ok(id)
        })
        .await?;
    Ok(id)
}

/// Deletes every token that expired before `cutoff`.
pub async fn purge_expired(store: &Store, cutoff: DateTime<Utc>) -> Result<u64, TempTokenError> {
    let removed = store
        .timed(async {
            let result = sqlx::query("DELETE FROM temp_tokens WHERE expires_at < $1")
                .bind(cutoff)
                .execute(store.pool())
                .await?;
            Ok(result.rows_affected())
        })
        .await?;
    Ok(removed)
}

/// Looks the token up and validates it. Does not delete.
pub async fn consume(store: &Store, id: Uuid, expected_kind: &str) -> Result<TempToken, TempTokenError> {
    let token = store
        .timed(async {
            let row = sqlx::query_as::<_, TempToken>("SELECT * FROM temp_tokens WHERE id = $1")
                .bind(id)
                .fetch_optional(store.pool())
                .await?;
            Ok(row)
        })
        .await?
        .ok_or(TempTokenError::NotFound)?;

    token.check(expected_kind, Utc::now())?;
    Ok(token)
}

/// Returns whether a row was removed.
pub async fn delete(store: &Store, id: Uuid) -> Result<bool, TempTokenError> {
    let removed = store
        .timed(async {
            let result = sqlx::query("DELETE FROM temp_tokens WHERE id = $1")
                .bind(id)
                .execute(store.pool())
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await?;
    Ok(removed)
}

/// Deletes the token and validates what was deleted. Run it inside a
/// transaction and roll back on error to keep the token usable.
pub async fn take(
    conn: &mut PgConnection,
    id: Uuid,
    expected_kind: &str,
    now: DateTime<Utc>,
) -> Result<TempToken, TempTokenError> {
    let token = sqlx::query_as::<_, TempToken>("DELETE FROM temp_tokens WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TempTokenError::NotFound)?;

    token.check(expected_kind, now)?;
    Ok(token)
}
