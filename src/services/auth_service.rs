use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::temp_token::{self, forgot_password_ttl, FORGOT_PASSWORD};
use crate::auth::{AuthClaims, Role, TokenService};
use crate::database::{users, DatabaseError, Store};
use crate::entity::NewUser;
use crate::error::ApiError;
use crate::mail::templates::{ForgotPasswordEmail, WelcomeEmail, FORGOT_PASSWORD_SUBJECT, WELCOME_SUBJECT};
use crate::mail::{send_template, Mailer};
use crate::middleware::AuthUser;
use crate::state::AppState;

const INVALID_LOGIN: &str = "Invalid login details";
const NO_ACCESS: &str = "User does not have access to the system";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "email must be an email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 60, message = "password must be between 1 and 60 characters"))]
    pub password: String,
    #[serde(default)]
    pub keep_me_signed_in: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "email must be an email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 60, message = "password must be between 1 and 60 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "firstName must be between 1 and 20 characters"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "lastName must be between 1 and 20 characters"))]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(email(message = "email must be an email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 60, message = "password must be between 1 and 60 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthClaims,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
}

/// Deserializes and validates a request DTO.
fn read_body<T: DeserializeOwned + Validate>(body: Value) -> Result<T, ApiError> {
    let request: T =
        serde_json::from_value(body).map_err(|e| ApiError::bad_request(format!("Invalid data supplied: {}", e)))?;
    request.validate()?;
    Ok(request)
}

pub struct AuthService {
    store: Store,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            tokens: state.tokens.clone(),
            mailer: state.mailer.clone(),
            frontend_url: state.config.mail.frontend_url.clone(),
        }
    }

    /// Every credential failure reads the same so accounts cannot be probed.
    pub async fn login(&self, body: Value) -> Result<LoginResponse, ApiError> {
        let request: LoginRequest = read_body(body)?;

        let Some(user) = users::find_by_email(&self.store, &request.email).await? else {
            tracing::warn!("Login attempt for unknown account");
            return Err(ApiError::unauthorized(INVALID_LOGIN));
        };
        if user.is_archived {
            tracing::warn!(user_id = %user.id, "Login attempt for archived account");
            return Err(ApiError::unauthorized(NO_ACCESS));
        }
        if !verify_password(&request.password, &user.password) {
            tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ApiError::unauthorized(INVALID_LOGIN));
        }

        let claims = AuthClaims {
            user_id: user.id,
            organization_id: user.organization_id,
            role: Role::from_super_admin(user.is_super_admin),
            is_archived: user.is_archived,
        };
        let issued = self.tokens.issue(&claims, request.keep_me_signed_in)?;
        tracing::info!(user_id = %user.id, extended = request.keep_me_signed_in, "User logged in");

        Ok(LoginResponse {
            token: issued.token,
            user: claims,
            expires_in: issued.expires_in,
        })
    }

    pub async fn register(&self, body: Value) -> Result<(), ApiError> {
        let request: RegisterRequest = read_body(body)?;

        if users::email_exists(&self.store, &request.email).await? {
            return Err(ApiError::Authentication {
                message: "Email already exists".to_string(),
                status: StatusCode::BAD_REQUEST,
            });
        }

        let password_hash = hash_password(&request.password)?;
        let user = users::create(
            &self.store,
            &NewUser {
                email: request.email.clone(),
                password_hash,
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
            },
        )
        .await?;
        tracing::info!(user_id = %user.id, "User registered");

        let url = format!("{}/login", self.frontend_url);
        let welcome = WelcomeEmail::new(&request.first_name, &request.last_name, &request.email, &url);
        if let Err(e) = send_template(&*self.mailer, &request.email, WELCOME_SUBJECT, &welcome).await {
            tracing::error!(user_id = %user.id, error = %e, "Welcome email not sent");
        }
        Ok(())
    }

    /// Succeeds whether or not the address belongs to an account.
    pub async fn forgot_password(&self, body: Value) -> Result<(), ApiError> {
        let request: ForgotPasswordRequest = read_body(body)?;

        if !users::email_exists(&self.store, &request.email).await? {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        }

        let id = temp_token::create(
            &self.store,
            json!({ "email": request.email }),
            FORGOT_PASSWORD,
            forgot_password_ttl(),
        )
        .await?;

        let url = format!("{}/reset-password/{}", self.frontend_url, id);
        let reset = ForgotPasswordEmail::new(&url);
        if let Err(e) = send_template(&*self.mailer, &request.email, FORGOT_PASSWORD_SUBJECT, &reset).await {
            tracing::error!(error = %e, "Password reset email not sent");
        }
        Ok(())
    }

    /// Spends the reset token and sets the new password in one transaction.
    /// On any failure the transaction rolls back and the token stays valid.
    pub async fn reset_password(&self, id: Uuid, body: Value) -> Result<(), ApiError> {
        let request: ResetPasswordRequest = read_body(body)?;
        let password_hash = hash_password(&request.password)?;

        let mut tx = self.store.pool().begin().await.map_err(DatabaseError::from)?;
        let timeout = self.store.query_timeout();
        let outcome = match tokio::time::timeout(timeout, apply_reset(&mut *tx, id, &password_hash)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DatabaseError::Timeout(timeout.as_millis() as u64).into()),
        };

        match outcome {
            Ok(user_id) => {
                tx.commit().await.map_err(DatabaseError::from)?;
                tracing::info!(user_id = %user_id, "Password reset");
                Ok(())
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(error = %e, "Rollback after failed password reset");
                }
                Err(err)
            }
        }
    }

    pub fn valid(user: &AuthUser) -> Value {
        json!({ "success": true, "userType": user.role.as_str() })
    }
}

async fn apply_reset(conn: &mut PgConnection, token_id: Uuid, password_hash: &str) -> Result<Uuid, ApiError> {
    let token = temp_token::take(&mut *conn, token_id, FORGOT_PASSWORD, Utc::now()).await?;

    let email = token
        .payload()
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::unauthorized("Invalid user data"))?;

    let user_id = users::id_by_email(&mut *conn, email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid user data"))?;

    users::update_password(&mut *conn, user_id, password_hash).await?;
    Ok(user_id)
}
