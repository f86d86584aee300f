use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_TOKEN_HOURS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    SuperAdmin,
}

impl Role {
    pub fn from_super_admin(is_super_admin: bool) -> Self {
        if is_super_admin {
            Role::SuperAdmin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::SuperAdmin => "super_admin",
        }
    }
}

/// Identity carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "organizationId")]
    pub organization_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub role: Role,
    pub is_archived: bool,
}

/// Wire form: identity plus registered time claims.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    identity: AuthClaims,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

fn lifetime_hours(hours: u64) -> Duration {
    Duration::hours(hours.clamp(1, MAX_TOKEN_HOURS) as i64)
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
    extended_expiry: Duration,
}

impl TokenService {
    /// Lifetimes are clamped to `1..=MAX_TOKEN_HOURS`; `AppConfig::validate`
    /// reports out-of-range values before the server starts.
    pub fn new(config: &SecurityConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry: lifetime_hours(config.jwt_expiry_hours),
            extended_expiry: lifetime_hours(config.jwt_extended_expiry_hours),
        }
    }

    /// `extended` selects the keep-me-signed-in lifetime.
    pub fn issue(&self, claims: &AuthClaims, extended: bool) -> Result<IssuedToken, TokenError> {
        let lifetime = if extended { self.extended_expiry } else { self.expiry };
        self.issue_at(claims, Utc::now(), lifetime)
    }

    pub fn issue_at(
        &self,
        claims: &AuthClaims,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let wire = SessionClaims {
            identity: claims.clone(),
            exp: (issued_at + lifetime).timestamp(),
            iat: issued_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_in: lifetime.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<AuthClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.identity)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
