#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use atlas_api::config::AppConfig;
use atlas_api::database::Store;
use atlas_api::mail::{MailError, Mailer};
use atlas_api::AppState;

pub const PASSWORD: &str = "Secret1";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl RecordingMailer {
    pub fn sent_to(&self, to: &str) -> Vec<SentMail> {
        self.sent
            .lock()
            .map(|sent| sent.iter().filter(|m| m.to == to).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, html: &str, subject: &str) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html.to_string(),
            });
        }
        Ok(())
    }
}

/// In-process app against the database named by `TEST_DATABASE_URL`.
pub struct TestApp {
    pub state: AppState,
    pub mailer: RecordingMailer,
    router: Router,
}

impl TestApp {
    /// `None` when no test database is configured; callers skip.
    pub async fn spawn() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return Ok(None);
        };

        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.clone()),
            "DATABASE_MAX_CONNECTIONS" => Some("5".to_string()),
            "JWT_SECRET" => Some("integration-test-secret".to_string()),
            "FRONTEND_URL" => Some("https://app.atlas.test".to_string()),
            _ => None,
        });

        let store = Store::connect(&config.database)
            .await
            .context("failed to connect to TEST_DATABASE_URL")?;
        store.migrate().await?;

        let mailer = RecordingMailer::default();
        let state = AppState::new(config, store, Arc::new(mailer.clone()));
        let router = atlas_api::app(state.clone());
        Ok(Some(Self { state, mailer, router }))
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", uri))?
        };
        Ok((status, json))
    }

    pub async fn register(&self, email: &str) -> Result<()> {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "email": email, "password": PASSWORD, "firstName": "A", "lastName": "B" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        Ok(())
    }

    /// Raw status and body of a login attempt.
    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers a fresh account and logs in. Returns `(token, user_id)`.
    pub async fn signed_in_user(&self) -> Result<(String, Uuid, String)> {
        let email = unique_email();
        self.register(&email).await?;
        let (status, body) = self.login(&email, PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);

        let token = body["data"]["token"].as_str().context("token missing")?.to_string();
        let user_id = body["data"]["user"]["userId"]
            .as_str()
            .context("userId missing")?
            .parse()?;
        Ok((token, user_id, email))
    }
}

pub fn unique_email() -> String {
    format!("user-{}@atlas.test", Uuid::new_v4().simple())
}
