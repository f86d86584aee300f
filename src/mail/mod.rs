pub mod templates;

use std::time::Duration;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("smtp transport: {0}")]
    Transport(String),

    #[error("could not render template: {0}")]
    Template(#[from] askama::Error),
}

/// Outbound e-mail. Implementations must be safe to share across requests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, html: &str, subject: &str) -> Result<(), MailError>;
}

/// Renders `template` and hands the HTML to `mailer`.
pub async fn send_template<T>(mailer: &dyn Mailer, to: &str, subject: &str, template: &T) -> Result<(), MailError>
where
    T: Template + Sync,
{
    let html = template.render()?;
    mailer.send(to, &html, subject).await
}

/// SMTP delivery through `lettre`'s tokio transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, host: &str) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|_| MailError::Address(config.from_address.clone()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(10)));

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        tracing::info!(host = %host, port = config.smtp_port, "SMTP mailer initialized");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, html: &str, subject: &str) -> Result<(), MailError> {
        let to_mailbox: Mailbox = to.parse().map_err(|_| MailError::Address(to.to_string()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        match self.transport.send(email).await {
            Ok(_) => {
                tracing::info!(to = %to, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to, "Failed to send email");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}

/// Used when no SMTP host is configured: records the message in the log.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, html: &str, subject: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, subject = %subject, bytes = html.len(), "SMTP not configured, email logged only");
        Ok(())
    }
}

/// Picks SMTP when a host is configured, the log mailer otherwise.
pub fn from_config(config: &MailConfig) -> Result<std::sync::Arc<dyn Mailer>, MailError> {
    match config.smtp_host.as_deref() {
        Some(host) if !host.trim().is_empty() => Ok(std::sync::Arc::new(SmtpMailer::new(config, host)?)),
        _ => {
            tracing::warn!("SMTP_HOST not set, outgoing email will only be logged");
            Ok(std::sync::Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: Option<&str>) -> MailConfig {
        MailConfig {
            smtp_host: host.map(str::to_string),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            from_address: "no-reply@atlas.test".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.send("a@b.com", "<p>hi</p>", "Hi").await.is_ok());
    }

    #[tokio::test]
    async fn smtp_mailer_rejects_bad_recipient_before_connecting() {
        let mailer = SmtpMailer::new(&config(Some("smtp.atlas.test")), "smtp.atlas.test").unwrap();
        let result = mailer.send("not an address", "<p>hi</p>", "Hi").await;
        assert!(matches!(result, Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn templates_render_before_sending() {
        use crate::mail::templates::{ForgotPasswordEmail, FORGOT_PASSWORD_SUBJECT};
        use crate::testing::RecordingMailer;

        let mailer = RecordingMailer::default();
        let template = ForgotPasswordEmail::new("https://app.atlas.test/reset-password/abc");
        send_template(&mailer, "a@b.com", FORGOT_PASSWORD_SUBJECT, &template)
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.com");
        assert!(sent[0].html.contains("reset-password"));
    }

    #[test]
    fn bad_from_address_is_refused() {
        let mut cfg = config(Some("smtp.atlas.test"));
        cfg.from_address = "nope".to_string();
        assert!(matches!(SmtpMailer::new(&cfg, "smtp.atlas.test"), Err(MailError::Address(_))));
    }
}
