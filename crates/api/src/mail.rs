//! Outgoing mail for freshly minted API keys.
//!
//! [`Mailer`] wraps the `lettre` async SMTP transport. When `SMTP_HOST` is
//! not set the mailer is disabled and messages are logged and dropped.

use chrono::Datelike;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{lookup_var, parse_var, ConfigError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@kbase.local";

const API_KEY_SUBJECT: &str = "API KEY";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub from_name: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Connect with implicit TLS instead of STARTTLS.
    pub implicit_tls: bool,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` if `SMTP_HOST` is not set.
    ///
    /// | Variable           | Required | Default               |
    /// |--------------------|----------|-----------------------|
    /// | `SMTP_HOST`        | yes      |                       |
    /// | `SMTP_PORT`        | no       | `587`                 |
    /// | `SMTP_FROM`        | no       | `noreply@kbase.local` |
    /// | `EMAILS_FROM_NAME` | no       | project name          |
    /// | `SMTP_USER`        | no       |                       |
    /// | `SMTP_PASSWORD`    | no       |                       |
    /// | `SMTP_SSL`         | no       | `false`               |
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    pub fn from_lookup(
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = lookup_var(lookup, "SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_var(lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            from_address: lookup_var(lookup, "SMTP_FROM")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            from_name: lookup_var(lookup, "EMAILS_FROM_NAME"),
            smtp_user: lookup_var(lookup, "SMTP_USER"),
            smtp_password: lookup_var(lookup, "SMTP_PASSWORD"),
            implicit_tls: parse_var(lookup, "SMTP_SSL", false)?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

pub struct Mailer {
    config: Option<EmailConfig>,
    project_name: String,
}

impl Mailer {
    pub fn new(config: Option<EmailConfig>, project_name: impl Into<String>) -> Self {
        Self {
            config,
            project_name: project_name.into(),
        }
    }

    /// A mailer that only logs.
    pub fn disabled(project_name: impl Into<String>) -> Self {
        Self::new(None, project_name)
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Mail a plaintext API key to its owner. Failures are logged, never
    /// returned.
    pub async fn send_api_key(&self, to_email: &str, api_key: &str) {
        let Some(config) = &self.config else {
            tracing::warn!(to = to_email, "SMTP not configured, API key mail skipped");
            return;
        };

        let html = render_api_key_html(&self.project_name, api_key, chrono::Utc::now().year());
        match self.send(config, to_email, API_KEY_SUBJECT, html).await {
            Ok(()) => tracing::info!(to = to_email, "API key mail sent"),
            Err(e) => tracing::error!(to = to_email, error = %e, "Failed to send API key mail"),
        }
    }

    async fn send(
        &self,
        config: &EmailConfig,
        to_email: &str,
        subject: &str,
        html: String,
    ) -> Result<(), EmailError> {
        let from_name = config
            .from_name
            .clone()
            .unwrap_or_else(|| self.project_name.clone());
        let from = Mailbox::new(Some(from_name), config.from_address.parse()?);

        let email = Message::builder()
            .from(from)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let relay = if config.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let mut transport_builder = relay.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;
        Ok(())
    }
}

/// HTML body of the API key mail.
pub fn render_api_key_html(project_name: &str, api_key: &str, year: i32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #222;">
    <h2>{project_name}</h2>
    <p>Here is your API key. Keep it secret; it will not be shown again.</p>
    <p><code style="font-size: 1.1em; background: #f4f4f4; padding: 4px 8px;">{api_key}</code></p>
    <p>Exchange it for an access token at <code>/v1/auth/generate/token</code>.</p>
    <hr>
    <small>&copy; {year} {project_name}</small>
  </body>
</html>
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_absent_without_smtp_host() {
        assert!(EmailConfig::from_lookup(&|_| None).unwrap().is_none());
    }

    #[test]
    fn config_defaults() {
        let lookup = |name: &str| (name == "SMTP_HOST").then(|| "smtp.example.com".to_string());
        let config = EmailConfig::from_lookup(&lookup).unwrap().unwrap();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from_address, "noreply@kbase.local");
        assert!(!config.implicit_tls);
    }

    #[test]
    fn html_contains_key_project_and_year() {
        let html = render_api_key_html("kbase", "abc.def", 2031);
        assert!(html.contains("abc.def"));
        assert!(html.contains("kbase"));
        assert!(html.contains("2031"));
    }

    #[tokio::test]
    async fn disabled_mailer_does_not_fail() {
        let mailer = Mailer::disabled("kbase");
        assert!(!mailer.is_enabled());
        mailer.send_api_key("a@b.c", "key").await;
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
