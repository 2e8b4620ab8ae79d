//! Outgoing email
//!
//! The only email Tasqar sends is the invitation link. Delivery goes through
//! the [`Mailer`] trait: [`HttpMailer`] posts to a Resend-compatible HTTP API,
//! and [`LogMailer`] just logs the message, which is what runs when no API key
//! is configured.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

/// Error type for email delivery
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Email API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Email transport
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Shared handle to whichever mailer is configured
pub type DynMailer = Arc<dyn Mailer>;

/// Builds the invitation email for `to`
pub fn invitation_email(
    to: &str,
    inviter_name: &str,
    link: &str,
    expires_at: DateTime<Utc>,
) -> EmailMessage {
    let expires = expires_at.format("%Y-%m-%d %H:%M UTC");

    EmailMessage {
        to: to.to_string(),
        subject: format!("{inviter_name} invited you to Tasqar"),
        html: format!(
            "<p>{inviter} invited you to collaborate on Tasqar.</p>\
             <p><a href=\"{link}\">Create your account</a></p>\
             <p>This invitation expires on {expires}.</p>",
            inviter = html_escape(inviter_name),
            link = html_escape(link),
        ),
        text: format!(
            "{inviter_name} invited you to collaborate on Tasqar.\n\n\
             Create your account: {link}\n\n\
             This invitation expires on {expires}.\n"
        ),
    }
}

fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Request body of the email API
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends email through an HTTP API (`POST {api_url}` with a Bearer key)
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(EmailError::Api { status, body });
        }

        info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Logs emails instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Email delivery disabled, logging message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_invitation_email() {
        let expires = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let email = invitation_email(
            "friend@example.com",
            "Jane <Ops>",
            "http://localhost:3000/register?invitation=abc",
            expires,
        );

        assert_eq!(email.to, "friend@example.com");
        assert_eq!(email.subject, "Jane <Ops> invited you to Tasqar");
        assert!(email.text.contains("http://localhost:3000/register?invitation=abc"));
        assert!(email.text.contains("2025-03-01 12:00 UTC"));
        assert!(email.html.contains("Jane &lt;Ops&gt;"));
        assert!(!email.html.contains("<Ops>"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = SendEmailRequest {
            from: "Tasqar <noreply@tasqar.app>",
            to: ["friend@example.com"],
            subject: "Hi",
            html: "<p>Hi</p>",
            text: "Hi",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"], serde_json::json!(["friend@example.com"]));
        assert_eq!(json["from"], "Tasqar <noreply@tasqar.app>");
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        let mailer: DynMailer = Arc::new(LogMailer);
        let message = invitation_email("a@example.com", "Jane", "http://x", Utc::now());
        assert!(mailer.send(&message).await.is_ok());
    }
}
