//! Transactional email.
//!
//! Providers:
//! - `console`: logs the message (development default)
//! - `sendgrid`: SendGrid v3 HTTP API
//! - `disabled`: drops every message
//!
//! Callers treat delivery as best effort: errors are returned so the caller
//! can log them and report `email_sent: false`, never to fail the request.

use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    Console,
    SendGrid,
    Disabled,
}

impl FromStr for EmailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "sendgrid" => Ok(Self::SendGrid),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(format!("Unknown email provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,

    /// API key for HTTP providers
    pub api_key: Option<String>,

    pub sender_email: String,
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Console,
            api_key: None,
            sender_email: "noreply@synergysphere.app".to_string(),
            sender_name: "SynergySphere".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

impl EmailMessage {
    /// Invitation to join a project, with accept and decline links.
    ///
    /// `ttl_hours` is how long the links stay valid.
    pub fn project_invitation(
        to: &str,
        inviter_name: &str,
        project_name: &str,
        accept_link: &str,
        decline_link: &str,
        ttl_hours: i64,
    ) -> Self {
        let expires_in = expiry_phrase(ttl_hours);
        let subject = format!("You've been invited to join {} on SynergySphere", project_name);

        let body_text = format!(
            r#"Hi,

{inviter} has invited you to collaborate on the project "{project}" on SynergySphere.

Accept the invitation:
{accept}

Decline the invitation:
{decline}

This invitation expires in {expires_in}. If you weren't expecting it, you can ignore this email.

The SynergySphere Team"#,
            inviter = inviter_name,
            project = project_name,
            accept = accept_link,
            decline = decline_link,
            expires_in = expires_in,
        );

        let body_html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Project invitation</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: #4f46e5; padding: 24px; border-radius: 10px 10px 0 0;">
        <h1 style="color: white; margin: 0; font-size: 22px;">SynergySphere</h1>
    </div>
    <div style="background: #f9f9f9; padding: 24px; border-radius: 0 0 10px 10px;">
        <p><strong>{inviter}</strong> has invited you to collaborate on <strong>{project}</strong>.</p>
        <div style="text-align: center; margin: 28px 0;">
            <a href="{accept}" style="background: #4f46e5; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: bold; margin-right: 8px;">Accept</a>
            <a href="{decline}" style="background: #e5e7eb; color: #333; padding: 12px 24px; text-decoration: none; border-radius: 6px;">Decline</a>
        </div>
        <p style="color: #666; font-size: 14px;">This invitation expires in {expires_in}.</p>
    </div>
</body>
</html>"#,
            inviter = html_escape(inviter_name),
            project = html_escape(project_name),
            accept = accept_link,
            decline = decline_link,
            expires_in = expires_in,
        );

        Self {
            to: to.to_string(),
            to_name: None,
            subject,
            body_text,
            body_html: Some(body_html),
        }
    }
}

/// "7 days", "1 day", "36 hours": whole days when the TTL divides evenly.
fn expiry_phrase(ttl_hours: i64) -> String {
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if ttl_hours > 0 && ttl_hours % 24 == 0 {
        plural(ttl_hours / 24, "day")
    } else {
        plural(ttl_hours, "hour")
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    http: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !message.to.contains('@') {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider {
            EmailProvider::Console => self.send_console(message),
            EmailProvider::SendGrid => self.send_sendgrid(message).await,
            EmailProvider::Disabled => {
                debug!(to = %message.to, subject = %message.subject, "Email disabled, skipping send");
                Err(EmailError::Disabled)
            }
        }
    }

    pub async fn send_project_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        project_name: &str,
        accept_link: &str,
        decline_link: &str,
        ttl_hours: i64,
    ) -> Result<(), EmailError> {
        let message = EmailMessage::project_invitation(
            to,
            inviter_name,
            project_name,
            accept_link,
            decline_link,
            ttl_hours,
        );
        self.send(message).await
    }

    fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            from = %self.config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body");
        Ok(())
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(EmailError::NotConfigured)?;

        let body = sendgrid_body(&self.config, &message);

        let response = self
            .http
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, error = %error_body, "SendGrid API error");
        Err(EmailError::ProviderError(format!(
            "SendGrid returned {}: {}",
            status, error_body
        )))
    }
}

fn sendgrid_body(config: &EmailConfig, message: &EmailMessage) -> serde_json::Value {
    let mut to = json!({ "email": message.to });
    if let Some(name) = &message.to_name {
        to["name"] = json!(name);
    }

    let mut content = vec![json!({ "type": "text/plain", "value": message.body_text })];
    if let Some(html) = &message.body_html {
        content.push(json!({ "type": "text/html", "value": html }));
    }

    json!({
        "personalizations": [{ "to": [to] }],
        "from": {
            "email": config.sender_email,
            "name": config.sender_name,
        },
        "subject": message.subject,
        "content": content,
    })
}
