use async_trait::async_trait;

use crate::config::EmailConfig;
use crate::db::models::EventRequest;

const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Outbound email payload for the admin inbox.
#[derive(Debug, Clone)]
pub struct AdminEmail {
    pub subject: String,
    pub message: String,
    pub from_name: String,
    pub related_id: String,
}

impl AdminEmail {
    pub fn for_request(request: &EventRequest) -> Self {
        let message = format!(
            "A new event request has been submitted:\n\n\
             Event Title: {}\n\
             Submitted By: {}\n\
             Event Date: {}\n\
             Event Time: {}\n\
             Location: {}\n\
             Description: {}\n\
             Flyer Image: {}\n\n\
             Please review this request in the admin dashboard.",
            request.title,
            request.user_email,
            request.event_date,
            if request.event_time.is_empty() {
                "Not specified"
            } else {
                &request.event_time
            },
            if request.location.is_empty() {
                "Not specified"
            } else {
                &request.location
            },
            if request.description.is_empty() {
                "No description provided"
            } else {
                &request.description
            },
            request.flyer_url.as_deref().unwrap_or("No flyer image"),
        );

        Self {
            subject: format!("New Event Request: {}", request.title),
            message,
            from_name: request.user_email.clone(),
            related_id: request.id.clone(),
        }
    }

    pub fn for_edit(user_email: &str, event_title: &str, edit_id: &str) -> Self {
        let message = format!(
            "A new edit request has been submitted:\n\n\
             Event: {}\n\
             Submitted By: {}\n\
             Request ID: {}\n\n\
             Please review this edit request in the admin dashboard.",
            event_title, user_email, edit_id,
        );

        Self {
            subject: format!("New Edit Request for Event: {}", event_title),
            message,
            from_name: user_email.to_string(),
            related_id: edit_id.to_string(),
        }
    }
}

/// Best-effort outbound email. Implementations never fail the caller: this is
/// a fire-and-forget side effect dispatched after the workflow state change
/// has committed, with its own isolated failure domain.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn deliver(&self, email: AdminEmail);
}

/// Mailer backed by the EmailJS REST API. Skips sending (with a warning) when
/// credentials are not configured.
pub struct EmailJsMailer {
    client: reqwest::Client,
    config: EmailConfig,
}

impl EmailJsMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for EmailJsMailer {
    async fn deliver(&self, email: AdminEmail) {
        let (Some(service_id), Some(template_id), Some(public_key)) = (
            self.config.service_id.as_deref(),
            self.config.template_id.as_deref(),
            self.config.public_key.as_deref(),
        ) else {
            tracing::warn!("EmailJS not configured; skipping email notification");
            return;
        };

        let payload = serde_json::json!({
            "service_id": service_id,
            "template_id": template_id,
            "user_id": public_key,
            "template_params": {
                "to_email": self.config.admin_email,
                "to_name": "Admin",
                "from_name": email.from_name,
                "subject": email.subject,
                "message": email.message,
                "related_id": email.related_id,
            },
        });

        match self.client.post(EMAILJS_ENDPOINT).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Email notification sent: {}", email.subject);
            }
            Ok(response) => {
                tracing::warn!(
                    "Email notification failed with status {}: {}",
                    response.status(),
                    email.subject
                );
            }
            Err(e) => {
                tracing::warn!("Error sending email notification: {}", e);
            }
        }
    }
}

/// Mailer that drops everything. Used in tests and in deployments without
/// email credentials.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn deliver(&self, _email: AdminEmail) {}
}
