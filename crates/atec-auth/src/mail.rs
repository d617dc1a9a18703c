//! Outgoing transactional mail.

use serde::Serialize;

use atec_core::BoxFuture;

use crate::error::MailError;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub receiver_name: String,
    pub receiver_email: String,
    pub subject: String,
    pub html: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>>;
}

/// Brevo transactional e-mail API.
pub struct BrevoMailer {
    client: reqwest::Client,
    api_key: String,
    sender_name: String,
    sender_email: String,
}

impl BrevoMailer {
    pub fn new(api_key: String, sender_name: String, sender_email: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender_name,
            sender_email,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

#[derive(Serialize)]
struct Contact<'a> {
    name: &'a str,
    email: &'a str,
}

impl Mailer for BrevoMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            let body = SendRequest {
                sender: Contact {
                    name: &self.sender_name,
                    email: &self.sender_email,
                },
                to: [Contact {
                    name: &mail.receiver_name,
                    email: &mail.receiver_email,
                }],
                subject: &mail.subject,
                html_content: &mail.html,
            };

            let resp = self
                .client
                .post(BREVO_SEND_URL)
                .header("api-key", &self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(MailError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
            tracing::debug!(subject = %mail.subject, "mail accepted by provider");
            Ok(())
        })
    }
}

/// Used when mail delivery is disabled: logs the message and succeeds.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            tracing::info!(subject = %mail.subject, receiver = %mail.receiver_name, "mail delivery disabled, dropping message");
            Ok(())
        })
    }
}
