use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::application::mailer::{DeliveryReceipt, MailError, Mailer, OutgoingEmail};
use crate::infra::telemetry::METRIC_MAIL_SEND_MS;

/// Client for a Resend-compatible transactional email API.
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(skip_serializing_if = "no_copies")]
    cc: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

fn no_copies(cc: &&[String]) -> bool {
    cc.is_empty()
}

#[derive(Debug, Deserialize)]
struct SendEmailReply {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl ResendMailer {
    pub fn new(client: Client, endpoint: Url, api_key: SecretString, from: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }

    fn emails_url(&self) -> Result<Url, MailError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/emails"))
            .map_err(|err| MailError::Transport(format!("invalid mail endpoint: {err}")))
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        let body = SendEmailBody {
            from: &self.from,
            to: [email.to.as_ref()],
            cc: &email.cc,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let started_at = Instant::now();
        let response = self
            .client
            .post(self.emails_url()?)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;
        histogram!(METRIC_MAIL_SEND_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<ProviderError>(&bytes) {
                Ok(ProviderError {
                    message: Some(message),
                    name,
                }) => match name {
                    Some(name) => format!("{name}: {message}"),
                    None => message,
                },
                _ => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let reply: SendEmailReply = serde_json::from_slice(&bytes)
            .map_err(|err| MailError::Transport(format!("failed to parse reply: {err}")))?;
        Ok(DeliveryReceipt { id: reply.id })
    }
}
