//! Outbound email seam backed by a transactional-email provider.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscriber::SubscriberEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: SubscriberEmail,
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider-assigned message id.
    pub id: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider API key is not configured")]
    NotConfigured,
    #[error("mail provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("mail transport failure: {0}")]
    Transport(String),
    #[error("failed to render email template: {0}")]
    Render(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt, MailError>;
}
