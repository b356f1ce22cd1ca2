//! `Mailer` adapters.

mod resend;

use async_trait::async_trait;

use crate::application::mailer::{DeliveryReceipt, MailError, Mailer, OutgoingEmail};

pub use resend::ResendMailer;

/// Stand-in used when no provider API key is configured; every send fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredMailer;

#[async_trait]
impl Mailer for UnconfiguredMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        Err(MailError::NotConfigured)
    }
}
