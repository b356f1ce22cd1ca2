//! Newsletter subscriptions: the deduplicated subscriber set plus the mail it triggers.

use std::sync::Arc;

use futures::{StreamExt, stream};
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::mailer::{DeliveryReceipt, MailError, Mailer, OutgoingEmail};
use crate::application::store::{KeyValueStore, SUBSCRIBERS_KEY, StoreError};
use crate::domain::articles::Article;
use crate::domain::error::DomainError;
use crate::domain::subscriber::SubscriberEmail;
use crate::infra::telemetry::{METRIC_MAIL_FAILED, METRIC_MAIL_SENT, METRIC_SUBSCRIPTIONS};
use crate::presentation::email::{EmailBranding, EmailTemplate, render_email};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("invalid email address: {0}")]
    InvalidEmail(#[source] DomainError),
    #[error("`{email}` is already subscribed")]
    AlreadySubscribed { email: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOutcome {
    pub email: SubscriberEmail,
    pub welcome_sent: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn KeyValueStore>,
    mailer: Arc<dyn Mailer>,
    branding: EmailBranding,
    /// Owner addresses copied on every welcome email.
    cc: Vec<String>,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        mailer: Arc<dyn Mailer>,
        branding: EmailBranding,
        cc: Vec<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            branding,
            cc,
        }
    }

    pub async fn subscribe(&self, raw_email: &str) -> Result<SubscribeOutcome, SubscriptionError> {
        let email = SubscriberEmail::parse(raw_email).map_err(SubscriptionError::InvalidEmail)?;

        if self.store.set_contains(SUBSCRIBERS_KEY, email.as_ref()).await? {
            return Err(SubscriptionError::AlreadySubscribed {
                email: email.into_inner(),
            });
        }
        // A concurrent request may have inserted the address after the membership check.
        if !self.store.set_add(SUBSCRIBERS_KEY, email.as_ref()).await? {
            return Err(SubscriptionError::AlreadySubscribed {
                email: email.into_inner(),
            });
        }
        counter!(METRIC_SUBSCRIPTIONS).increment(1);
        info!(
            target = "folio::subscriptions",
            email = %email,
            "subscriber added"
        );

        let welcome_sent = match self
            .deliver(EmailTemplate::Subscription, &email, self.cc.clone())
            .await
        {
            Ok(receipt) => {
                info!(
                    target = "folio::subscriptions",
                    email = %email,
                    message_id = %receipt.id,
                    "welcome email sent"
                );
                true
            }
            Err(err) => {
                warn!(
                    target = "folio::subscriptions",
                    email = %email,
                    error = %err,
                    "welcome email failed; subscription kept"
                );
                false
            }
        };

        Ok(SubscribeOutcome {
            email,
            welcome_sent,
        })
    }

    /// Every subscribed address, sorted.
    pub async fn subscribers(&self) -> Result<Vec<String>, SubscriptionError> {
        let mut members = self.store.set_members(SUBSCRIBERS_KEY).await?;
        members.sort();
        Ok(members)
    }

    /// Mail a new-article notification to every subscriber, at most `concurrency` at a time.
    pub async fn notify_subscribers(
        &self,
        article: &Article,
        concurrency: usize,
    ) -> Result<NotifyReport, SubscriptionError> {
        let members = self.subscribers().await?;
        let mut report = NotifyReport::default();

        let mut recipients = Vec::with_capacity(members.len());
        for member in members {
            match SubscriberEmail::parse(&member) {
                Ok(email) => recipients.push(email),
                Err(err) => {
                    warn!(
                        target = "folio::subscriptions",
                        member = %member,
                        error = %err,
                        "skipping unparseable subscriber"
                    );
                    report.failed += 1;
                }
            }
        }

        let results: Vec<Result<DeliveryReceipt, MailError>> = stream::iter(recipients)
            .map(|email| async move {
                self.deliver(EmailTemplate::BlogNotification { article }, &email, Vec::new())
                    .await
                    .inspect_err(|err| {
                        warn!(
                            target = "folio::subscriptions",
                            email = %email,
                            slug = %article.slug,
                            error = %err,
                            "blog notification failed"
                        );
                    })
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(_) => report.sent += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            target = "folio::subscriptions",
            slug = %article.slug,
            sent = report.sent,
            failed = report.failed,
            "blog notification finished"
        );
        Ok(report)
    }

    async fn deliver(
        &self,
        template: EmailTemplate<'_>,
        recipient: &SubscriberEmail,
        cc: Vec<String>,
    ) -> Result<DeliveryReceipt, MailError> {
        let result = match render_email(template, recipient, &self.branding) {
            Ok(rendered) => {
                self.mailer
                    .send(OutgoingEmail {
                        to: recipient.clone(),
                        cc,
                        subject: rendered.subject,
                        html: rendered.html,
                        text: rendered.text,
                    })
                    .await
            }
            Err(err) => Err(MailError::Render(err.to_string())),
        };

        match &result {
            Ok(_) => counter!(METRIC_MAIL_SENT).increment(1),
            Err(_) => counter!(METRIC_MAIL_FAILED).increment(1),
        }
        result
    }
}
