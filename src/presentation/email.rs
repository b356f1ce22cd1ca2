//! Email bodies rendered from askama templates under `templates/email`.

use askama::{Error as AskamaError, Template};
use thiserror::Error;
use time::macros::format_description;

use crate::application::sitemap::canonical_url;
use crate::domain::articles::Article;
use crate::domain::subscriber::SubscriberEmail;

pub const SUBSCRIPTION_SUBJECT: &str = "Thanks for subscribing";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

/// Site identity stamped into every outgoing email.
#[derive(Debug, Clone)]
pub struct EmailBranding {
    pub site_name: String,
    pub site_url: String,
}

/// Which message to render.
#[derive(Debug, Clone, Copy)]
pub enum EmailTemplate<'a> {
    Subscription,
    BlogNotification { article: &'a Article },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Template)]
#[template(path = "email/subscription.html")]
struct SubscriptionHtml<'a> {
    recipient: &'a str,
    site_name: &'a str,
    site_url: &'a str,
    blogs_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription.txt")]
struct SubscriptionText<'a> {
    recipient: &'a str,
    site_name: &'a str,
    site_url: &'a str,
    blogs_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/blog_notification.html")]
struct BlogNotificationHtml<'a> {
    recipient: &'a str,
    site_name: &'a str,
    article_url: &'a str,
    title: &'a str,
    summary: &'a str,
    label: &'a str,
    author: &'a str,
    published: &'a str,
    read_time: u32,
    tags: &'a [String],
}

#[derive(Template)]
#[template(path = "email/blog_notification.txt")]
struct BlogNotificationText<'a> {
    site_name: &'a str,
    article_url: &'a str,
    title: &'a str,
    summary: &'a str,
    author: &'a str,
    published: &'a str,
    read_time: u32,
}

pub fn render_email(
    template: EmailTemplate<'_>,
    recipient: &SubscriberEmail,
    branding: &EmailBranding,
) -> Result<RenderedEmail, TemplateRenderError> {
    const SOURCE: &str = "presentation::email::render_email";

    let recipient = recipient.as_ref();
    let site_name = branding.site_name.as_str();

    match template {
        EmailTemplate::Subscription => {
            let blogs_url = canonical_url(&branding.site_url, "/blogs");
            let site_url = canonical_url(&branding.site_url, "/");
            let html = SubscriptionHtml {
                recipient,
                site_name,
                site_url: &site_url,
                blogs_url: &blogs_url,
            }
            .render()
            .map_err(|err| TemplateRenderError::new(SOURCE, "subscription email failed", err))?;
            let text = SubscriptionText {
                recipient,
                site_name,
                site_url: &site_url,
                blogs_url: &blogs_url,
            }
            .render()
            .map_err(|err| TemplateRenderError::new(SOURCE, "subscription email failed", err))?;

            Ok(RenderedEmail {
                subject: SUBSCRIPTION_SUBJECT.to_string(),
                html,
                text,
            })
        }
        EmailTemplate::BlogNotification { article } => {
            let article_url = canonical_url(&branding.site_url, &format!("/blogs/{}", article.slug));
            let published = format_published(article);
            let html = BlogNotificationHtml {
                recipient,
                site_name,
                article_url: &article_url,
                title: &article.title,
                summary: &article.summary,
                label: &article.label,
                author: &article.author,
                published: &published,
                read_time: article.read_time,
                tags: &article.tags,
            }
            .render()
            .map_err(|err| TemplateRenderError::new(SOURCE, "notification email failed", err))?;
            let text = BlogNotificationText {
                site_name,
                article_url: &article_url,
                title: &article.title,
                summary: &article.summary,
                author: &article.author,
                published: &published,
                read_time: article.read_time,
            }
            .render()
            .map_err(|err| TemplateRenderError::new(SOURCE, "notification email failed", err))?;

            Ok(RenderedEmail {
                subject: format!("New article: {}", article.title),
                html,
                text,
            })
        }
    }
}

fn format_published(article: &Article) -> String {
    let format = format_description!("[month repr:long] [day padding:none], [year]");
    article
        .published
        .format(format)
        .unwrap_or_else(|_| article.published.to_string())
}
