//! Transactional mail.
//!
//! Services hand composed mails to an [`OrderNotifier`], which delivers them
//! through a [`Mailer`]. Delivery is best effort: failures are logged and
//! counted, never returned to the caller whose data is already committed.

pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::MailConfig;
use crate::entities::{order, order_item};
use crate::reports::DeliveryLine;

/// Announcement mails in flight at once
const ANNOUNCEMENT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

impl OutgoingMail {
    pub fn html(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: MailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP credentials are not configured")]
    NotConfigured,
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Invalid message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for crate::errors::ServiceError {
    fn from(err: MailError) -> Self {
        crate::errors::ServiceError::MailError(err.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Gmail-compatible SMTP delivery over TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let (username, password) = match (&config.smtp_username, &config.smtp_password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u.clone(), p.clone()),
            _ => return Err(MailError::NotConfigured),
        };

        let from = Mailbox::new(Some(config.from_name.clone()), username.parse()?);

        // 465 is implicit TLS; anything else negotiates STARTTLS
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, mail: OutgoingMail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse::<Mailbox>()?)
            .subject(mail.subject);

        let body = SinglePart::html(mail.html);
        let message = if mail.attachments.is_empty() {
            builder.singlepart(body)
        } else {
            let mut parts = MultiPart::mixed().singlepart(body);
            for attachment in mail.attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| MailError::Build(e.to_string()))?;
                parts = parts.singlepart(
                    Attachment::new(attachment.filename).body(attachment.content, content_type),
                );
            }
            builder.multipart(parts)
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(mail)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Stand-in used when SMTP credentials are absent.
#[derive(Debug, Default, Clone)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            attachments = mail.attachments.len(),
            "SMTP not configured, mail not delivered"
        );
        Ok(())
    }
}

/// Picks SMTP when credentials are configured, otherwise logs mails.
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if config.smtp_enabled() {
        Ok(Arc::new(SmtpMailer::from_config(config)?))
    } else {
        warn!("SMTP credentials missing; outgoing mail will only be logged");
        Ok(Arc::new(LoggingMailer))
    }
}

/// Composes and delivers the storefront's order and product mails.
#[derive(Clone)]
pub struct OrderNotifier {
    mailer: Arc<dyn Mailer>,
    store_name: String,
    admin_address: Option<String>,
}

impl OrderNotifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        store_name: impl Into<String>,
        admin_address: Option<String>,
    ) -> Self {
        Self {
            mailer,
            store_name: store_name.into(),
            admin_address,
        }
    }

    async fn deliver(&self, mail: OutgoingMail) -> bool {
        let to = mail.to.clone();
        let subject = mail.subject.clone();
        match self.mailer.send(mail).await {
            Ok(()) => {
                crate::metrics::record_mail(true);
                info!(to = %to, subject = %subject, "mail sent");
                true
            }
            Err(e) => {
                crate::metrics::record_mail(false);
                warn!(to = %to, subject = %subject, error = %e, "mail delivery failed");
                false
            }
        }
    }

    /// Invoice to the customer (when an address was given) and a copy to the admin.
    #[instrument(skip_all, fields(invoice = %order.invoice_number))]
    pub async fn order_placed(&self, order: &order::Model, items: &[order_item::Model]) {
        let html = templates::order_placed(&self.store_name, order, items);

        if let Some(email) = order.customer_email.as_deref().filter(|e| !e.trim().is_empty()) {
            self.deliver(OutgoingMail::html(
                email,
                format!("Order Invoice #{}", order.invoice_number),
                html.clone(),
            ))
            .await;
        }

        if let Some(admin) = self.admin_address.as_deref() {
            self.deliver(OutgoingMail::html(
                admin,
                format!("New Order Received #{}", order.invoice_number),
                html,
            ))
            .await;
        }
    }

    /// Download links for a delivered order, optionally with the PDF summary.
    #[instrument(skip_all, fields(invoice = %order.invoice_number))]
    pub async fn order_delivered(
        &self,
        order: &order::Model,
        lines: &[DeliveryLine],
        pdf: Option<Vec<u8>>,
    ) -> bool {
        let Some(email) = order
            .customer_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
        else {
            info!("order has no customer email; delivery mail skipped");
            return false;
        };

        let mut mail = OutgoingMail::html(
            email,
            format!("Your Order {} is Delivered", order.invoice_number),
            templates::order_delivered(&self.store_name, &order.customer_name, lines),
        );
        if let Some(content) = pdf {
            mail = mail.with_attachment(MailAttachment {
                filename: format!("Order_{}.pdf", order.invoice_number),
                content_type: "application/pdf".to_string(),
                content,
            });
        }

        self.deliver(mail).await
    }

    /// Announces a product to newsletter subscribers; returns how many mails were accepted.
    #[instrument(skip_all, fields(product = %product_name, recipients = recipients.len()))]
    pub async fn product_announcement(
        &self,
        recipients: Vec<String>,
        product_name: &str,
        link: &str,
    ) -> usize {
        let html = templates::product_announcement(&self.store_name, product_name, link);
        let subject = format!("Just in: {product_name} is now available");

        stream::iter(recipients)
            .map(|to| self.deliver(OutgoingMail::html(to, subject.clone(), html.clone())))
            .buffer_unordered(ANNOUNCEMENT_CONCURRENCY)
            .filter(|sent| futures::future::ready(*sent))
            .count()
            .await
    }
}
