//! Outbound email for the contact relay.

pub mod resend;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use isimm_common::ContactMessage;

use crate::config::MailRoute;

pub use resend::ResendMailer;

/// Errors from the email-delivery collaborator
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One email, in the shape the delivery API expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutboundEmail {
    /// Build the relay email for a contact submission
    pub fn from_contact(message: &ContactMessage, route: &MailRoute<'_>, subject_prefix: &str) -> Self {
        Self {
            from: route.from.to_string(),
            to: route.to.to_vec(),
            reply_to: message.email.clone(),
            subject: message.subject_line(subject_prefix),
            text: message.text_body(),
            html: message.html_body(),
        }
    }
}

/// Sends emails through an external provider
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email; `idempotency_key` lets the provider drop duplicates
    async fn send(
        &self,
        api_key: &str,
        idempotency_key: &str,
        email: &OutboundEmail,
    ) -> Result<(), DeliveryError>;
}
