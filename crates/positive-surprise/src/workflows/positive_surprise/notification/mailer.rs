use std::fmt::Debug;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

use crate::config::MailConfig;

/// A fully addressed HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub subject: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// The single send primitive every notification goes through.
pub trait Mailer: Debug {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Plain SMTP relay without authentication or TLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
    relay: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let sender = parse_mailbox(&config.sender)?;
        let transport = SmtpTransport::builder_dangerous(config.address.as_str())
            .port(config.port)
            .build();
        Ok(Self {
            transport,
            sender,
            relay: format!("{}:{}", config.address, config.port),
        })
    }

    fn message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML);
        for recipient in &email.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }
        for recipient in &email.cc {
            builder = builder.cc(parse_mailbox(recipient)?);
        }
        builder
            .body(email.html.clone())
            .map_err(|err| MailError::Build(err.to_string()))
    }
}

impl Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = self.message(email)?;
        self.transport
            .send(&message)
            .map_err(|err| MailError::Smtp(err.to_string()))?;
        debug!(subject = %email.subject, recipients = email.to.len(), "email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| MailError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(&MailConfig {
            address: "localhost".to_string(),
            port: 2525,
            sender: "targetedmarketing@hollandamerica.com".to_string(),
            operations: "biautomations@hollandamerica.com".to_string(),
        })
        .expect("mailer builds")
    }

    #[test]
    fn message_carries_recipients_and_html_body() {
        let email = OutboundEmail {
            subject: "Positive Surprise Zuiderdam (10-24-2026)".to_string(),
            to: vec!["hotel.manager@ship.example".to_string()],
            cc: vec!["biautomations@hollandamerica.com".to_string()],
            html: "<p>Hi,</p>".to_string(),
        };
        let message = mailer().message(&email).expect("message builds");
        let formatted = String::from_utf8(message.formatted()).expect("utf8");
        assert!(formatted.contains("To: hotel.manager@ship.example"));
        assert!(formatted.contains("Cc: biautomations@hollandamerica.com"));
        assert!(formatted.contains("Content-Type: text/html"));
    }

    #[test]
    fn invalid_recipient_is_rejected_before_sending() {
        let email = OutboundEmail {
            subject: "subject".to_string(),
            to: vec!["not an address".to_string()],
            cc: Vec::new(),
            html: String::new(),
        };
        let error = mailer().message(&email).expect_err("invalid address");
        assert!(matches!(error, MailError::InvalidAddress { .. }));
    }
}
