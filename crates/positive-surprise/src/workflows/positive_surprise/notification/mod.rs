pub mod emails;
mod mailer;
mod recipients;

use std::path::PathBuf;

use tracing::{debug, info};

pub use mailer::{MailError, Mailer, OutboundEmail, SmtpMailer};
pub use recipients::RecipientDirectory;

use super::domain::Voyage;
use super::push::{DeliveryOutcome, ShipDelivery};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("unable to load recipient list {path}: {reason}")]
    Recipients { path: PathBuf, reason: String },
    #[error("no recipients configured for ship {0}")]
    UnknownShip(String),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Fixed addresses and links shared by every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub operations: String,
    pub dashboard_url: String,
}

/// Composes the job's emails and hands them to the mailer. Every email is
/// copied to the operations mailbox.
#[derive(Debug, Clone, Copy)]
pub struct Notifier<'a> {
    mailer: &'a dyn Mailer,
    settings: &'a NotificationSettings,
}

impl<'a> Notifier<'a> {
    pub fn new(mailer: &'a dyn Mailer, settings: &'a NotificationSettings) -> Self {
        Self { mailer, settings }
    }

    fn send(&self, subject: String, to: Vec<String>, html: String) -> Result<(), MailError> {
        self.mailer.send(&OutboundEmail {
            subject,
            to,
            cc: vec![self.settings.operations.clone()],
            html,
        })
    }

    /// Sends the voyage's portal links to the ship's recipients.
    pub fn send_voyage_links(
        &self,
        voyage: &Voyage,
        directory: &RecipientDirectory,
    ) -> Result<(), NotificationError> {
        let ship_name = &voyage.key.ship_name;
        let sail_date = voyage.key.sail_date;
        debug!(ship = %ship_name, %sail_date, links = voyage.links().len(), "sending voyage notification");

        let recipients = directory
            .recipients_for(ship_name)
            .filter(|recipients| !recipients.is_empty())
            .ok_or_else(|| NotificationError::UnknownShip(ship_name.clone()))?;

        let lines = emails::link_lines(ship_name, sail_date, voyage.links());
        self.send(
            emails::link_summary_subject(ship_name, sail_date),
            recipients.to_vec(),
            emails::link_summary_body(&lines, &self.settings.dashboard_url),
        )?;
        Ok(())
    }

    /// Reports the ships processed this run to the operations mailbox.
    pub fn send_completion(
        &self,
        ship_names: &[String],
        file_stamp: &str,
    ) -> Result<(), NotificationError> {
        info!(ships = ship_names.len(), "sending completion email");
        self.send(
            emails::completion_subject(file_stamp),
            vec![self.settings.operations.clone()],
            emails::completion_body(ship_names),
        )?;
        Ok(())
    }

    /// One status email per ship push file.
    pub fn send_delivery_status(&self, delivery: &ShipDelivery) -> Result<(), NotificationError> {
        let body = match &delivery.outcome {
            DeliveryOutcome::Delivered => emails::delivery_success_body(),
            DeliveryOutcome::Failed(detail) => emails::delivery_failure_body(detail),
        };
        self.send(
            emails::delivery_subject(&delivery.ship_code),
            vec![self.settings.operations.clone()],
            body,
        )?;
        Ok(())
    }
}
