pub mod domain;
pub mod export;
mod job;
pub mod mail_merge;
pub mod notification;
pub mod portal;
pub mod print_media;
pub mod push;
pub mod queries;
pub mod transfer;
pub mod voyages;
pub mod warehouse;

pub use domain::{RunDate, Table, TableError, Voyage, VoyageKey, VoyageListing};
pub use export::{ExportError, ExportFormat, Exporter};
pub use job::{
    Collaborators, JobError, JobOptions, JobSettings, PositiveSurpriseJob, RunSummary,
};
pub use notification::{
    MailError, Mailer, NotificationError, NotificationSettings, Notifier, OutboundEmail,
    RecipientDirectory, SmtpMailer,
};
pub use portal::{PortalError, PortalGateway, SharePointClient};
pub use print_media::{
    HttpTemplateRenderer, PageOptions, PrintMediaError, PrintMediaGenerator, RenderRequest,
    TemplateError, TemplateRenderer,
};
pub use push::{
    DeliveryOutcome, PushError, PushNotificationDelivery, PushNotificationSet, ShipDelivery,
};
pub use transfer::{RemoteTransfer, ScpTransfer, TransferError};
pub use warehouse::{SnowflakeClient, WarehouseError, WarehouseGateway};
