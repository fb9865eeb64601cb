use positive_surprise::config::AppConfig;
use positive_surprise::error::AppError;
use positive_surprise::workflows::positive_surprise::{
    Collaborators, HttpTemplateRenderer, JobSettings, NotificationSettings, PageOptions,
    PortalError, PortalGateway, ScpTransfer, SharePointClient, SmtpMailer, SnowflakeClient,
};
use std::path::Path;
use tracing::debug;

/// Stands in for SharePoint when publishing is switched off, so portal
/// credentials are only required for publishing runs.
#[derive(Debug, Default)]
pub(crate) struct OfflinePortal;

impl PortalGateway for OfflinePortal {
    fn push(&self, local_file: &Path, portal_path: &str) -> Result<(), PortalError> {
        Err(PortalError::Backend(format!(
            "publishing is disabled; refusing to upload {} to {portal_path}",
            local_file.display()
        )))
    }
}

pub(crate) fn production_collaborators(
    config: &AppConfig,
    publish: bool,
) -> Result<Collaborators, AppError> {
    let portal: Box<dyn PortalGateway> = if publish {
        Box::new(SharePointClient::new(&config.portal)?)
    } else {
        debug!("publishing disabled; portal uploads are skipped");
        Box::new(OfflinePortal)
    };

    Ok(Collaborators {
        warehouse: Box::new(SnowflakeClient::new(&config.warehouse)?),
        portal,
        renderer: Box::new(HttpTemplateRenderer::new(&config.template_service)?),
        mailer: Box::new(SmtpMailer::new(&config.mail)?),
        transfer: Box::new(ScpTransfer::new(config.transfer.clone())),
    })
}

pub(crate) fn job_settings(config: &AppConfig) -> JobSettings {
    JobSettings {
        portal_base_url: config.portal.base_url.clone().unwrap_or_default(),
        notification: NotificationSettings {
            operations: config.mail.operations.clone(),
            dashboard_url: config.dashboard_url.clone(),
        },
        remote_upload_dir: config.transfer.upload_dir.clone(),
        page_options: PageOptions::default(),
    }
}
