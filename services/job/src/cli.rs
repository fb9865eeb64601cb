use crate::infra;
use chrono::Local;
use clap::Parser;
use positive_surprise::config::{AppConfig, DEFAULT_CONNECTION};
use positive_surprise::error::AppError;
use positive_surprise::telemetry;
use positive_surprise::workflows::positive_surprise::{JobOptions, PositiveSurpriseJob, RunDate};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Positive Surprise Automation",
    about = "Export Positive Surprise guest offers, print files, and app notifications for HAL ships",
    version
)]
pub(crate) struct Cli {
    /// YAML file configuring log output
    #[arg(short = 'l', long, default_value = "../log_config.yaml")]
    pub(crate) logconfig: PathBuf,
    /// Publish exports and print files to SharePoint (0 or 1)
    #[arg(short = 'p', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub(crate) publish: u8,
    /// Send push notification files to the ships (0 or 1)
    #[arg(short = 'a', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub(crate) app: u8,
    /// Local directory receiving generated files
    #[arg(short = 'o', long, default_value = "../output/")]
    pub(crate) outpath: PathBuf,
    /// Workbook mapping ships to notification recipients
    #[arg(short = 'n', long, default_value = "ship_email_list.xlsx")]
    pub(crate) notifylist: String,
    /// Warehouse connection name
    #[arg(short = 'c', long, default_value = DEFAULT_CONNECTION)]
    pub(crate) conn: String,
    /// Directory holding the notification list
    #[arg(long, default_value = "communication")]
    pub(crate) communication_dir: PathBuf,
}

impl Cli {
    pub(crate) fn job_options(&self) -> JobOptions {
        JobOptions {
            publish: self.publish == 1,
            app_push: self.app == 1,
            output_path: self.outpath.clone(),
            recipient_list: self.communication_dir.join(&self.notifylist),
        }
    }
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::for_connection(&cli.conn)?;

    telemetry::init(&config.telemetry, Some(&cli.logconfig))?;

    let options = cli.job_options();
    info!(
        ?config.environment,
        connection = %cli.conn,
        publish = options.publish,
        app_push = options.app_push,
        "positive surprise automation starting"
    );

    let collaborators = infra::production_collaborators(&config, options.publish)?;
    let job = PositiveSurpriseJob::new(
        collaborators,
        infra::job_settings(&config),
        RunDate(Local::now().date_naive()),
    );
    let summary = job.run(&options)?;

    info!(
        voyages = summary.voyages.len(),
        link_emails = summary.link_emails_sent,
        deliveries = summary.deliveries.len(),
        failed_deliveries = summary.failed_deliveries(),
        "positive surprise automation finished"
    );
    Ok(())
}
