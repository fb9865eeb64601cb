use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::domain::{title_case, RunDate, TableError, Voyage};
use super::export::{ExportError, ExportFormat, Exporter};
use super::mail_merge::{cabin_mail_merge, spa_mail_merge, MailMergePayload};
use super::notification::{
    Mailer, NotificationError, NotificationSettings, Notifier, RecipientDirectory,
};
use super::portal::{portal_link, PortalGateway};
use super::print_media::{PageOptions, PrintMediaError, PrintMediaGenerator, TemplateRenderer};
use super::push::{PushError, PushNotificationDelivery, PushNotificationSet, ShipDelivery};
use super::queries;
use super::transfer::RemoteTransfer;
use super::voyages::{distinct_ships, group_voyages, unique_voyage_list};
use super::warehouse::{WarehouseError, WarehouseGateway};

const PORTAL_ROOT: &str = "Positive Surprise/HAL";
const SPA_DEPARTMENT: &str = "spa";
const SPA_LINK_LABEL: &str = "Spa Print File";
const CABIN_LINK_LABEL: &str = "Cabin Print File";

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    PrintMedia(#[from] PrintMediaError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Push(#[from] PushError),
}

/// External systems the job talks to.
#[derive(Debug)]
pub struct Collaborators {
    pub warehouse: Box<dyn WarehouseGateway>,
    pub portal: Box<dyn PortalGateway>,
    pub renderer: Box<dyn TemplateRenderer>,
    pub mailer: Box<dyn Mailer>,
    pub transfer: Box<dyn RemoteTransfer>,
}

/// Per-run switches taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    pub publish: bool,
    pub app_push: bool,
    pub output_path: PathBuf,
    pub recipient_list: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub portal_base_url: String,
    pub notification: NotificationSettings,
    pub remote_upload_dir: String,
    pub page_options: PageOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub qualified_guests: usize,
    pub voyages: Vec<Voyage>,
    pub exported_files: Vec<PathBuf>,
    pub print_files: Vec<PathBuf>,
    pub link_emails_sent: usize,
    pub deliveries: Vec<ShipDelivery>,
}

impl RunSummary {
    pub fn failed_deliveries(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| !delivery.delivered())
            .count()
    }
}

/// Runs the Positive Surprise automation once for a given day.
#[derive(Debug)]
pub struct PositiveSurpriseJob {
    collaborators: Collaborators,
    settings: JobSettings,
    run_date: RunDate,
}

/// Names and paths shared by every file produced for one voyage.
struct VoyageLayout<'a> {
    ship_name: &'a str,
    ship_title: String,
    stamp: String,
    ship_dir: PathBuf,
}

impl<'a> VoyageLayout<'a> {
    fn new(voyage: &'a Voyage, run_date: &RunDate, output: &Path) -> Self {
        let ship_name = voyage.key.ship_name.as_str();
        Self {
            ship_name,
            ship_title: title_case(ship_name),
            stamp: run_date.file_stamp(),
            ship_dir: output.join(ship_name),
        }
    }

    fn file_name(&self, suffix: &str) -> String {
        format!("{}_{}_{suffix}", self.ship_title, self.stamp)
    }

    fn print_file_name(&self, kind: &str) -> String {
        format!("{}_{kind}_{}_PrintFile.pdf", self.ship_title, self.stamp)
    }

    fn portal_path(&self, folder: &str) -> String {
        format!("{PORTAL_ROOT}/{}/{folder}/", self.ship_name)
    }
}

impl PositiveSurpriseJob {
    pub fn new(collaborators: Collaborators, settings: JobSettings, run_date: RunDate) -> Self {
        Self {
            collaborators,
            settings,
            run_date,
        }
    }

    pub fn run_date(&self) -> RunDate {
        self.run_date
    }

    pub fn run(&self, options: &JobOptions) -> Result<RunSummary, JobError> {
        info!("starting Holland America Positive Surprise process");
        let warehouse = self.collaborators.warehouse.as_ref();
        let mut summary = RunSummary::default();

        let qualified = warehouse.query(&queries::positive_surprise_execution())?;
        summary.qualified_guests = qualified.len();
        info!(rows = qualified.len(), "loaded qualified guests");

        let listing = unique_voyage_list(&warehouse.query(&queries::upcoming_voyages())?)?;
        let mut voyages = group_voyages(&listing);

        for voyage in &mut voyages {
            self.process_voyage(voyage, options, &mut summary)?;
        }

        let notifier = Notifier::new(
            self.collaborators.mailer.as_ref(),
            &self.settings.notification,
        );
        if !voyages.is_empty() {
            let directory = RecipientDirectory::load(&options.recipient_list)?;
            for voyage in &voyages {
                notifier.send_voyage_links(voyage, &directory)?;
                summary.link_emails_sent += 1;
            }
        }

        notifier.send_completion(&distinct_ships(&listing), &self.run_date.file_stamp())?;

        if options.app_push {
            info!("sending push notifications to the ships");
            summary.deliveries = self.push_notifications(&options.output_path)?;
            for delivery in &summary.deliveries {
                notifier.send_delivery_status(delivery)?;
            }
        }

        summary.voyages = voyages;
        info!(
            voyages = summary.voyages.len(),
            exported = summary.exported_files.len(),
            print_files = summary.print_files.len(),
            failed_deliveries = summary.failed_deliveries(),
            "ending Holland America Positive Surprise process"
        );
        Ok(summary)
    }

    fn process_voyage(
        &self,
        voyage: &mut Voyage,
        options: &JobOptions,
        summary: &mut RunSummary,
    ) -> Result<(), JobError> {
        let warehouse = self.collaborators.warehouse.as_ref();
        let exporter = Exporter::new(self.collaborators.portal.as_ref());
        let sail_date = voyage.key.sail_date;
        let departments = voyage.departments().to_vec();
        let layout = VoyageLayout::new(voyage, &self.run_date, &options.output_path);

        info!(ship = %layout.ship_name, %sail_date, departments = ?departments, "processing voyage");

        let gsm_dir = layout.ship_dir.join("gsm");
        let gsm_portal = layout.portal_path("GSM");
        let mut links = Vec::new();

        for department in &departments {
            debug!(ship = %layout.ship_name, department = %department, "processing department");
            let data = warehouse.query(&queries::voyage_department_data(
                layout.ship_name,
                sail_date,
                &title_case(department),
            ))?;
            if !data.is_empty() {
                summary.exported_files.push(exporter.export(
                    &data,
                    &layout.file_name(department),
                    &layout.ship_dir.join(department),
                    ExportFormat::Csv,
                    options.publish,
                    &layout.portal_path(&title_case(department)),
                )?);
            }

            if department == SPA_DEPARTMENT {
                let spa = warehouse.query(&queries::voyage_spa_print_data(layout.ship_name, sail_date))?;
                if !spa.is_empty() {
                    summary.exported_files.push(exporter.export(
                        &spa,
                        &layout.file_name("Spa_Mail_Merge"),
                        &gsm_dir,
                        ExportFormat::Csv,
                        options.publish,
                        &gsm_portal,
                    )?);
                    let payload = spa_mail_merge(&spa, layout.ship_name)?;
                    links.push(self.print(&layout, &payload, "Spa", SPA_LINK_LABEL, options, summary)?);
                }
            }
        }

        let cabin = warehouse.query(&queries::voyage_cabin_print_data(layout.ship_name, sail_date))?;
        if !cabin.is_empty() {
            summary.exported_files.push(exporter.export(
                &cabin,
                &layout.file_name("Cabin_Mail_Merge"),
                &gsm_dir,
                ExportFormat::Csv,
                options.publish,
                &gsm_portal,
            )?);
            let payload = cabin_mail_merge(&cabin, layout.ship_name)?;
            links.push(self.print(&layout, &payload, "Cabin", CABIN_LINK_LABEL, options, summary)?);
        }

        let history = warehouse.query(&queries::voyage_test_history_data(layout.ship_name, sail_date))?;
        if !history.is_empty() {
            summary.exported_files.push(exporter.export(
                &history,
                &layout.file_name("GSM"),
                &gsm_dir,
                ExportFormat::Csv,
                options.publish,
                &gsm_portal,
            )?);
        }

        for (label, url) in links {
            voyage.add_link(label, url);
        }
        Ok(())
    }

    /// Renders one print file and returns its portal link.
    fn print(
        &self,
        layout: &VoyageLayout<'_>,
        payload: &MailMergePayload,
        kind: &str,
        label: &'static str,
        options: &JobOptions,
        summary: &mut RunSummary,
    ) -> Result<(&'static str, String), JobError> {
        let generator = PrintMediaGenerator::new(
            self.collaborators.renderer.as_ref(),
            self.collaborators.portal.as_ref(),
        );
        let file_name = layout.print_file_name(kind);
        let portal_path = layout.portal_path("MM");

        let files = generator.render(
            payload,
            &layout.ship_dir.join("mm"),
            &file_name,
            &self.settings.page_options,
            options.publish,
            &portal_path,
        )?;
        summary.print_files.extend(files);

        Ok((
            label,
            portal_link(&self.settings.portal_base_url, &portal_path, &file_name),
        ))
    }

    fn push_notifications(&self, output: &Path) -> Result<Vec<ShipDelivery>, JobError> {
        let data = self
            .collaborators
            .warehouse
            .query(&queries::voyage_push_notifications_data())?;
        let set = PushNotificationSet::from_table(&data)?;
        if set.is_empty() {
            info!("no push notifications to deliver");
            return Ok(Vec::new());
        }

        let delivery = PushNotificationDelivery::new(
            self.collaborators.transfer.as_ref(),
            &self.settings.remote_upload_dir,
        );
        Ok(delivery.deliver(&set, &self.run_date.ship_stamp(), output)?)
    }
}
