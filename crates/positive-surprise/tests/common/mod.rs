#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use positive_surprise::workflows::positive_surprise::queries::{
    Query, POSITIVE_SURPRISE_EXECUTION, UPCOMING_VOYAGES, VOYAGE_CABIN_PRINT_DATA,
    VOYAGE_DEPARTMENT_DATA, VOYAGE_PUSH_NOTIFICATIONS_DATA, VOYAGE_SPA_PRINT_DATA,
};
use positive_surprise::workflows::positive_surprise::{
    Collaborators, JobOptions, JobSettings, MailError, Mailer, NotificationSettings,
    OutboundEmail, PageOptions, PortalError, PortalGateway, PositiveSurpriseJob, RemoteTransfer,
    RenderRequest, RunDate, Table, TemplateError, TemplateRenderer, TransferError,
    WarehouseError, WarehouseGateway,
};

pub const PORTAL_BASE: &str = "https://sp.example/sites/HAG";
pub const OPERATIONS: &str = "biautomations@hollandamerica.com";
pub const UPLOAD_DIR: &str = "/approot/offers/upload";

pub fn run_date() -> RunDate {
    RunDate(NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date"))
}

pub fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
    let mut table = Table::new(columns.iter().copied());
    for row in rows {
        table
            .push_row(row.iter().map(|cell| cell.map(str::to_string)).collect())
            .expect("row width matches");
    }
    table
}

/// Answers queries by name, or by `name:SHIP` when a ship-scoped response
/// is registered. Unregistered queries return an empty table.
#[derive(Debug, Default, Clone)]
pub struct FakeWarehouse {
    responses: Arc<Mutex<HashMap<String, Table>>>,
    calls: Arc<Mutex<Vec<Query>>>,
}

impl FakeWarehouse {
    pub fn respond(&self, key: &str, table: Table) -> &Self {
        self.responses
            .lock()
            .expect("responses mutex")
            .insert(key.to_string(), table);
        self
    }

    pub fn calls(&self) -> Vec<Query> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn calls_named(&self, name: &str) -> Vec<Query> {
        self.calls()
            .into_iter()
            .filter(|query| query.name == name)
            .collect()
    }
}

impl WarehouseGateway for FakeWarehouse {
    fn query(&self, query: &Query) -> Result<Table, WarehouseError> {
        self.calls.lock().expect("calls mutex").push(query.clone());
        let responses = self.responses.lock().expect("responses mutex");
        let scoped = query
            .bindings
            .first()
            .map(|ship| format!("{}:{}", query.name, ship));
        Ok(scoped
            .and_then(|key| responses.get(&key).cloned())
            .or_else(|| responses.get(query.name).cloned())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default, Clone)]
pub struct FakePortal {
    pushed: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakePortal {
    /// `(file name, portal path)` in upload order.
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().expect("portal mutex").clone()
    }
}

impl PortalGateway for FakePortal {
    fn push(&self, local_file: &Path, portal_path: &str) -> Result<(), PortalError> {
        if !local_file.exists() {
            return Err(PortalError::Read {
                path: local_file.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let name = local_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.pushed
            .lock()
            .expect("portal mutex")
            .push((name, portal_path.to_string()));
        Ok(())
    }
}

/// Writes a placeholder PDF where the templating service would.
#[derive(Debug, Default, Clone)]
pub struct FakeRenderer {
    rendered: Arc<Mutex<Vec<(String, &'static str, usize)>>>,
}

impl FakeRenderer {
    /// `(merge file name, template, record count)` per render.
    pub fn rendered(&self) -> Vec<(String, &'static str, usize)> {
        self.rendered.lock().expect("renderer mutex").clone()
    }
}

impl TemplateRenderer for FakeRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<Vec<PathBuf>, TemplateError> {
        std::fs::create_dir_all(request.output_dir).map_err(|source| TemplateError::Io {
            path: request.output_dir.to_path_buf(),
            source,
        })?;
        let merged = request.output_dir.join(request.merge_file_name);
        std::fs::write(&merged, b"%PDF-1.7").map_err(|source| TemplateError::Io {
            path: merged.clone(),
            source,
        })?;
        self.rendered.lock().expect("renderer mutex").push((
            request.merge_file_name.to_string(),
            request.dictionary.template_name,
            request.dictionary.record_count(),
        ));
        Ok(vec![merged])
    }
}

#[derive(Debug, Default, Clone)]
pub struct FakeMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex").clone()
    }

    pub fn with_subject_containing(&self, needle: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.subject.contains(needle))
            .collect()
    }
}

impl Mailer for FakeMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer mutex").push(email.clone());
        Ok(())
    }
}

/// Records copied files; files whose name starts with a failing prefix are
/// rejected.
#[derive(Debug, Default, Clone)]
pub struct FakeTransfer {
    failing_prefix: Option<String>,
    copied: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeTransfer {
    pub fn failing_for(prefix: &str) -> Self {
        Self {
            failing_prefix: Some(prefix.to_string()),
            copied: Arc::default(),
        }
    }

    /// `(file name, remote dir)` for successful copies.
    pub fn copied(&self) -> Vec<(String, String)> {
        self.copied.lock().expect("transfer mutex").clone()
    }
}

impl RemoteTransfer for FakeTransfer {
    fn put(&self, local_file: &Path, remote_dir: &str) -> Result<(), TransferError> {
        let name = local_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(prefix) = &self.failing_prefix {
            if name.starts_with(prefix.as_str()) {
                return Err(TransferError::Unavailable(format!(
                    "connection refused while copying {name}"
                )));
            }
        }
        self.copied
            .lock()
            .expect("transfer mutex")
            .push((name, remote_dir.to_string()));
        Ok(())
    }
}

/// Fakes shared between the job under test and the assertions.
#[derive(Debug, Default, Clone)]
pub struct Harness {
    pub warehouse: FakeWarehouse,
    pub portal: FakePortal,
    pub renderer: FakeRenderer,
    pub mailer: FakeMailer,
    pub transfer: FakeTransfer,
}

impl Harness {
    pub fn job(&self) -> PositiveSurpriseJob {
        PositiveSurpriseJob::new(
            Collaborators {
                warehouse: Box::new(self.warehouse.clone()),
                portal: Box::new(self.portal.clone()),
                renderer: Box::new(self.renderer.clone()),
                mailer: Box::new(self.mailer.clone()),
                transfer: Box::new(self.transfer.clone()),
            },
            JobSettings {
                portal_base_url: PORTAL_BASE.to_string(),
                notification: NotificationSettings {
                    operations: OPERATIONS.to_string(),
                    dashboard_url: "https://app.powerbi.example/positive-surprise".to_string(),
                },
                remote_upload_dir: UPLOAD_DIR.to_string(),
                page_options: PageOptions::default(),
            },
            run_date(),
        )
    }
}

pub fn options(root: &Path, publish: bool, app_push: bool) -> JobOptions {
    JobOptions {
        publish,
        app_push,
        output_path: root.join("output"),
        recipient_list: root.join("communication").join("ship_email_list.csv"),
    }
}

pub fn write_recipients(root: &Path, rows: &[(&str, &str)]) {
    let dir = root.join("communication");
    std::fs::create_dir_all(&dir).expect("communication dir");
    let mut contents = String::from("Ship,Recipients\n");
    for (ship, recipients) in rows {
        contents.push_str(&format!("{ship},{recipients}\n"));
    }
    std::fs::write(dir.join("ship_email_list.csv"), contents).expect("write recipients");
}

pub const PUSH_COLUMNS: [&str; 6] = [
    "SHIP_NAME",
    "SHIP_CODE",
    "FIRST_NAME",
    "CABIN",
    "OFFERTITLE",
    "DELIVERY_DATE",
];

/// Three EURODAM guests and one ZUIDERDAM guest.
pub fn push_table() -> Table {
    table(
        &PUSH_COLUMNS,
        &[
            &[Some("ZUIDERDAM"), Some("ZU"), Some("Ada"), Some("2001"), Some("Spa Credit"), Some("2026-10-25")],
            &[Some("EURODAM"), Some("EU"), Some("Ben"), Some("1001"), None, Some("2026-10-26")],
            &[Some("EURODAM"), None, Some("Cy"), Some("1002"), Some("Dinner"), Some("2026-10-26")],
            &[Some("EURODAM"), Some("EU"), Some("Di"), Some("1003"), Some("Dinner"), Some("2026-10-27")],
        ],
    )
}

const SPA_COLUMNS: [&str; 10] = [
    "CABIN",
    "NAME",
    "OFFER_GIFT_CARD",
    "OFFER",
    "TC",
    "LOCATION",
    "SHIP_NAME",
    "SAIL_DATE",
    "HOUSEKEEP_SECTION",
    "EXPIRATION_DATE",
];

const CABIN_COLUMNS: [&str; 21] = [
    "CABIN",
    "NAME",
    "HEADER",
    "OFFER1_GIFT_CARD",
    "OFFER1",
    "TC1",
    "LOCATION1",
    "OFFER2_GIFT_CARD",
    "OFFER2",
    "TC2",
    "EXPIRATION_DATE2",
    "NAME2",
    "CABIN2",
    "LOCATION2",
    "SHIP_NAME2",
    "SAIL_DATE2",
    "HOUSEKEEP_SECTION2",
    "EXPIRATION_DATE",
    "SHIP_NAME",
    "SAIL_DATE",
    "HOUSEKEEP_SECTION",
];

/// Registers a two-voyage run: EURODAM with spa only, ZUIDERDAM with spa
/// and cc plus a cabin print file.
pub fn seed_two_voyages(warehouse: &FakeWarehouse) {
    warehouse
        .respond(
            POSITIVE_SURPRISE_EXECUTION,
            table(&["GUEST_ID"], &[&[Some("1")], &[Some("2")], &[Some("3")]]),
        )
        .respond(
            UPCOMING_VOYAGES,
            table(
                &["VOYAGE", "SHIP_NAME", "SAIL_DATE", "DEPARTMENT"],
                &[
                    &[Some("Z123"), Some("zuiderdam"), Some("2026-10-24"), Some("Spa")],
                    &[Some("Z123"), Some("ZUIDERDAM"), Some("2026-10-24"), Some("spa")],
                    &[Some("Z123"), Some("ZUIDERDAM"), Some("2026-10-24"), Some("CC")],
                    &[Some("E456"), Some("EURODAM"), Some("2026-10-25"), Some("spa")],
                ],
            ),
        )
        .respond(
            VOYAGE_DEPARTMENT_DATA,
            table(&["CABIN", "NAME", "OFFER"], &[&[Some("2001"), Some("Ada"), Some("Massage")]]),
        )
        .respond(
            VOYAGE_SPA_PRINT_DATA,
            table(
                &SPA_COLUMNS,
                &[&[
                    Some("2001"),
                    Some("Ada"),
                    None,
                    Some("Massage"),
                    Some("Terms apply"),
                    Some("Deck 9"),
                    Some("ZUIDERDAM"),
                    Some("2026-10-24"),
                    Some("A"),
                    None,
                ]],
            ),
        )
        .respond(
            &format!("{VOYAGE_CABIN_PRINT_DATA}:ZUIDERDAM"),
            table(&CABIN_COLUMNS, &[&[Some("2001"); 21]]),
        )
        .respond(VOYAGE_PUSH_NOTIFICATIONS_DATA, push_table());
}
