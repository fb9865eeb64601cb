use serde::Serialize;
use tracing::debug;

use super::domain::{Row, Table, TableError};

pub const SPA_TEMPLATE: &str = "HAL_PS_SPA_TEMPLATE_V1.html";
pub const CABIN_TEMPLATE: &str = "HAL_PS_CABIN_TEMPLATE_V1.html";

/// Request body understood by the templating service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMergePayload {
    pub ship: String,
    pub output_type: &'static str,
    pub template_name: &'static str,
    pub runtime: &'static str,
    pub template_parms: TemplateParms,
}

impl MailMergePayload {
    fn new(ship: &str, template_name: &'static str, template_parms: TemplateParms) -> Self {
        Self {
            ship: ship.to_string(),
            output_type: "PDF",
            template_name,
            runtime: "local",
            template_parms,
        }
    }

    pub fn record_count(&self) -> usize {
        match &self.template_parms {
            TemplateParms::Spa(records) => records.len(),
            TemplateParms::Cabin(records) => records.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemplateParms {
    Spa(Vec<SpaMailMergeRecord>),
    Cabin(Vec<CabinMailMergeRecord>),
}

/// One spa flier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SpaMailMergeRecord {
    pub cabin: String,
    pub name: String,
    pub offer_gift_card: String,
    pub offer: String,
    pub tc: String,
    pub location: String,
    pub ship_name: String,
    pub sail_date: String,
    pub housekeep_section: String,
    pub expiration_date: String,
}

impl SpaMailMergeRecord {
    pub fn from_row(row: &Row<'_>) -> Result<Self, TableError> {
        Ok(Self {
            cabin: row.text("CABIN")?,
            name: row.text("NAME")?,
            offer_gift_card: row.text("OFFER_GIFT_CARD")?,
            offer: row.text("OFFER")?,
            tc: row.text("TC")?,
            location: row.text("LOCATION")?,
            ship_name: row.text("SHIP_NAME")?,
            sail_date: row.text("SAIL_DATE")?,
            housekeep_section: row.text("HOUSEKEEP_SECTION")?,
            expiration_date: row.text("EXPIRATION_DATE")?,
        })
    }
}

/// One cabin flier printing two offers. The template reads slot 2 from the
/// `*2` keys, slot 1 from `OFFER1*`/`TC1`/`LOCATION1`, and the guest and
/// voyage details of slot 1 from the unsuffixed keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CabinMailMergeRecord {
    pub cabin: String,
    pub name: String,
    pub header: String,
    pub offer2_gift_card: String,
    pub offer2: String,
    pub tc2: String,
    pub expiration_date2: String,
    pub name2: String,
    pub cabin2: String,
    pub location2: String,
    pub ship_name2: String,
    pub sail_date2: String,
    pub housekeep_section2: String,
    pub offer1_gift_card: String,
    pub offer1: String,
    pub tc1: String,
    pub expiration_date: String,
    pub location1: String,
    pub ship_name: String,
    pub sail_date: String,
    pub housekeep_section: String,
}

impl CabinMailMergeRecord {
    pub fn from_row(row: &Row<'_>) -> Result<Self, TableError> {
        Ok(Self {
            cabin: row.text("CABIN")?,
            name: row.text("NAME")?,
            header: row.text("HEADER")?,
            offer2_gift_card: row.text("OFFER2_GIFT_CARD")?,
            offer2: row.text("OFFER2")?,
            tc2: row.text("TC2")?,
            expiration_date2: row.text("EXPIRATION_DATE2")?,
            name2: row.text("NAME2")?,
            cabin2: row.text("CABIN2")?,
            location2: row.text("LOCATION2")?,
            ship_name2: row.text("SHIP_NAME2")?,
            sail_date2: row.text("SAIL_DATE2")?,
            housekeep_section2: row.text("HOUSEKEEP_SECTION2")?,
            offer1_gift_card: row.text("OFFER1_GIFT_CARD")?,
            offer1: row.text("OFFER1")?,
            tc1: row.text("TC1")?,
            expiration_date: row.text("EXPIRATION_DATE")?,
            location1: row.text("LOCATION1")?,
            ship_name: row.text("SHIP_NAME")?,
            sail_date: row.text("SAIL_DATE")?,
            housekeep_section: row.text("HOUSEKEEP_SECTION")?,
        })
    }
}

pub fn spa_mail_merge(table: &Table, ship_name: &str) -> Result<MailMergePayload, TableError> {
    debug!(ship = ship_name, "loading the spa mail merge dictionary");
    let records = table
        .rows()
        .map(|row| SpaMailMergeRecord::from_row(&row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MailMergePayload::new(
        ship_name,
        SPA_TEMPLATE,
        TemplateParms::Spa(records),
    ))
}

pub fn cabin_mail_merge(table: &Table, ship_name: &str) -> Result<MailMergePayload, TableError> {
    debug!(ship = ship_name, "loading the cabin mail merge dictionary");
    let records = table
        .rows()
        .map(|row| CabinMailMergeRecord::from_row(&row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MailMergePayload::new(
        ship_name,
        CABIN_TEMPLATE,
        TemplateParms::Cabin(records),
    ))
}
