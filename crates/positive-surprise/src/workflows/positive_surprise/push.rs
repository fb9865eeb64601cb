use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, error};

use super::domain::{Table, TableError};
use super::transfer::RemoteTransfer;

/// Warehouse columns renamed to the onboard app's schema.
pub const APP_COLUMN_MAPPING: [(&str, &str); 24] = [
    ("SHIP_NAME", "shipName"),
    ("SHIP_CODE", "shipCode"),
    ("VOYAGE", "voyage"),
    ("SAIL_DATE", "sailDate"),
    ("RETURN_DATE", "returnDate"),
    ("FIRST_NAME", "firstName"),
    ("LAST_NAME", "lastName"),
    ("BKNG_NBR", "booking"),
    ("PARTY_ID", "party"),
    ("FIDELIO_NUMBER", "fidelioId"),
    ("LOYALTY_ID", "loyaltyId"),
    ("CABIN", "cabin"),
    ("OFFER_DEPT", "offerDept"),
    ("OFFER_CODE", "offerCode"),
    ("OFFER", "offer"),
    ("OFFERTITLE", "offerTitle"),
    ("OFFER_MESSAGE", "offerMessage"),
    ("CARD_TEMPLATE", "cardTemplate"),
    ("AMOUNT", "amount"),
    ("DELIVERY_DATE", "deliveryDate"),
    ("DELIVERY_TIME", "deliveryTime"),
    ("EXPIRATION_DATE", "expirationDate"),
    ("TERMS", "terms"),
    ("LOCATION", "location"),
];

/// Ship codes that differ between the warehouse and the app.
const SHIP_CODE_OVERRIDES: [(&str, &str); 1] = [("NIEUW AMSTERDAM", "NA")];

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("ship {0} has no ship code")]
    MissingShipCode(String),
    #[error("unable to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to encode {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Guest records for one ship in the app schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipRecords {
    pub ship_name: String,
    pub ship_code: String,
    pub records: Table,
}

impl ShipRecords {
    /// The records as JSON objects, nulls kept as JSON null.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.records
                .rows()
                .map(|row| {
                    row.cells()
                        .map(|(column, value)| {
                            let value = value
                                .map(|text| Value::String(text.to_string()))
                                .unwrap_or(Value::Null);
                            (column.to_string(), value)
                        })
                        .collect::<Map<String, Value>>()
                })
                .map(Value::Object)
                .collect(),
        )
    }
}

/// App push payload partitioned by ship, ordered by ship name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotificationSet {
    ships: Vec<ShipRecords>,
}

impl PushNotificationSet {
    /// Renames columns to the app schema and splits rows by ship. Rows
    /// without a ship name are dropped. A ship's code is the first non-null
    /// code among its rows unless an override applies.
    pub fn from_table(table: &Table) -> Result<Self, PushError> {
        let mut renamed = table.clone();
        renamed.rename_columns(&APP_COLUMN_MAPPING);
        renamed.require_column("shipName")?;
        renamed.require_column("shipCode")?;

        let mut codes: BTreeMap<String, Option<String>> = BTreeMap::new();
        for row in renamed.rows() {
            let Some(ship_name) = row.get("shipName") else {
                continue;
            };
            let code = codes.entry(ship_name.to_string()).or_default();
            if code.is_none() {
                *code = row.get("shipCode").map(str::to_string);
            }
        }

        let ships = codes
            .into_iter()
            .map(|(ship_name, code)| {
                let ship_code = ship_code_override(&ship_name)
                    .map(str::to_string)
                    .or(code)
                    .ok_or_else(|| PushError::MissingShipCode(ship_name.clone()))?;
                let records =
                    renamed.filter_rows(|row| row.get("shipName") == Some(ship_name.as_str()));
                Ok(ShipRecords {
                    ship_name,
                    ship_code,
                    records,
                })
            })
            .collect::<Result<Vec<_>, PushError>>()?;

        Ok(Self { ships })
    }

    pub fn ships(&self) -> &[ShipRecords] {
        &self.ships
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }
}

fn ship_code_override(ship_name: &str) -> Option<&'static str> {
    SHIP_CODE_OVERRIDES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(ship_name.trim()))
        .map(|(_, code)| *code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Result of writing and transferring one ship's push file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipDelivery {
    pub ship_name: String,
    pub ship_code: String,
    pub file: PathBuf,
    pub outcome: DeliveryOutcome,
}

impl ShipDelivery {
    pub fn delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

/// Writes one JSON file per ship and copies it to the ship server.
#[derive(Debug, Clone, Copy)]
pub struct PushNotificationDelivery<'a> {
    transfer: &'a dyn RemoteTransfer,
    remote_dir: &'a str,
}

impl<'a> PushNotificationDelivery<'a> {
    pub fn new(transfer: &'a dyn RemoteTransfer, remote_dir: &'a str) -> Self {
        Self {
            transfer,
            remote_dir,
        }
    }

    /// File errors abort; a failed transfer is recorded and the next ship
    /// is processed.
    pub fn deliver(
        &self,
        set: &PushNotificationSet,
        ship_stamp: &str,
        output: &Path,
    ) -> Result<Vec<ShipDelivery>, PushError> {
        let mut deliveries = Vec::with_capacity(set.ships().len());

        for ship in set.ships() {
            debug!(ship = %ship.ship_name, code = %ship.ship_code, rows = ship.records.len(), "processing push notifications");
            let file = write_ship_file(ship, ship_stamp, output)?;

            let outcome = match self.transfer.put(&file, self.remote_dir) {
                Ok(()) => {
                    debug!(file = %file.display(), "successfully copied the file");
                    DeliveryOutcome::Delivered
                }
                Err(err) => {
                    error!(ship = %ship.ship_name, error = %err, "error copying the file");
                    DeliveryOutcome::Failed(err.to_string())
                }
            };

            deliveries.push(ShipDelivery {
                ship_name: ship.ship_name.clone(),
                ship_code: ship.ship_code.clone(),
                file,
                outcome,
            });
        }

        Ok(deliveries)
    }
}

/// `<output>/<ship>/notifications/<code>_<stamp>.json`
fn write_ship_file(ship: &ShipRecords, ship_stamp: &str, output: &Path) -> Result<PathBuf, PushError> {
    let dir = output.join(&ship.ship_name).join("notifications");
    fs::create_dir_all(&dir).map_err(|source| PushError::Io {
        path: dir.clone(),
        source,
    })?;

    let file = dir.join(format!("{}_{ship_stamp}.json", ship.ship_code));
    let json = serde_json::to_string_pretty(&ship.to_json()).map_err(|source| PushError::Json {
        path: file.clone(),
        source,
    })?;
    fs::write(&file, json).map_err(|source| PushError::Io {
        path: file.clone(),
        source,
    })?;
    Ok(file)
}
