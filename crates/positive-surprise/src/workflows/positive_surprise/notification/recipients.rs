use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use serde::Deserialize;

use super::NotificationError;

/// Ship name to recipient addresses, loaded from the notification list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientDirectory {
    by_ship: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    #[serde(rename = "Ship")]
    ship: String,
    #[serde(rename = "Recipients", default)]
    recipients: String,
}

impl RecipientDirectory {
    /// Loads an `.xlsx`/`.xls` workbook (first sheet) or a `.csv` file with
    /// `Ship` and `Recipients` columns.
    pub fn load(path: &Path) -> Result<Self, NotificationError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let rows = if extension == "csv" {
            read_csv(path)?
        } else {
            read_workbook(path)?
        };

        let mut directory = Self::default();
        for (ship, recipients) in rows {
            directory.insert(&ship, &recipients);
        }
        Ok(directory)
    }

    /// Adds a ship entry from a `;`-delimited address list. The first entry
    /// for a ship is kept.
    pub fn insert(&mut self, ship: &str, recipients: &str) {
        let addresses = recipients
            .split(';')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();
        self.by_ship
            .entry(normalize_ship(ship))
            .or_insert(addresses);
    }

    pub fn recipients_for(&self, ship: &str) -> Option<&[String]> {
        self.by_ship.get(&normalize_ship(ship)).map(Vec::as_slice)
    }
}

fn normalize_ship(ship: &str) -> String {
    ship.trim().to_uppercase()
}

fn read_csv(path: &Path) -> Result<Vec<(String, String)>, NotificationError> {
    let source = |err: csv::Error| NotificationError::Recipients {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(source)?;

    reader
        .deserialize::<RecipientRow>()
        .map(|row| row.map(|row| (row.ship, row.recipients)).map_err(source))
        .collect()
}

fn read_workbook(path: &Path) -> Result<Vec<(String, String)>, NotificationError> {
    let failure = |reason: String| NotificationError::Recipients {
        path: PathBuf::from(path),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|err| failure(err.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| failure("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|err| failure(err.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let column = |name: &str| {
        header
            .iter()
            .position(|value| value.eq_ignore_ascii_case(name))
            .ok_or_else(|| failure(format!("column {name} missing")))
    };
    let ship_index = column("Ship")?;
    let recipients_index = column("Recipients")?;

    Ok(rows
        .filter_map(|cells| {
            let ship = cells.get(ship_index)?.to_string();
            if ship.trim().is_empty() {
                return None;
            }
            let recipients = cells
                .get(recipients_index)
                .map(ToString::to_string)
                .unwrap_or_default();
            Some((ship, recipients))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_lists_split_on_semicolons() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "Ship,Recipients\nZUIDERDAM,hm.zu@ship.example; spa.zu@ship.example;\nEurodam,hm.eu@ship.example"
        )
        .expect("write csv");

        let directory = RecipientDirectory::load(file.path()).expect("directory loads");
        assert_eq!(
            directory.recipients_for("Zuiderdam").expect("ship present"),
            ["hm.zu@ship.example", "spa.zu@ship.example"]
        );
        assert_eq!(
            directory.recipients_for("EURODAM").expect("ship present"),
            ["hm.eu@ship.example"]
        );
        assert!(directory.recipients_for("KONINGSDAM").is_none());
    }

    #[test]
    fn duplicated_ship_rows_keep_the_first_entry() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "Ship,Recipients\nZUIDERDAM,a@x.example; b@x.example\nZuiderdam,second@x.example"
        )
        .expect("write csv");

        let directory = RecipientDirectory::load(file.path()).expect("directory loads");
        assert_eq!(
            directory.recipients_for("ZUIDERDAM").expect("ship present"),
            ["a@x.example", "b@x.example"]
        );
    }

    fn write_workbook(path: &Path, rows: &[(&str, &str)]) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Ship").expect("header");
        sheet.write_string(0, 1, "Recipients").expect("header");
        for (row, (ship, recipients)) in (1u32..).zip(rows) {
            sheet.write_string(row, 0, *ship).expect("ship cell");
            sheet.write_string(row, 1, *recipients).expect("recipients cell");
        }
        workbook.save(path).expect("save workbook");
    }

    #[test]
    fn workbook_lists_split_on_semicolons() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ship_email_list.xlsx");
        write_workbook(
            &path,
            &[
                ("ZUIDERDAM", "hm.zu@ship.example; spa.zu@ship.example;"),
                ("Eurodam", "hm.eu@ship.example"),
                ("ZUIDERDAM", "second@ship.example"),
            ],
        );

        let directory = RecipientDirectory::load(&path).expect("directory loads");
        assert_eq!(
            directory.recipients_for("zuiderdam").expect("ship present"),
            ["hm.zu@ship.example", "spa.zu@ship.example"]
        );
        assert_eq!(
            directory.recipients_for("EURODAM").expect("ship present"),
            ["hm.eu@ship.example"]
        );
        assert!(directory.recipients_for("KONINGSDAM").is_none());
    }

    #[test]
    fn missing_workbook_is_a_recipient_error() {
        let error = RecipientDirectory::load(Path::new("./communication/missing.xlsx"))
            .expect_err("workbook missing");
        assert!(matches!(error, NotificationError::Recipients { .. }));
    }
}
