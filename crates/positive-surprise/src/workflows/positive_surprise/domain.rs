use chrono::NaiveDate;
use serde::Serialize;

/// Tabular warehouse result: ordered column names and rows of nullable text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("column {0} missing from result set")]
    MissingColumn(String),
    #[error("row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
    #[error("column {column} holds '{value}', which is not a date")]
    InvalidDate { column: String, value: String },
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup; warehouse identifiers come back upper-cased.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            table: self,
            cells,
        })
    }

    /// Renames columns in place; names absent from the table are ignored.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, renamed)) = mapping
                .iter()
                .find(|(from, _)| column.eq_ignore_ascii_case(from))
            {
                *column = (*renamed).to_string();
            }
        }
    }

    /// Copies the rows for which `keep` returns true into a new table.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Borrowed view of a single table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Value of `column`, `None` when the column is absent or the cell is null.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column_index(column)
            .and_then(|index| self.cells[index].as_deref())
    }

    /// Value of a required column with nulls normalized to an empty string.
    pub fn text(&self, column: &str) -> Result<String, TableError> {
        let index = self.table.require_column(column)?;
        Ok(self.cells[index].clone().unwrap_or_default())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> {
        self.table
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Option::as_deref))
    }
}

/// Unique identifier of one sailing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VoyageKey {
    pub ship_name: String,
    pub sail_date: NaiveDate,
}

/// One normalized row of the upcoming voyage list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VoyageListing {
    pub sail_date: NaiveDate,
    pub ship_name: String,
    pub department: String,
}

/// A sailing with the departments that qualified guests and the portal
/// links produced for it during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voyage {
    pub key: VoyageKey,
    departments: Vec<String>,
    links: Vec<(String, String)>,
}

impl Voyage {
    pub fn new(key: VoyageKey) -> Self {
        Self {
            key,
            departments: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Adds a lower-cased department unless already present.
    pub fn add_department(&mut self, department: &str) {
        let department = department.trim().to_lowercase();
        if !self.departments.contains(&department) {
            self.departments.push(department);
        }
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    /// Records a link, replacing an earlier one with the same label.
    pub fn add_link(&mut self, label: impl Into<String>, url: impl Into<String>) {
        let label = label.into();
        let url = url.into();
        match self.links.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = url,
            None => self.links.push((label, url)),
        }
    }

    pub fn links(&self) -> &[(String, String)] {
        &self.links
    }
}

/// Date stamps derived from the day the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate(pub NaiveDate);

impl RunDate {
    /// `(MM-DD-YY)`, used in export file names and the completion subject.
    pub fn file_stamp(&self) -> String {
        self.0.format("(%m-%d-%y)").to_string()
    }

    /// `YYYYMMDD`, used in push notification file names.
    pub fn ship_stamp(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

/// Capitalizes the first letter of every alphabetic run and lower-cases the
/// rest, so `NIEUW AMSTERDAM` becomes `Nieuw Amsterdam`.
pub fn title_case(value: &str) -> String {
    let mut titled = String::with_capacity(value.len());
    let mut previous_alphabetic = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_alphabetic {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            titled.push(c);
            previous_alphabetic = false;
        }
    }
    titled
}

/// Parses warehouse date text (`YYYY-MM-DD`, optionally followed by a time).
pub fn parse_sail_date(column: &str, value: &str) -> Result<NaiveDate, TableError> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| TableError::InvalidDate {
        column: column.to_string(),
        value: value.to_string(),
    })
}
