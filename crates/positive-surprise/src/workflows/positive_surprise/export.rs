use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::debug;

use super::domain::Table;
use super::portal::{PortalError, PortalGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unable to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write csv {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("unable to write workbook {path}: {source}")]
    Xlsx { path: PathBuf, source: XlsxError },
    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Writes tables to local storage and optionally publishes them.
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'a> {
    portal: &'a dyn PortalGateway,
}

impl<'a> Exporter<'a> {
    pub fn new(portal: &'a dyn PortalGateway) -> Self {
        Self { portal }
    }

    /// Writes `<local_path>/<filename>.<ext>` with a header row and no index
    /// column, then uploads it to `portal_path` when `publish` is set.
    /// Callers skip empty tables.
    pub fn export(
        &self,
        table: &Table,
        filename: &str,
        local_path: &Path,
        format: ExportFormat,
        publish: bool,
        portal_path: &str,
    ) -> Result<PathBuf, ExportError> {
        debug!(filename, extension = format.extension(), "exporting data");

        fs::create_dir_all(local_path).map_err(|source| ExportError::Io {
            path: local_path.to_path_buf(),
            source,
        })?;

        let local_file = local_path.join(format!("{filename}.{}", format.extension()));
        match format {
            ExportFormat::Csv => write_csv(table, &local_file)?,
            ExportFormat::Xlsx => write_xlsx(table, &local_file)?,
        }

        if publish {
            self.portal.push(&local_file, portal_path)?;
        }

        Ok(local_file)
    }
}

fn write_csv(table: &Table, path: &Path) -> Result<(), ExportError> {
    let wrap = |source: csv::Error| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    writer.write_record(table.columns()).map_err(wrap)?;
    for row in table.rows() {
        writer
            .write_record(row.cells().map(|(_, value)| value.unwrap_or_default()))
            .map_err(wrap)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_xlsx(table: &Table, path: &Path) -> Result<(), ExportError> {
    let wrap = |source: XlsxError| ExportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, sheet_col(col).map_err(wrap)?, name, &header)
            .map_err(wrap)?;
    }
    for (index, row) in table.rows().enumerate() {
        let row_number = sheet_row(index + 1).map_err(wrap)?;
        for (col, (_, value)) in row.cells().enumerate() {
            if let Some(value) = value {
                worksheet
                    .write_string(row_number, sheet_col(col).map_err(wrap)?, value)
                    .map_err(wrap)?;
            }
        }
    }

    workbook.save(path).map_err(wrap)
}

fn sheet_row(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn sheet_col(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}
