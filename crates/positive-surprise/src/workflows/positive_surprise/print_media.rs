use std::fmt::Debug;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::debug;

use super::mail_merge::MailMergePayload;
use super::portal::{PortalError, PortalGateway};
use crate::config::{require, ConfigError, TemplateServiceConfig};

/// Page geometry forwarded to the PDF renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageOptions {
    #[serde(rename = "page-height")]
    pub page_height: String,
    #[serde(rename = "page-width")]
    pub page_width: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_height: "11in".to_string(),
            page_width: "4.5in".to_string(),
        }
    }
}

/// Everything the templating service needs to produce one merged document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest<'a> {
    pub dictionary: &'a MailMergePayload,
    #[serde(skip)]
    pub output_dir: &'a Path,
    pub merge_file_name: &'a str,
    pub options: &'a PageOptions,
    pub clean_folder: bool,
    pub delete_single_files: bool,
    pub create_folder: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template service failed: {0}")]
    Service(String),
    #[error("template runtime unavailable: {0}")]
    Runtime(String),
    #[error("unable to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub trait TemplateRenderer: Debug {
    /// Renders the payload and returns the files left in `output_dir`.
    fn render(&self, request: &RenderRequest<'_>) -> Result<Vec<PathBuf>, TemplateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PrintMediaError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Renders mail merges into a single print-ready PDF per call.
#[derive(Debug, Clone, Copy)]
pub struct PrintMediaGenerator<'a> {
    renderer: &'a dyn TemplateRenderer,
    portal: &'a dyn PortalGateway,
}

impl<'a> PrintMediaGenerator<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer, portal: &'a dyn PortalGateway) -> Self {
        Self { renderer, portal }
    }

    pub fn render(
        &self,
        payload: &MailMergePayload,
        output_dir: &Path,
        output_filename: &str,
        options: &PageOptions,
        publish: bool,
        portal_path: &str,
    ) -> Result<Vec<PathBuf>, PrintMediaError> {
        debug!(
            file = output_filename,
            records = payload.record_count(),
            "generating print media"
        );

        let request = RenderRequest {
            dictionary: payload,
            output_dir,
            merge_file_name: output_filename,
            options,
            clean_folder: true,
            delete_single_files: true,
            create_folder: true,
        };
        let files = self.renderer.render(&request)?;

        if publish {
            self.portal
                .push(&output_dir.join(output_filename), portal_path)?;
        }

        Ok(files)
    }
}

/// Client for the HTTP templating service; the service renders one page per
/// record, merges them, and answers with the merged PDF.
pub struct HttpTemplateRenderer {
    http: reqwest::Client,
    runtime: Runtime,
    endpoint: String,
}

impl HttpTemplateRenderer {
    pub fn new(config: &TemplateServiceConfig) -> Result<Self, TemplateError> {
        let url = require(&config.url, "TEMPLATE_SERVICE_URL")?;
        let runtime = Runtime::new().map_err(|err| TemplateError::Runtime(err.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            runtime,
            endpoint: format!("{}/render", url.trim_end_matches('/')),
        })
    }

    fn map_error<E: std::fmt::Display>(err: E) -> TemplateError {
        TemplateError::Service(err.to_string())
    }

    async fn fetch(&self, request: &RenderRequest<'_>) -> Result<Vec<u8>, TemplateError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(Self::map_error)?
            .error_for_status()
            .map_err(Self::map_error)?;
        let bytes = response.bytes().await.map_err(Self::map_error)?;
        Ok(bytes.to_vec())
    }
}

impl Debug for HttpTemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTemplateRenderer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer for HttpTemplateRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<Vec<PathBuf>, TemplateError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TemplateError::Io { path, source }
        };

        if request.create_folder {
            std::fs::create_dir_all(request.output_dir).map_err(io_error(request.output_dir))?;
        }

        let pdf = self.runtime.block_on(self.fetch(request))?;
        let merged = request.output_dir.join(request.merge_file_name);
        std::fs::write(&merged, pdf).map_err(io_error(&merged))?;
        Ok(vec![merged])
    }
}
