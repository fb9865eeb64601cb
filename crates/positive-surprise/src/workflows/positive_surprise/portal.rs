use std::fmt::Debug;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::Url;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::{require, ConfigError, PortalConfig};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("portal operation failed: {0}")]
    Backend(String),
    #[error("portal runtime unavailable: {0}")]
    Runtime(String),
    #[error("unable to read {path} for upload: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid portal url: {0}")]
    Url(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Document portal receiving exported files.
pub trait PortalGateway: Debug {
    /// Uploads `local_file` into the folder at `portal_path`, replacing any
    /// file of the same name.
    fn push(&self, local_file: &Path, portal_path: &str) -> Result<(), PortalError>;
}

/// Browser link for a file published under `portal_path`.
pub fn portal_link(base_url: &str, portal_path: &str, file_name: &str) -> String {
    format!(
        "{}/{}{}?web=1",
        base_url.trim_end_matches('/'),
        portal_path.trim_start_matches('/'),
        file_name
    )
}

const SHAREPOINT_PRINCIPAL: &str = "00000003-0000-0ff1-ce00-000000000000";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// SharePoint site client using an app-only (client credentials) principal.
pub struct SharePointClient {
    http: reqwest::Client,
    runtime: Runtime,
    site: Url,
    client_id: String,
    client_secret: String,
    tenant_id: String,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl SharePointClient {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let base_url = require(&config.base_url, "SHAREPOINT_BASE_URL_HAG")?;
        let client_id = require(&config.client_id, "SP_CLIENT_ID")?;
        let client_secret = require(&config.client_secret, "SP_CLIENT_SECRET")?;
        let tenant_id = require(&config.tenant_id, "SP_TENANT_ID")?;

        let site = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| PortalError::Url(format!("{base_url}: {err}")))?;
        let runtime = Runtime::new().map_err(|err| PortalError::Runtime(err.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            runtime,
            site,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            tenant_id: tenant_id.to_string(),
            token: Mutex::new(None),
        })
    }

    fn map_error<E: std::fmt::Display>(err: E) -> PortalError {
        PortalError::Backend(err.to_string())
    }

    fn host(&self) -> Result<&str, PortalError> {
        self.site
            .host_str()
            .ok_or_else(|| PortalError::Url(format!("{} has no host", self.site)))
    }

    /// Folder path relative to the server root, e.g.
    /// `/sites/HAG/Positive Surprise/HAL/ZUIDERDAM/Spa`.
    fn server_relative(&self, portal_path: &str) -> String {
        let site_path = self.site.path().trim_end_matches('/');
        let folder = portal_path.trim_matches('/');
        format!("{site_path}/{folder}")
    }

    fn api_url(&self, endpoint: &str) -> Result<Url, PortalError> {
        let raw = format!("{}/_api/{endpoint}", self.site.as_str().trim_end_matches('/'));
        Url::parse(&raw).map_err(|err| PortalError::Url(format!("{raw}: {err}")))
    }

    async fn access_token(&self) -> Result<String, PortalError> {
        if let Some(token) = self
            .token
            .lock()
            .map_err(|_| PortalError::Backend("token cache poisoned".into()))?
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
        {
            return Ok(token.value.clone());
        }

        let host = self.host()?;
        let url = format!(
            "https://accounts.accesscontrol.windows.net/{}/tokens/OAuth/2",
            self.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", format!("{}@{}", self.client_id, self.tenant_id)),
            ("client_secret", self.client_secret.clone()),
            (
                "resource",
                format!("{SHAREPOINT_PRINCIPAL}/{host}@{}", self.tenant_id),
            ),
        ];

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Self::map_error)?
            .error_for_status()
            .map_err(Self::map_error)?;
        let token: TokenResponse = response.json().await.map_err(Self::map_error)?;

        let lifetime = token
            .expires_in
            .as_ref()
            .and_then(|value| match value {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        let cached = AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        };
        let value = cached.value.clone();
        *self
            .token
            .lock()
            .map_err(|_| PortalError::Backend("token cache poisoned".into()))? = Some(cached);
        Ok(value)
    }

    async fn ensure_folder(&self, token: &str, server_relative: &str) -> Result<(), PortalError> {
        let url = self.api_url(&format!(
            "web/folders/add('{}')",
            escape_odata(server_relative)
        ))?;
        self.http
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json;odata=nometadata")
            .send()
            .await
            .map_err(Self::map_error)?
            .error_for_status()
            .map_err(Self::map_error)?;
        Ok(())
    }

    async fn upload(&self, local_file: &Path, portal_path: &str) -> Result<(), PortalError> {
        let file_name = local_file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PortalError::Backend(format!("{} has no file name", local_file.display())))?
            .to_string();
        let bytes = tokio::fs::read(local_file)
            .await
            .map_err(|source| PortalError::Read {
                path: local_file.display().to_string(),
                source,
            })?;

        let token = self.access_token().await?;
        let folder = self.server_relative(portal_path);
        self.ensure_folder(&token, &folder).await?;

        let url = self.api_url(&format!(
            "web/GetFolderByServerRelativeUrl('{}')/Files/add(url='{}',overwrite=true)",
            escape_odata(&folder),
            escape_odata(&file_name)
        ))?;
        let mime = mime_guess::from_path(local_file).first_or_octet_stream();

        self.http
            .post(url)
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, "application/json;odata=nometadata")
            .header(reqwest::header::CONTENT_TYPE, mime.as_ref())
            .body(bytes)
            .send()
            .await
            .map_err(Self::map_error)?
            .error_for_status()
            .map_err(Self::map_error)?;
        Ok(())
    }
}

impl Debug for SharePointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharePointClient")
            .field("site", &self.site.as_str())
            .finish_non_exhaustive()
    }
}

impl PortalGateway for SharePointClient {
    fn push(&self, local_file: &Path, portal_path: &str) -> Result<(), PortalError> {
        debug!(file = %local_file.display(), portal_path, "publishing file to portal");
        self.runtime.block_on(self.upload(local_file, portal_path))
    }
}

fn escape_odata(raw: &str) -> String {
    raw.replace('\'', "''")
}
