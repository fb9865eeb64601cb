use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::debug;

use super::domain::{Table, TableError};
use super::queries::Query;
use crate::config::{require, ConfigError, WarehouseConfig};

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("warehouse request failed: {0}")]
    Backend(String),
    #[error("warehouse runtime unavailable: {0}")]
    Runtime(String),
    #[error("statement {query} failed ({code}): {message}")]
    Statement {
        query: &'static str,
        code: String,
        message: String,
    },
    #[error("unexpected warehouse response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
}

pub trait WarehouseGateway: Debug {
    fn query(&self, query: &Query) -> Result<Table, WarehouseError>;
}

const STATEMENT_TIMEOUT_SECONDS: u64 = 600;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Synchronous client for the Snowflake SQL REST API.
pub struct SnowflakeClient {
    http: reqwest::Client,
    runtime: Runtime,
    account_url: String,
    token: String,
    token_type: String,
    context: StatementContext,
}

#[derive(Debug, Clone, Default, Serialize)]
struct StatementContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

impl SnowflakeClient {
    pub fn new(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let account_url = require(&config.account_url, "SNOWFLAKE_ACCOUNT_URL")?;
        let token = require(&config.token, "SNOWFLAKE_TOKEN")?;
        let runtime = Runtime::new().map_err(|err| WarehouseError::Runtime(err.to_string()))?;
        // Result partitions after the first are served gzip-encoded.
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .map_err(Self::map_error)?;

        debug!(connection = %config.connection_name, "initialized warehouse client");

        Ok(Self {
            http,
            runtime,
            account_url: account_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            token_type: config.token_type.clone(),
            context: StatementContext {
                warehouse: config.warehouse.clone(),
                database: config.database.clone(),
                schema: config.schema.clone(),
                role: config.role.clone(),
            },
        })
    }

    fn map_error<E: std::fmt::Display>(err: E) -> WarehouseError {
        WarehouseError::Backend(err.to_string())
    }

    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.account_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.token_type)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn submit(&self, query: &Query) -> Result<StatementResponse, WarehouseError> {
        let body = StatementRequest::from_query(query, &self.context);
        let response = self
            .authorized(self.http.post(self.statements_url()))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;
        self.settle(query, response).await
    }

    async fn fetch(
        &self,
        query: &Query,
        handle: &str,
        partition: Option<usize>,
    ) -> Result<StatementResponse, WarehouseError> {
        let url = format!("{}/{handle}", self.statements_url());
        let mut request = self.authorized(self.http.get(url));
        if let Some(partition) = partition {
            request = request.query(&[("partition", partition)]);
        }
        let response = request.send().await.map_err(Self::map_error)?;
        self.settle(query, response).await
    }

    /// Polls a statement that is still executing until it yields a result.
    async fn settle(
        &self,
        query: &Query,
        mut response: reqwest::Response,
    ) -> Result<StatementResponse, WarehouseError> {
        loop {
            let status = response.status();
            let payload: StatementResponse = response.json().await.map_err(Self::map_error)?;

            if status == StatusCode::ACCEPTED {
                let handle = payload.statement_handle.clone().ok_or_else(|| {
                    WarehouseError::MalformedResponse("pending statement without handle".into())
                })?;
                tokio::time::sleep(POLL_INTERVAL).await;
                let url = format!("{}/{handle}", self.statements_url());
                response = self
                    .authorized(self.http.get(url))
                    .send()
                    .await
                    .map_err(Self::map_error)?;
                continue;
            }

            if !status.is_success() {
                return Err(WarehouseError::Statement {
                    query: query.name,
                    code: payload.code.unwrap_or_else(|| status.as_u16().to_string()),
                    message: payload.message.unwrap_or_default(),
                });
            }

            return Ok(payload);
        }
    }

    async fn execute(&self, query: &Query) -> Result<Table, WarehouseError> {
        let mut response = self.submit(query).await?;

        if query.multi_statement {
            let last = response
                .statement_handles
                .as_ref()
                .and_then(|handles| handles.last().cloned())
                .ok_or_else(|| {
                    WarehouseError::MalformedResponse(
                        "multi-statement response without statement handles".into(),
                    )
                })?;
            response = self.fetch(query, &last, None).await?;
        }

        let handle = response.statement_handle.clone();
        let partitions = response
            .result_set_meta_data
            .as_ref()
            .map(|meta| meta.partition_info.len())
            .unwrap_or(0);

        let mut extra = Vec::new();
        if let Some(handle) = handle.as_deref() {
            for partition in 1..partitions {
                let page = self.fetch(query, handle, Some(partition)).await?;
                extra.extend(page.data.unwrap_or_default());
            }
        }

        response.into_table(extra)
    }
}

impl Debug for SnowflakeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeClient")
            .field("account_url", &self.account_url)
            .finish_non_exhaustive()
    }
}

impl WarehouseGateway for SnowflakeClient {
    fn query(&self, query: &Query) -> Result<Table, WarehouseError> {
        debug!(query = query.name, bindings = query.bindings.len(), "issuing warehouse query");
        let table = self.runtime.block_on(self.execute(query))?;
        debug!(query = query.name, rows = table.len(), "warehouse query complete");
        Ok(table)
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(flatten)]
    context: &'a StatementContext,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
struct Binding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

impl<'a> StatementRequest<'a> {
    fn from_query(query: &'a Query, context: &'a StatementContext) -> Self {
        let bindings = query
            .bindings
            .iter()
            .enumerate()
            .map(|(index, value)| {
                (
                    (index + 1).to_string(),
                    Binding {
                        kind: "TEXT",
                        value,
                    },
                )
            })
            .collect();

        let mut parameters = BTreeMap::new();
        if query.multi_statement {
            // 0 lets the service accept any number of statements.
            parameters.insert("MULTI_STATEMENT_COUNT", "0".to_string());
        }

        Self {
            statement: &query.sql,
            timeout: STATEMENT_TIMEOUT_SECONDS,
            context,
            bindings,
            parameters,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_handles: Option<Vec<String>>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<ColumnType>,
    #[serde(default)]
    partition_info: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl StatementResponse {
    fn into_table(self, extra_rows: Vec<Vec<Option<String>>>) -> Result<Table, WarehouseError> {
        let meta = self.result_set_meta_data.ok_or_else(|| {
            WarehouseError::MalformedResponse("result set metadata missing".into())
        })?;
        let date_columns: Vec<bool> = meta
            .row_type
            .iter()
            .map(|column| column.kind.eq_ignore_ascii_case("date"))
            .collect();

        let mut table = Table::new(meta.row_type.into_iter().map(|column| column.name));
        for row in self.data.unwrap_or_default().into_iter().chain(extra_rows) {
            let row = row
                .into_iter()
                .zip(date_columns.iter())
                .map(|(cell, is_date)| match cell {
                    Some(value) if *is_date => Some(epoch_days_to_iso(&value).unwrap_or(value)),
                    other => other,
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// DATE values arrive as days since the Unix epoch.
fn epoch_days_to_iso(raw: &str) -> Option<String> {
    let days: i64 = raw.trim().parse().ok()?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_signed(chrono::Duration::days(days))?;
    Some(date.format("%Y-%m-%d").to_string())
}
