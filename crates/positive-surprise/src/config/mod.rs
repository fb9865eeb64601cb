use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" | "qa" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the automation job.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub warehouse: WarehouseConfig,
    pub portal: PortalConfig,
    pub template_service: TemplateServiceConfig,
    pub mail: MailConfig,
    pub transfer: TransferConfig,
    pub dashboard_url: String,
}

impl AppConfig {
    /// Loads configuration for the default warehouse connection.
    pub fn load() -> Result<Self, ConfigError> {
        Self::for_connection(DEFAULT_CONNECTION)
    }

    /// Loads configuration, resolving warehouse settings for a named
    /// connection. `SNOWFLAKE_<NAME>_*` variables take precedence over the
    /// unprefixed `SNOWFLAKE_*` ones.
    pub fn for_connection(connection_name: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mail_port = match optional("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort("PORT"))?,
            None => 25,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            warehouse: WarehouseConfig::resolve(connection_name),
            portal: PortalConfig {
                base_url: optional("SHAREPOINT_BASE_URL_HAG"),
                client_id: optional("SP_CLIENT_ID"),
                client_secret: optional("SP_CLIENT_SECRET"),
                tenant_id: optional("SP_TENANT_ID"),
            },
            template_service: TemplateServiceConfig {
                url: optional("TEMPLATE_SERVICE_URL"),
            },
            mail: MailConfig {
                address: optional("ADDRESS").unwrap_or_else(|| "localhost".to_string()),
                port: mail_port,
                sender: optional("MAIL_SENDER").unwrap_or_else(|| DEFAULT_SENDER.to_string()),
                operations: optional("MAIL_OPERATIONS")
                    .unwrap_or_else(|| DEFAULT_OPERATIONS.to_string()),
            },
            transfer: TransferConfig {
                host: optional("SHIP_SERVER_SOURCE_HOST"),
                username: optional("SHIP_SERVER_USERNAME"),
                password: optional("SHIP_SERVER_PASSWORD"),
                upload_dir: optional("SHIP_SERVER_UPLOAD_DIR")
                    .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
            },
            dashboard_url: optional("POWER_BI_DASHBOARD").unwrap_or_default(),
        })
    }
}

pub const DEFAULT_CONNECTION: &str = "hal_snowflake";
pub const DEFAULT_SENDER: &str = "targetedmarketing@hollandamerica.com";
pub const DEFAULT_OPERATIONS: &str = "biautomations@hollandamerica.com";
pub const DEFAULT_UPLOAD_DIR: &str = "/approot/offers/upload";

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Snowflake SQL API connection settings.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub connection_name: String,
    pub account_url: Option<String>,
    pub token: Option<String>,
    pub token_type: String,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
}

impl WarehouseConfig {
    fn resolve(connection_name: &str) -> Self {
        let prefix = connection_prefix(connection_name);
        let lookup = |suffix: &str| {
            optional(&format!("SNOWFLAKE_{prefix}_{suffix}"))
                .or_else(|| optional(&format!("SNOWFLAKE_{suffix}")))
        };

        Self {
            connection_name: connection_name.to_string(),
            account_url: lookup("ACCOUNT_URL"),
            token: lookup("TOKEN"),
            token_type: lookup("TOKEN_TYPE").unwrap_or_else(|| "OAUTH".to_string()),
            warehouse: lookup("WAREHOUSE"),
            database: lookup("DATABASE"),
            schema: lookup("SCHEMA"),
            role: lookup("ROLE"),
        }
    }
}

/// SharePoint site hosting the Positive Surprise document library.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TemplateServiceConfig {
    pub url: Option<String>,
}

/// SMTP relay and fixed addresses used by every outbound email.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub address: String,
    pub port: u16,
    pub sender: String,
    pub operations: String,
}

/// Ship-side file server receiving app push files.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub upload_dir: String,
}

/// Returns the value or a `ConfigError::Missing` naming the variable.
pub fn require<'a>(value: &'a Option<String>, variable: &'static str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(variable))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn connection_prefix(connection_name: &str) -> String {
    connection_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(&'static str),
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(variable) => write!(f, "{variable} must be a valid u16"),
            ConfigError::Missing(variable) => {
                write!(f, "{variable} must be set to run this step")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_LOG_LEVEL",
            "PORT",
            "ADDRESS",
            "MAIL_SENDER",
            "MAIL_OPERATIONS",
            "SNOWFLAKE_ACCOUNT_URL",
            "SNOWFLAKE_HAL_SNOWFLAKE_ACCOUNT_URL",
            "SNOWFLAKE_TOKEN",
            "SHIP_SERVER_UPLOAD_DIR",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.mail.address, "localhost");
        assert_eq!(config.mail.port, 25);
        assert_eq!(config.mail.operations, DEFAULT_OPERATIONS);
        assert_eq!(config.transfer.upload_dir, DEFAULT_UPLOAD_DIR);
        assert_eq!(config.warehouse.connection_name, DEFAULT_CONNECTION);
    }

    #[test]
    fn connection_specific_warehouse_settings_win() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SNOWFLAKE_ACCOUNT_URL", "https://shared.snowflakecomputing.com");
        env::set_var(
            "SNOWFLAKE_HAL_SNOWFLAKE_ACCOUNT_URL",
            "https://hal.snowflakecomputing.com",
        );
        env::set_var("SNOWFLAKE_TOKEN", "shared-token");

        let config = AppConfig::for_connection("hal_snowflake").expect("config loads");
        assert_eq!(
            config.warehouse.account_url.as_deref(),
            Some("https://hal.snowflakecomputing.com")
        );
        assert_eq!(config.warehouse.token.as_deref(), Some("shared-token"));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_mail_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORT", "smtp");
        let error = AppConfig::load().expect_err("invalid port rejected");
        assert!(matches!(error, ConfigError::InvalidPort("PORT")));
        reset_env();
    }

    #[test]
    fn require_names_missing_variable() {
        let error = require(&None, "SP_CLIENT_ID").expect_err("missing");
        assert_eq!(error.to_string(), "SP_CLIENT_ID must be set to run this step");
    }
}
