use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::positive_surprise::{
    JobError, MailError, PortalError, TemplateError, WarehouseError,
};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Integration {
        name: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    Job(JobError),
}

impl AppError {
    fn integration<E>(name: &'static str, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Integration {
            name,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Integration { name, source } => {
                write!(f, "unable to initialize {}: {}", name, source)
            }
            AppError::Job(err) => write!(f, "job error: {}", err),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Integration { source, .. } => Some(source.as_ref()),
            AppError::Job(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<JobError> for AppError {
    fn from(value: JobError) -> Self {
        Self::Job(value)
    }
}

impl From<WarehouseError> for AppError {
    fn from(value: WarehouseError) -> Self {
        Self::integration("warehouse client", value)
    }
}

impl From<PortalError> for AppError {
    fn from(value: PortalError) -> Self {
        Self::integration("portal client", value)
    }
}

impl From<TemplateError> for AppError {
    fn from(value: TemplateError) -> Self {
        Self::integration("template renderer", value)
    }
}

impl From<MailError> for AppError {
    fn from(value: MailError) -> Self {
        Self::integration("mailer", value)
    }
}
