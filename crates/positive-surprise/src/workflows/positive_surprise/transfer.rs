use std::fmt::Debug;
use std::io::Write;
use std::net::TcpStream;
use std::path::Path;
use std::sync::Mutex;

use ssh2::Session;
use tracing::debug;

use crate::config::{require, ConfigError, TransferConfig};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("unable to reach {host}: {source}")]
    Connect {
        host: String,
        source: std::io::Error,
    },
    #[error("ssh session failed: {0}")]
    Ssh(#[from] ssh2::Error),
    #[error("unable to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to stream file to remote host: {0}")]
    Write(std::io::Error),
    #[error("transfer client unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Copies a local file into a directory on the ship-side server.
pub trait RemoteTransfer: Debug {
    fn put(&self, local_file: &Path, remote_dir: &str) -> Result<(), TransferError>;
}

const DEFAULT_SSH_PORT: u16 = 22;
const REMOTE_FILE_MODE: i32 = 0o644;

/// SCP over a password-authenticated SSH session. The session is opened on
/// the first transfer and reused afterwards.
pub struct ScpTransfer {
    config: TransferConfig,
    session: Mutex<Option<Session>>,
}

impl ScpTransfer {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<Session, TransferError> {
        let host = require(&self.config.host, "SHIP_SERVER_SOURCE_HOST")?;
        let username = require(&self.config.username, "SHIP_SERVER_USERNAME")?;
        let password = require(&self.config.password, "SHIP_SERVER_PASSWORD")?;

        let (hostname, port) = split_host(host);
        let tcp = TcpStream::connect((hostname, port)).map_err(|source| TransferError::Connect {
            host: host.to_string(),
            source,
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        session.userauth_password(username, password)?;
        if !session.authenticated() {
            return Err(TransferError::Unavailable(format!(
                "authentication rejected for {username}@{host}"
            )));
        }

        debug!(host, "opened ssh session to ship server");
        Ok(session)
    }
}

impl Debug for ScpTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScpTransfer")
            .field("host", &self.config.host)
            .finish_non_exhaustive()
    }
}

impl RemoteTransfer for ScpTransfer {
    fn put(&self, local_file: &Path, remote_dir: &str) -> Result<(), TransferError> {
        let contents = std::fs::read(local_file).map_err(|source| TransferError::Read {
            path: local_file.display().to_string(),
            source,
        })?;
        let file_name = local_file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                TransferError::Unavailable(format!("{} has no file name", local_file.display()))
            })?;
        let remote_path = format!("{}/{file_name}", remote_dir.trim_end_matches('/'));

        let mut guard = self
            .session
            .lock()
            .map_err(|_| TransferError::Unavailable("session lock poisoned".into()))?;
        with_cached_session(
            &mut *guard,
            || self.connect(),
            |session| send_file(session, &remote_path, &contents),
        )?;

        debug!(remote = %remote_path, bytes = contents.len(), "copied file to ship server");
        Ok(())
    }
}

/// Runs `action` against the cached session, opening one first if needed.
/// Any failure drops the cached session so the next call reconnects.
fn with_cached_session<S>(
    slot: &mut Option<S>,
    open: impl FnOnce() -> Result<S, TransferError>,
    action: impl FnOnce(&S) -> Result<(), TransferError>,
) -> Result<(), TransferError> {
    let session = match slot.take() {
        Some(session) => session,
        None => open()?,
    };
    action(&session)?;
    *slot = Some(session);
    Ok(())
}

fn send_file(session: &Session, remote_path: &str, contents: &[u8]) -> Result<(), TransferError> {
    let mut channel = session.scp_send(
        Path::new(remote_path),
        REMOTE_FILE_MODE,
        contents.len() as u64,
        None,
    )?;
    channel.write_all(contents).map_err(TransferError::Write)?;
    channel.send_eof()?;
    channel.wait_eof()?;
    channel.close()?;
    channel.wait_close()?;
    Ok(())
}

fn split_host(host: &str) -> (&str, u16) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, DEFAULT_SSH_PORT),
        },
        None => (host, DEFAULT_SSH_PORT),
    }
}
