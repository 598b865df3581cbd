mod listing;
mod session;
mod transfer;

pub use listing::EntryFilter;

use std::time::Instant;

use crate::{config::ClientConfig, error::FtpResult, transport::Dialer};
use session::SessionManager;

/// High-level FTP client.
///
/// Every operation acquires a session, performs its protocol calls and
/// releases the session again. Whether that session is opened for the
/// operation or shared with previous ones is decided by
/// [`ClientConfig::persistent`]:
///
/// * non-persistent: each operation dials, logs in and quits on its own,
///   so the client can be used from several tasks at once;
/// * persistent: one session is cached and reused until its
///   [`ClientConfig::ttl`] runs out. Operations on the same client are
///   serialized while they hold the session.
pub struct Client<D: Dialer> {
    sessions: SessionManager<D>,
}

impl<D: Dialer> Client<D> {
    /// Creates a client without connecting.
    ///
    /// A persistent client opens its session on the first operation, and any
    /// failure to do so is returned by that operation.
    pub fn new(config: ClientConfig, dialer: D) -> Self {
        Self {
            sessions: SessionManager::new(config, dialer),
        }
    }

    /// Creates a client and, if it is persistent, opens its session right away.
    pub async fn connect(config: ClientConfig, dialer: D) -> FtpResult<Self> {
        let client = Self::new(config, dialer);
        client.sessions.warm_up().await?;
        Ok(client)
    }

    pub const fn config(&self) -> &ClientConfig {
        self.sessions.config()
    }

    /// Quits the cached persistent session. The next operation opens a new one.
    pub async fn close(&self) -> FtpResult<()> {
        self.sessions.close().await
    }
}

/// Logs the start of an operation and, once dropped, its duration.
pub(crate) struct Timed {
    label: String,
    started: Instant,
}

impl Timed {
    pub fn start(label: String) -> Self {
        debug!("[Start] {label}");
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        debug!("[End] {} in {:?}", self.label, self.started.elapsed());
    }
}
