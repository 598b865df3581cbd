use std::{sync::Arc, time::Duration};
use tokio::{
    runtime::Handle,
    sync::{Mutex, OwnedMutexGuard},
    time::{self, Instant},
};

use super::Timed;
use crate::{
    config::ClientConfig,
    error::{Error, FtpResult},
    transport::{Connection, Dialer},
};

/// How long an expired session gets to answer QUIT when no timeout is configured.
const STALE_QUIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached session of a persistent client.
pub(crate) struct Slot<C> {
    conn: Option<C>,
    expires_at: Option<Instant>,
}

impl<C> Slot<C> {
    const fn empty() -> Self {
        Self {
            conn: None,
            expires_at: None,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.conn.is_some() && self.expires_at.is_some_and(|at| now < at)
    }
}

/// A session handed out for the duration of one operation.
///
/// Must be given back with [`Lease::release`]. An ephemeral lease that is
/// dropped instead still quits its session, on a spawned task.
pub(crate) enum Lease<C: Connection> {
    Ephemeral(Option<C>),
    /// Holds the slot lock, so persistent operations run one at a time
    Persistent(OwnedMutexGuard<Slot<C>>),
}

impl<C: Connection> Lease<C> {
    pub fn connection(&mut self) -> FtpResult<&mut C> {
        match self {
            Self::Ephemeral(conn) => conn
                .as_mut()
                .ok_or_else(|| Error::Protocol("session already released".to_owned())),
            Self::Persistent(slot) => slot
                .conn
                .as_mut()
                .ok_or_else(|| Error::Connect("persistent session unavailable".to_owned())),
        }
    }

    /// Quits an ephemeral session. A persistent session stays cached.
    pub async fn release(mut self) {
        if let Self::Ephemeral(conn) = &mut self {
            if let Some(mut conn) = conn.take() {
                if let Err(error) = conn.quit().await {
                    warn!("FTP quit failed: {error}");
                }
            }
        }
    }
}

impl<C: Connection> Drop for Lease<C> {
    fn drop(&mut self) {
        let Self::Ephemeral(conn) = self else {
            return;
        };

        if let (Some(mut conn), Ok(handle)) = (conn.take(), Handle::try_current()) {
            drop(handle.spawn(async move {
                let _ = conn.quit().await;
            }));
        }
    }
}

/// Decides whether an operation gets a fresh session or the cached one.
pub(crate) struct SessionManager<D: Dialer> {
    dialer: D,
    config: ClientConfig,
    slot: Arc<Mutex<Slot<D::Connection>>>,
}

impl<D: Dialer> SessionManager<D> {
    pub fn new(config: ClientConfig, dialer: D) -> Self {
        Self {
            dialer,
            config,
            slot: Arc::new(Mutex::new(Slot::empty())),
        }
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns a logged-in session.
    ///
    /// Non-persistent clients always dial. Persistent clients reuse the cached
    /// session until its ttl runs out and replace it afterwards.
    pub async fn acquire(&self) -> FtpResult<Lease<D::Connection>> {
        if !self.config.persistent {
            return Ok(Lease::Ephemeral(Some(self.connect().await?)));
        }

        let mut slot = Arc::clone(&self.slot).lock_owned().await;

        if !slot.is_fresh(Instant::now()) {
            if let Some(stale) = slot.conn.take() {
                debug!("FTP persistent session to {} expired", self.config.addr);
                self.quit_stale(stale).await;
            }
            slot.expires_at = None;

            let conn = self.connect().await?;
            slot.conn = Some(conn);
            slot.expires_at = Some(Instant::now() + self.config.ttl);
        }

        Ok(Lease::Persistent(slot))
    }

    /// Opens the persistent session now instead of on first use.
    pub async fn warm_up(&self) -> FtpResult<()> {
        if self.config.persistent {
            self.acquire().await?.release().await;
        }
        Ok(())
    }

    /// Quits the cached session, if any.
    pub async fn close(&self) -> FtpResult<()> {
        let mut slot = self.slot.lock().await;
        slot.expires_at = None;

        match slot.conn.take() {
            Some(mut conn) => conn.quit().await,
            None => Ok(()),
        }
    }

    /// Quits an expired session without letting a dead peer hold up the refresh.
    async fn quit_stale(&self, mut stale: D::Connection) {
        let limit = if self.config.timeout.is_zero() {
            STALE_QUIT_TIMEOUT
        } else {
            self.config.timeout
        };

        match time::timeout(limit, stale.quit()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!("FTP quit of expired session failed: {error}"),
            Err(_) => warn!("FTP quit of expired session timed out after {limit:?}"),
        }
    }

    async fn connect(&self) -> FtpResult<D::Connection> {
        let _timed = Timed::start(format!(
            "FTP connect to {} with timeout {:?}",
            self.config.addr, self.config.timeout
        ));

        let dialed = if self.config.timeout.is_zero() {
            self.dialer.dial(&self.config.addr).await
        } else {
            self.dialer
                .dial_timeout(&self.config.addr, self.config.timeout)
                .await
        };

        let mut conn = dialed.map_err(|error| match error {
            Error::Connect(_) | Error::Timeout => error,
            other => Error::Connect(other.to_string()),
        })?;

        if let Err(error) = conn
            .login(&self.config.username, &self.config.password)
            .await
        {
            if let Err(quit) = conn.quit().await {
                warn!("FTP quit after failed login failed: {quit}");
            }

            return Err(match error {
                Error::Login(_) => error,
                other => Error::Login(other.to_string()),
            });
        }

        Ok(conn)
    }
}
