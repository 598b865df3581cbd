use std::io;
use thiserror::Error;
use tokio::time::error::Elapsed as TimeElapsed;

pub type FtpResult<T> = Result<T, Error>;

/// Enum for client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The transport could not reach the server
    #[error("Connect: {0}")]
    Connect(String),
    /// Dialing took longer than the configured timeout
    #[error("Timeout")]
    Timeout,
    /// The server refused the credentials
    #[error("Login: {0}")]
    Login(String),
    /// A protocol call failed on an established session
    #[error("{0}")]
    Protocol(String),
    /// Any errors related to local I/O
    #[error("I/O: {0}")]
    IO(String),
    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` if the session could not be established, as opposed to
    /// a failure of the operation itself.
    #[must_use]
    pub const fn is_acquisition(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout | Self::Login(_))
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::Interrupted
                if error.get_ref().is_some_and(|e| e.is::<Cancelled>()) =>
            {
                Self::Cancelled
            }
            _ => Self::IO(error.to_string()),
        }
    }
}

impl From<TimeElapsed> for Error {
    fn from(_: TimeElapsed) -> Self {
        Self::Timeout
    }
}

/// Marker carried inside an [`io::Error`] when a wrapped stream observes cancellation.
#[derive(Debug, Error)]
#[error("transfer cancelled")]
pub(crate) struct Cancelled;

impl From<Cancelled> for io::Error {
    fn from(cancelled: Cancelled) -> Self {
        Self::new(io::ErrorKind::Interrupted, cancelled)
    }
}
