//! Client-side FTP facade.
//!
//! [`Client`] wraps an FTP protocol library, reached through the
//! [`Dialer`] and [`Connection`] traits, and adds session management on
//! top of it: one session per operation, or one cached session replaced
//! every [`ClientConfig::ttl`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

/// Session-managed operations
pub mod client;
mod config;
mod error;
mod stream;
/// Seam to the protocol library
pub mod transport;
pub mod utils;

pub use client::{Client, EntryFilter};
pub use config::{ClientConfig, DEFAULT_TTL};
pub use error::{Error, FtpResult};
pub use transport::{Connection, DirEntry, Dialer, EntryType, ReadStream};
pub use tokio_util::sync::CancellationToken;
