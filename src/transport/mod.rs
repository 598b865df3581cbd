//! Seam to the FTP protocol library.
//!
//! The facade never speaks the wire protocol itself. A [`Dialer`] opens a
//! [`Connection`], and every operation of [`Client`](crate::Client) maps onto
//! one or a few calls of that connection. Both traits are `async_trait`.

mod entry;
#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;
use tokio::{io::AsyncRead, time};

use crate::{error::FtpResult, utils};

pub use entry::{DirEntry, EntryType};

/// Remote read stream returned by [`Connection::retrieve`].
pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Establishes sessions with the remote server.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Connection: Connection;

    /// Opens the control connection without a time limit.
    async fn dial(&self, addr: &str) -> FtpResult<Self::Connection>;

    /// Opens the control connection, giving up after `timeout`.
    async fn dial_timeout(&self, addr: &str, timeout: Duration) -> FtpResult<Self::Connection> {
        time::timeout(timeout, self.dial(addr)).await?
    }
}

/// An open control connection. Not yet logged in when returned by the [`Dialer`].
#[async_trait]
pub trait Connection: Send + 'static {
    async fn login(&mut self, username: &str, password: &str) -> FtpResult<()>;

    /// Logs out and disconnects.
    async fn quit(&mut self) -> FtpResult<()>;

    /// Opens a read stream over the content of `path` (RETR).
    async fn retrieve(&mut self, path: &str) -> FtpResult<ReadStream>;

    /// Called once the stream returned by [`Connection::retrieve`] is no longer needed.
    async fn finish_retrieve(&mut self, stream: ReadStream) -> FtpResult<()> {
        drop(stream);
        Ok(())
    }

    /// Stores everything `reader` yields at `path` (STOR) and returns the byte count.
    async fn store(
        &mut self,
        path: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> FtpResult<u64>;

    async fn delete(&mut self, path: &str) -> FtpResult<()>;

    async fn file_size(&mut self, path: &str) -> FtpResult<u64>;

    async fn list(&mut self, path: &str) -> FtpResult<Vec<DirEntry>>;

    async fn make_dir(&mut self, path: &str) -> FtpResult<()>;

    async fn remove_dir(&mut self, path: &str) -> FtpResult<()>;

    /// Removes `path` and everything below it.
    ///
    /// The default walks the tree with [`Connection::list`], deleting files
    /// and descending into folders before removing the folder itself.
    async fn remove_dir_recursive(&mut self, path: &str) -> FtpResult<()> {
        for entry in self.list(path).await? {
            if entry.is_dot_folder() {
                continue;
            }

            let child = utils::join(path, entry.name());
            if entry.is_folder() {
                self.remove_dir_recursive(&child).await?;
            } else {
                self.delete(&child).await?;
            }
        }

        self.remove_dir(path).await
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;
}
