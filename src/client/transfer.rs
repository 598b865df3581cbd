use bytes::Bytes;
use std::path::Path;
use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncReadExt},
};
use tokio_util::sync::CancellationToken;

use super::{Client, Timed};
use crate::{
    error::{Error, FtpResult},
    stream::{self, CancellableReader},
    transport::{Connection, Dialer, ReadStream},
    utils,
};

fn ensure_active(cancel: &CancellationToken) -> FtpResult<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

impl<D: Dialer> Client<D> {
    /// Downloads `source` into the local file `destination`, creating or
    /// truncating it. Returns the number of bytes written.
    ///
    /// Cancellation is checked before each step and during the copy. A
    /// partially written destination is removed.
    pub async fn download<P: AsRef<Path>>(
        &self,
        cancel: &CancellationToken,
        source: &str,
        destination: P,
    ) -> FtpResult<u64> {
        let destination = destination.as_ref();
        let _timed = Timed::start(format!(
            "FTP download from {source} to {}",
            destination.display()
        ));

        ensure_active(cancel)?;
        let mut lease = self.sessions.acquire().await?;

        let result: FtpResult<_> = async {
            let conn = lease.connection()?;
            ensure_active(cancel)?;

            debug!("Downloading {source}");
            let mut remote = conn.retrieve(source).await?;
            let copied = write_local(&mut remote, cancel, destination).await;
            let finished = conn.finish_retrieve(remote).await;

            let copied = copied?;
            if let Err(error) = finished {
                discard_partial(destination).await;
                return Err(error);
            }
            debug!("Copied {}kb", copied / 1024);
            Ok(copied)
        }
        .await;

        lease.release().await;
        result
    }

    /// Reads the whole content of a remote file.
    pub async fn read(&self, path: &str) -> FtpResult<Bytes> {
        let _timed = Timed::start(format!("FTP read of {path}"));
        let mut lease = self.sessions.acquire().await?;

        let result: FtpResult<_> = async {
            let conn = lease.connection()?;
            let mut remote = conn.retrieve(path).await?;
            let mut buffer = Vec::new();

            let read = remote.read_to_end(&mut buffer).await;
            let finished = conn.finish_retrieve(remote).await;

            let len = read?;
            finished?;
            debug!("Read {len} bytes of {path}");
            Ok(Bytes::from(buffer))
        }
        .await;

        lease.release().await;
        result
    }

    /// Uploads the local file `source` to `destination`.
    pub async fn upload<P: AsRef<Path>>(
        &self,
        cancel: &CancellationToken,
        source: P,
        destination: &str,
    ) -> FtpResult<u64> {
        let source = source.as_ref();
        let _timed = Timed::start(format!(
            "FTP upload of {} to {destination}",
            source.display()
        ));

        debug!("Opening {}", source.display());
        let file = File::open(source).await?;
        self.upload_reader(cancel, file, destination).await
    }

    /// Stores everything `reader` yields at `destination`.
    ///
    /// Cancelling `cancel` interrupts the transfer even while it is in flight.
    pub async fn upload_reader<R>(
        &self,
        cancel: &CancellationToken,
        reader: R,
        destination: &str,
    ) -> FtpResult<u64>
    where
        R: AsyncRead + Send + Unpin,
    {
        ensure_active(cancel)?;
        let mut lease = self.sessions.acquire().await?;

        let result: FtpResult<_> = async {
            let conn = lease.connection()?;
            ensure_active(cancel)?;

            debug!("Uploading to {destination}");
            let mut reader = CancellableReader::new(reader, cancel.clone());
            match conn.store(destination, &mut reader).await {
                Err(_) if cancel.is_cancelled() => Err(Error::Cancelled),
                result => result,
            }
        }
        .await;

        lease.release().await;
        result
    }

    /// Stores `reader` at `path`. An empty path is a successful no-op.
    pub async fn create_file<R>(&self, path: &str, mut reader: R) -> FtpResult<()>
    where
        R: AsyncRead + Send + Unpin,
    {
        if path.is_empty() {
            return Ok(());
        }

        let _timed = Timed::start(format!("FTP create file {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> =
            async { lease.connection()?.store(path, &mut reader).await }.await;
        lease.release().await;

        result.map(|_| ())
    }

    pub async fn remove(&self, path: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP remove of {path}"));
        let mut lease = self.sessions.acquire().await?;

        debug!("Removing {path}");
        let result: FtpResult<_> = async { lease.connection()?.delete(path).await }.await;
        lease.release().await;
        result
    }

    pub async fn file_size(&self, path: &str) -> FtpResult<u64> {
        let _timed = Timed::start(format!("FTP file size of {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async { lease.connection()?.file_size(path).await }.await;
        lease.release().await;
        result
    }

    /// Checks a file exists at the specified path.
    ///
    /// A failing size query means the file does not exist and yields
    /// `Ok(false)`. Only a failure to get a session is returned as an error.
    pub async fn exists(&self, path: &str) -> FtpResult<bool> {
        let _timed = Timed::start(format!("FTP file exists of {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async { Ok(probe(lease.connection()?, path).await) }.await;
        lease.release().await;
        result
    }

    /// Renames `source` to `destination`, creating the missing folders of
    /// `destination` first.
    pub async fn rename(&self, source: &str, destination: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP rename of {source} to {destination}"));
        let mut lease = self.sessions.acquire().await?;

        let result: FtpResult<_> = async {
            let conn = lease.connection()?;
            ensure_folders(conn, utils::parent(destination)).await;
            conn.rename(source, destination).await
        }
        .await;

        lease.release().await;
        result
    }

    /// Creates `folder` and every missing folder above it.
    pub async fn create_dir_all(&self, folder: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP create folders {folder}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async {
            ensure_folders(lease.connection()?, folder).await;
            Ok(())
        }
        .await;
        lease.release().await;
        result
    }

    pub async fn create_dir(&self, path: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP create folder {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async { lease.connection()?.make_dir(path).await }.await;
        lease.release().await;
        result
    }

    pub async fn remove_dir(&self, path: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP remove folder {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async { lease.connection()?.remove_dir(path).await }.await;
        lease.release().await;
        result
    }

    /// Removes `path` together with all its content.
    pub async fn remove_dir_recursive(&self, path: &str) -> FtpResult<()> {
        let _timed = Timed::start(format!("FTP remove folder tree {path}"));
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> =
            async { lease.connection()?.remove_dir_recursive(path).await }.await;
        lease.release().await;
        result
    }
}

async fn write_local(
    remote: &mut ReadStream,
    cancel: &CancellationToken,
    destination: &Path,
) -> FtpResult<u64> {
    ensure_active(cancel)?;

    debug!("Creating {}", destination.display());
    let mut file = File::create(destination).await?;

    debug!("Copying downloaded content to {}", destination.display());
    let copied = stream::copy(remote, &mut file, cancel).await;

    if copied.is_err() {
        drop(file);
        discard_partial(destination).await;
    }

    copied
}

async fn discard_partial(destination: &Path) {
    if let Err(error) = fs::remove_file(destination).await {
        warn!("Removing partial {} failed: {error}", destination.display());
    }
}

async fn probe<C: Connection>(conn: &mut C, path: &str) -> bool {
    conn.file_size(path).await.is_ok()
}

/// Creates the missing folders of `folder`, shallowest first.
///
/// Existence is probed from the deepest folder upwards and stops at the first
/// one found. Creation errors are ignored: servers that refuse a size query
/// on folders report existing ones as missing.
async fn ensure_folders<C: Connection>(conn: &mut C, folder: &str) {
    let mut missing = Vec::new();
    for ancestor in utils::ancestors(folder) {
        if probe(conn, ancestor).await {
            break;
        }
        missing.push(ancestor);
    }

    for folder in missing.into_iter().rev() {
        if let Err(error) = conn.make_dir(folder).await {
            debug!("Creating {folder} skipped: {error}");
        }
    }
}
