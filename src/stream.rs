use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::error::{Cancelled, Error, FtpResult};

const COPY_BUF_LEN: usize = 32 * 1024;

/// Reader that fails with [`Error::Cancelled`] as soon as its token is cancelled,
/// even while the inner read is pending.
pub(crate) struct CancellableReader<R> {
    inner: R,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<R> CancellableReader<R> {
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self {
            inner,
            cancelled: Box::pin(token.clone().cancelled_owned()),
            token,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CancellableReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.token.is_cancelled() || this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(Cancelled.into()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

/// Copies `reader` into `writer` until EOF, racing every read against `token`.
pub(crate) async fn copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    token: &CancellationToken,
) -> FtpResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0; COPY_BUF_LEN];
    let mut copied = 0;

    loop {
        let len = tokio::select! {
            biased;
            () = token.cancelled() => return Err(Error::Cancelled),
            len = reader.read(&mut buf) => len?,
        };

        if len == 0 {
            break;
        }

        writer.write_all(&buf[..len]).await?;
        copied += len as u64;
    }

    writer.flush().await?;
    Ok(copied)
}
