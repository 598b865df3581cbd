//! In-memory FTP server used by the client tests.

use bytes::Bytes;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io::{self, Cursor},
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll},
    time::Duration,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

use super::{Connection, DirEntry, Dialer, ReadStream};
use crate::{
    error::{Error, FtpResult},
    utils,
};

#[derive(Default)]
struct State {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
    listings: HashMap<String, Vec<DirEntry>>,
    journal: Vec<String>,
    dials: usize,
    quits: usize,
    refuse_dial: bool,
    refuse_login: bool,
    strict_size: bool,
    dial_delay: Option<Duration>,
    stall: Option<CancellationToken>,
    hang_quit: bool,
    fail_finish: bool,
    broken_retrieve: bool,
    cancel_on: Option<(&'static str, CancellationToken)>,
}

fn parent_dir(path: &str) -> &str {
    match utils::parent(path) {
        "" if path.starts_with('/') => "/",
        parent => parent,
    }
}

fn missing(path: &str) -> Error {
    Error::Protocol(format!("550 {path}: No such file or directory"))
}

impl State {
    /// Cancels the token registered for `event`, if any.
    fn trigger(&self, event: &str) {
        if let Some((_, token)) = self.cancel_on.as_ref().filter(|(on, _)| *on == event) {
            token.cancel();
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn parent_exists(&self, path: &str) -> bool {
        let parent = utils::parent(path);
        parent.is_empty() || self.is_dir(parent)
    }

    fn children(&self, path: &str) -> Vec<DirEntry> {
        let name = |key: &str| key.rsplit('/').next().unwrap_or(key).to_owned();

        let files = self
            .files
            .iter()
            .filter(|(key, _)| parent_dir(key) == path)
            .map(|(key, content)| DirEntry::file(name(key), content.len() as u64));
        let dirs = self
            .dirs
            .iter()
            .filter(|key| parent_dir(key) == path)
            .map(|key| DirEntry::folder(name(key)));

        let mut entries: Vec<_> = files.chain(dirs).collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockServer {
    state: Arc<Mutex<State>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_file<C: Into<Bytes>>(self, path: &str, content: C) -> Self {
        let _ = self.state().files.insert(path.to_owned(), content.into());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        let _ = self.state().dirs.insert(path.to_owned());
        self
    }

    /// Answers LIST of `path` with `entries` as they are.
    pub fn with_listing(self, path: &str, entries: Vec<DirEntry>) -> Self {
        let _ = self.state().listings.insert(path.to_owned(), entries);
        self
    }

    pub fn set_refuse_dial(&self, refuse: bool) {
        self.state().refuse_dial = refuse;
    }

    pub fn set_refuse_login(&self, refuse: bool) {
        self.state().refuse_login = refuse;
    }

    /// SIZE on a folder fails, like on most real servers.
    pub fn set_strict_size(&self, strict: bool) {
        self.state().strict_size = strict;
    }

    pub fn set_dial_delay(&self, delay: Duration) {
        self.state().dial_delay = Some(delay);
    }

    /// Retrieved streams yield their content once, then cancel `token` and hang.
    pub fn stall_retrieve(&self, token: CancellationToken) {
        self.state().stall = Some(token);
    }

    /// QUIT never answers.
    pub fn set_hang_quit(&self, hang: bool) {
        self.state().hang_quit = hang;
    }

    /// The reply closing a retrieve is `426`.
    pub fn set_fail_finish(&self, fail: bool) {
        self.state().fail_finish = fail;
    }

    /// Retrieved streams yield their content once, then fail.
    pub fn set_broken_retrieve(&self, broken: bool) {
        self.state().broken_retrieve = broken;
    }

    /// Cancels `token` once `event` happens: `"DIAL"` or a journaled command.
    pub fn cancel_on(&self, event: &'static str, token: CancellationToken) {
        self.state().cancel_on = Some((event, token));
    }

    pub fn dials(&self) -> usize {
        self.state().dials
    }

    pub fn quits(&self) -> usize {
        self.state().quits
    }

    pub fn journal(&self) -> Vec<String> {
        self.state().journal.clone()
    }

    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.state().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }
}

#[async_trait]
impl Dialer for MockServer {
    type Connection = MockConnection;

    async fn dial(&self, addr: &str) -> FtpResult<MockConnection> {
        let delay = self.state().dial_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.refuse_dial {
            return Err(Error::Connect(format!("{addr}: connection refused")));
        }
        state.dials += 1;
        state.trigger("DIAL");

        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn login(&mut self, _username: &str, _password: &str) -> FtpResult<()> {
        if self.state().refuse_login {
            return Err(Error::Login("530 Login incorrect".to_owned()));
        }
        Ok(())
    }

    async fn quit(&mut self) -> FtpResult<()> {
        let hang = self.state().hang_quit;
        if hang {
            std::future::pending::<()>().await;
        }

        self.state().quits += 1;
        Ok(())
    }

    async fn retrieve(&mut self, path: &str) -> FtpResult<ReadStream> {
        let mut state = self.state();
        state.journal.push(format!("RETR {path}"));

        let content = state.files.get(path).cloned().ok_or_else(|| missing(path))?;
        state.trigger("RETR");

        let stream: ReadStream = match state.stall.clone() {
            Some(token) => Box::new(StallingReader {
                content: Some(content),
                token,
            }),
            None if state.broken_retrieve => Box::new(BrokenReader {
                content: Some(content),
            }),
            None => Box::new(Cursor::new(content)),
        };
        Ok(stream)
    }

    async fn finish_retrieve(&mut self, stream: ReadStream) -> FtpResult<()> {
        drop(stream);

        let mut state = self.state();
        state.journal.push("226".to_owned());
        if state.fail_finish {
            return Err(Error::Protocol(
                "426 Connection closed; transfer aborted".to_owned(),
            ));
        }
        Ok(())
    }

    async fn store(
        &mut self,
        path: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> FtpResult<u64> {
        let mut content = Vec::new();
        let _ = reader.read_to_end(&mut content).await?;

        let mut state = self.state();
        state.journal.push(format!("STOR {path}"));
        let len = content.len() as u64;
        let _ = state.files.insert(path.to_owned(), content.into());
        Ok(len)
    }

    async fn delete(&mut self, path: &str) -> FtpResult<()> {
        let mut state = self.state();
        state.journal.push(format!("DELE {path}"));
        state.files.remove(path).map(|_| ()).ok_or_else(|| missing(path))
    }

    async fn file_size(&mut self, path: &str) -> FtpResult<u64> {
        let mut state = self.state();
        state.journal.push(format!("SIZE {path}"));

        match state.files.get(path) {
            Some(content) => Ok(content.len() as u64),
            None if state.dirs.contains(path) && !state.strict_size => Ok(0),
            None => Err(missing(path)),
        }
    }

    async fn list(&mut self, path: &str) -> FtpResult<Vec<DirEntry>> {
        let mut state = self.state();
        state.journal.push(format!("LIST {path}"));

        if let Some(entries) = state.listings.get(path) {
            return Ok(entries.clone());
        }
        if state.is_dir(path) {
            return Ok(state.children(path));
        }
        Err(missing(path))
    }

    async fn make_dir(&mut self, path: &str) -> FtpResult<()> {
        let mut state = self.state();
        state.journal.push(format!("MKD {path}"));

        if state.is_dir(path) || !state.parent_exists(path) {
            return Err(Error::Protocol(format!(
                "550 {path}: Create directory operation failed"
            )));
        }
        let _ = state.dirs.insert(path.to_owned());
        Ok(())
    }

    async fn remove_dir(&mut self, path: &str) -> FtpResult<()> {
        let mut state = self.state();
        state.journal.push(format!("RMD {path}"));

        if !state.dirs.contains(path) {
            return Err(missing(path));
        }
        if !state.children(path).is_empty() {
            return Err(Error::Protocol(format!("550 {path}: Directory not empty")));
        }
        let _ = state.dirs.remove(path);
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let mut state = self.state();
        state.journal.push(format!("RNFR {from} RNTO {to}"));

        if !state.parent_exists(to) {
            return Err(missing(to));
        }
        let content = state.files.remove(from).ok_or_else(|| missing(from))?;
        let _ = state.files.insert(to.to_owned(), content);
        Ok(())
    }
}

struct StallingReader {
    content: Option<Bytes>,
    token: CancellationToken,
}

impl AsyncRead for StallingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.content.take() {
            Some(content) => {
                let len = content.len().min(buf.remaining());
                buf.put_slice(&content[..len]);
                Poll::Ready(Ok(()))
            }
            None => {
                self.token.cancel();
                Poll::Pending
            }
        }
    }
}

struct BrokenReader {
    content: Option<Bytes>,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.content.take() {
            Some(content) => {
                let len = content.len().min(buf.remaining());
                buf.put_slice(&content[..len]);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "data connection reset",
            ))),
        }
    }
}
