use regex::Regex;
use std::collections::HashSet;

use super::{Client, Timed};
use crate::{
    error::FtpResult,
    transport::{Connection, DirEntry, Dialer, EntryType},
    utils,
};

#[derive(Debug, Clone)]
enum Pattern {
    Any,
    Regex(Regex),
    /// The pattern did not compile, nothing matches
    Invalid,
}

/// Selects listing entries by extension and by name pattern.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    extensions: HashSet<String>,
    pattern: Pattern,
}

impl EntryFilter {
    /// Builds a filter from allowed extensions and a regular expression.
    ///
    /// An empty extension set or an empty pattern disables that part of the
    /// filter. A pattern that fails to compile excludes every entry.
    pub fn new<I, S>(extensions: I, pattern: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = if pattern.is_empty() {
            Pattern::Any
        } else {
            match Regex::new(pattern) {
                Ok(regex) => Pattern::Regex(regex),
                Err(error) => {
                    warn!("[FTP] invalid listing pattern {pattern:?}: {error}");
                    Pattern::Invalid
                }
            }
        };

        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_lowercase())
                .collect(),
            pattern,
        }
    }

    /// Files and folders only, without `.` and `..`.
    #[must_use]
    pub fn matches(&self, entry: &DirEntry) -> bool {
        if !matches!(entry.kind(), EntryType::File | EntryType::Folder) || entry.is_dot_folder() {
            return false;
        }

        if !self.extensions.is_empty()
            && !self.extensions.contains(&utils::extension(entry.name()))
        {
            return false;
        }

        match &self.pattern {
            Pattern::Any => true,
            Pattern::Regex(regex) => regex.is_match(entry.name()),
            Pattern::Invalid => false,
        }
    }
}

impl<D: Dialer> Client<D> {
    /// Lists `folder`, keeping the entries accepted by an [`EntryFilter`]
    /// built from `extensions` and `pattern`, in listing order.
    ///
    /// Best effort: a failure to connect or to list is logged and yields an
    /// empty list. Use [`Client::try_list`] to tell the two apart.
    pub async fn list<I, S>(&self, folder: &str, extensions: I, pattern: &str) -> Vec<DirEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.try_list(folder, extensions, pattern)
            .await
            .unwrap_or_else(|error| {
                error!("[FTP] error : {error}");
                Vec::new()
            })
    }

    pub async fn try_list<I, S>(
        &self,
        folder: &str,
        extensions: I,
        pattern: &str,
    ) -> FtpResult<Vec<DirEntry>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _timed = Timed::start(format!("FTP file list of {folder}"));
        let filter = EntryFilter::new(extensions, pattern);

        Ok(self
            .fetch(folder)
            .await?
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect())
    }

    /// Lists the sub folders of `folder`, without `.` and `..`.
    ///
    /// Same best-effort contract as [`Client::list`].
    pub async fn list_folders(&self, folder: &str) -> Vec<DirEntry> {
        self.try_list_folders(folder).await.unwrap_or_else(|error| {
            error!("[FTP] error : {error}");
            Vec::new()
        })
    }

    pub async fn try_list_folders(&self, folder: &str) -> FtpResult<Vec<DirEntry>> {
        let _timed = Timed::start(format!("FTP list folder of {folder}"));

        Ok(self
            .fetch(folder)
            .await?
            .into_iter()
            .filter(|entry| entry.is_folder() && !entry.is_dot_folder())
            .collect())
    }

    async fn fetch(&self, folder: &str) -> FtpResult<Vec<DirEntry>> {
        let mut lease = self.sessions.acquire().await?;
        let result: FtpResult<_> = async { lease.connection()?.list(folder).await }.await;
        lease.release().await;
        result
    }
}
