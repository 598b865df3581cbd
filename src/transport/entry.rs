use chrono::{DateTime, Utc};

/// Kind of a remote entry as reported by the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Folder,
    Link,
    /// Anything the transport could not classify
    Other,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: EntryType,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

impl DirEntry {
    pub fn new<N: Into<String>>(name: N, kind: EntryType, size: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            modified: None,
        }
    }

    pub fn file<N: Into<String>>(name: N, size: u64) -> Self {
        Self::new(name, EntryType::File, size)
    }

    pub fn folder<N: Into<String>>(name: N) -> Self {
        Self::new(name, EntryType::Folder, 0)
    }

    #[must_use]
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Returns the file name for the file that this entry points at.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> EntryType {
        self.kind
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryType::File
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryType::Folder
    }

    /// `.` and `..` as returned by most LIST implementations
    #[must_use]
    pub fn is_dot_folder(&self) -> bool {
        self.is_folder() && (self.name == "." || self.name == "..")
    }
}
