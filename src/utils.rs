//! Helpers over slash-delimited remote paths and file names.

/// Strips the last `.`-delimited segment of a file name.
///
/// Names without a `.` are returned unchanged.
#[must_use]
pub fn file_name_without_extension(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Returns the lowercase text after the last `.`, or the whole name if there is none.
#[must_use]
pub fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map_or(name, |(_, ext)| ext)
        .to_lowercase()
}

/// Everything before the last `/`, or an empty string for a bare name.
#[must_use]
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

pub(crate) fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_owned()
    } else if folder.ends_with('/') {
        format!("{folder}{name}")
    } else {
        format!("{folder}/{name}")
    }
}

/// Folders of `folder` that must exist, deepest first, stopping at the root.
pub(crate) fn ancestors(folder: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(folder), |current| Some(parent(*current)))
        .take_while(|current| !current.is_empty() && *current != "/")
}
