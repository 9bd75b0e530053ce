//! Storage key validation.
//!
//! Keys handed to a backend are relative paths. Before a backend touches
//! anything, the key is normalized component-by-component so that it can never
//! resolve outside of the storage root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a storage key.
///
/// `.` components and repeated or trailing separators are dropped, `..` pops
/// the previous component, and anything that would climb above the root (or
/// that normalizes to nothing) is rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath). Null bytes are
/// rejected explicitly since they truncate paths in C-based syscalls.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use libris_storage::validate_path;
///
/// assert!(validate_path("2024/05/17/book.epub").is_ok());
/// assert!(validate_path("covers/book.jpg").is_ok());
/// assert!(validate_path("../covers/book.jpg").is_err());
/// assert!(validate_path("covers/../../book.jpg").is_err());
/// assert_eq!(
///     validate_path("/covers//./book.jpg").unwrap(),
///     Path::new("covers/book.jpg"),
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(segment) => components.push(segment),
            // A leading slash is tolerated: keys are always relative to the root.
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}
