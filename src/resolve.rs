//! Pick a file path for an entity without clobbering files owned by others.
//!
//! A path is usable when nothing exists there yet, or when the file there
//! carries this entity's footer (same id and same title, as the footer
//! stores them), so re-syncing overwrites in place. Anything else is a
//! collision and the stem gets a `_<n>` suffix, counting up from 1.

use crate::error::KeepError;
use crate::footer::{read_identity, stored_identity};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Highest suffix tried before giving up.
pub const MAX_SUFFIX: u32 = 10_000;

/// Resolve `candidate` for the entity `(id, title)`.
pub fn resolve_path(candidate: &Path, id: &str, title: &str) -> Result<PathBuf> {
    resolve_path_bounded(candidate, id, title, MAX_SUFFIX)
}

/// Like [`resolve_path`], trying suffixes `_1` to `_<max>` only.
pub fn resolve_path_bounded(
    candidate: &Path,
    id: &str,
    title: &str,
    max: u32,
) -> Result<PathBuf> {
    if is_free_for(candidate, id, title)? {
        return Ok(candidate.to_path_buf());
    }

    let file_name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_extension(&file_name);
    let base = strip_numeric_suffix(stem);

    for n in 1..=max {
        let path = candidate.with_file_name(format!("{base}_{n}{ext}"));
        if is_free_for(&path, id, title)? {
            debug!(
                "{} taken by another entity, using {}",
                candidate.display(),
                path.display()
            );
            return Ok(path);
        }
    }

    Err(KeepError::SuffixesExhausted {
        path: candidate.to_path_buf(),
        max,
    }
    .into())
}

fn is_free_for(path: &Path, id: &str, title: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let found = read_identity(path)?;
    Ok(!found.is_unowned() && found == stored_identity(id, title))
}

/// Split `name.ext` into (`name`, `.ext`). Dot files and names without a dot
/// have no extension.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// Drop a trailing `_<digits>` group, if any.
fn strip_numeric_suffix(stem: &str) -> &str {
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return stem;
    }
    let head = &stem[..stem.len() - digits];
    match head.strip_suffix('_') {
        Some(base) if !base.is_empty() => base,
        _ => stem,
    }
}
