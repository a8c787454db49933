//! Download - write every remote note and list into the notes directory.
//!
//! Each file is fully rewritten from the remote state, so local edits to a
//! list must be uploaded first or they are lost. The footer (identity) is
//! always rewritten to match the entity.

use crate::checklist::render_line;
use crate::footer::{encode_footer, trim_title_to_filename};
use crate::remote::{Content, EntityKind, NoteService, RemoteEntity};
use crate::resolve::resolve_path;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NOTE_FILE_EXTENSION: &str = "txt";
pub const LIST_FILE_EXTENSION: &str = "todo";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub notes: usize,
    pub lists: usize,
}

impl DownloadReport {
    pub fn summary(&self) -> String {
        format!("{} notes, {} lists", self.notes, self.lists)
    }
}

/// Path an entity would get if nothing collided with it.
pub fn candidate_path(notes_root: &Path, entity: &RemoteEntity) -> PathBuf {
    let stem = if entity.title.is_empty() {
        entity.id.clone()
    } else {
        trim_title_to_filename(&entity.title)
    };
    let ext = match entity.kind() {
        EntityKind::List => LIST_FILE_EXTENSION,
        EntityKind::Note => NOTE_FILE_EXTENSION,
    };
    notes_root.join(format!("{stem}.{ext}"))
}

/// Full file content for an entity, footer included.
pub fn render_entity(entity: &RemoteEntity) -> String {
    let mut out = String::new();

    match &entity.content {
        Content::List(_) => {
            if !entity.title.is_empty() {
                out.push_str(&entity.title);
                out.push_str(":\n");
            }
            for item in entity.unchecked() {
                out.push_str(&render_line(&item.text, false));
            }
            for item in entity.checked() {
                out.push_str(&render_line(&item.text, true));
            }
        }
        Content::Note(text) => out.push_str(text),
    }

    out.push_str(&encode_footer(&entity.title, &entity.id));
    out
}

/// Write one entity, returning the path it landed on.
pub fn save_entity(notes_root: &Path, entity: &RemoteEntity) -> Result<PathBuf> {
    let candidate = candidate_path(notes_root, entity);
    let path = resolve_path(&candidate, &entity.id, &entity.title)?;

    fs::write(&path, render_entity(entity))
        .with_context(|| format!("Cannot write {}", path.display()))?;

    debug!("Saved {} -> {}", entity.id, path.display());
    Ok(path)
}

/// Save every remote entity under `notes_root`.
pub fn download<S: NoteService + ?Sized>(
    service: &S,
    notes_root: &Path,
) -> Result<DownloadReport> {
    fs::create_dir_all(notes_root)
        .with_context(|| format!("Cannot create {}", notes_root.display()))?;

    let entities = service.all()?;
    let mut report = DownloadReport::default();

    let bar = ProgressBar::new(entities.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for entity in &entities {
        bar.set_message(entity.title.clone());
        save_entity(notes_root, entity)?;
        match entity.kind() {
            EntityKind::List => report.lists += 1,
            EntityKind::Note => report.notes += 1,
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    debug!("Downloaded {}", report.summary());
    Ok(report)
}
