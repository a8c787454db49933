//! Upload - push local checklist edits back to the remote lists.
//!
//! Only `.todo` files are considered. Each checklist line is joined to the
//! remote items by exact text (trimmed, case-sensitive):
//! - a match with a different check state is toggled to the local state
//! - no match means a new item, added at the top of the list
//!
//! Remote items are never deleted or renamed. An edited line therefore shows
//! up as a new item next to the old one, since text is the only join key.

use crate::checklist::{parse_line, render_line};
use crate::download::LIST_FILE_EXTENSION;
use crate::error::KeepError;
use crate::footer::read_identity;
use crate::remote::{EntityKind, NoteService, Placement, RemoteEntity};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One change to apply to a remote list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetChecked {
        item_id: String,
        text: String,
        checked: bool,
    },
    AddItem {
        text: String,
        checked: bool,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub files: usize,
    pub skipped: usize,
    pub updated: usize,
    pub added: usize,
}

impl UploadReport {
    pub fn summary(&self) -> String {
        format!(
            "{} files ({} skipped), {} updated, {} added",
            self.files, self.skipped, self.updated, self.added
        )
    }
}

/// Where a working item came from.
#[derive(Clone)]
enum Slot {
    Remote { id: String, original: bool },
    Pending(usize),
}

struct WorkingItem {
    text: String,
    checked: bool,
    slot: Slot,
}

/// Work out the mutations that bring `list` in line with local `lines`.
///
/// Lines are applied in order against a working copy, so a later line sees
/// the effect of earlier ones: a duplicated new line is added once, and a
/// line toggled back to the remote state cancels out.
pub fn plan_upload<I, S>(list: &RemoteEntity, lines: I) -> Vec<Mutation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut working: Vec<WorkingItem> = list
        .items()
        .iter()
        .map(|item| WorkingItem {
            text: item.text.trim().to_string(),
            checked: item.checked,
            slot: Slot::Remote {
                id: item.id.clone(),
                original: item.checked,
            },
        })
        .collect();
    let mut mutations: Vec<Mutation> = Vec::new();

    for line in lines {
        let Some(parsed) = parse_line(line.as_ref()) else {
            continue;
        };

        let Some(item) = working.iter_mut().find(|i| i.text == parsed.text) else {
            mutations.push(Mutation::AddItem {
                text: parsed.text.clone(),
                checked: parsed.checked,
            });
            working.insert(
                0,
                WorkingItem {
                    text: parsed.text,
                    checked: parsed.checked,
                    slot: Slot::Pending(mutations.len() - 1),
                },
            );
            continue;
        };

        if item.checked == parsed.checked {
            continue;
        }
        item.checked = parsed.checked;

        match item.slot.clone() {
            Slot::Pending(idx) => {
                if let Mutation::AddItem { checked, .. } = &mut mutations[idx] {
                    *checked = parsed.checked;
                }
            }
            Slot::Remote { id, original } => {
                let existing = mutations.iter().position(
                    |m| matches!(m, Mutation::SetChecked { item_id, .. } if *item_id == id),
                );
                match existing {
                    Some(pos) if parsed.checked == original => {
                        mutations.remove(pos);
                        reindex_pending(&mut working, pos);
                    }
                    Some(pos) => {
                        if let Mutation::SetChecked { checked, .. } = &mut mutations[pos] {
                            *checked = parsed.checked;
                        }
                    }
                    None => mutations.push(Mutation::SetChecked {
                        item_id: id,
                        text: parsed.text,
                        checked: parsed.checked,
                    }),
                }
            }
        }
    }

    mutations
}

/// Shift pending indexes after the mutation at `removed` was dropped.
fn reindex_pending(working: &mut [WorkingItem], removed: usize) {
    for item in working {
        if let Slot::Pending(idx) = &mut item.slot {
            if *idx > removed {
                *idx -= 1;
            }
        }
    }
}

/// `.todo` files directly under `notes_root`, in path order.
pub fn list_files(notes_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(notes_root)
        .with_context(|| format!("Cannot read {}", notes_root.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == LIST_FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Cannot read {}", path.display()))
}

/// Upload one list file. Returns `None` when the file has no footer.
pub fn upload_file<S: NoteService + ?Sized>(
    service: &mut S,
    path: &Path,
) -> Result<Option<Vec<Mutation>>> {
    let identity = read_identity(path)?;
    if identity.id.is_empty() {
        warn!("{} has no identity footer, skipping", path.display());
        return Ok(None);
    }

    let list = service.get(&identity.id)?;
    if list.kind() != EntityKind::List {
        bail!(KeepError::NotAList { id: identity.id });
    }

    let mutations = plan_upload(&list, read_lines(path)?);
    debug!("{}: {} mutations", path.display(), mutations.len());

    for mutation in &mutations {
        match mutation {
            Mutation::SetChecked {
                item_id,
                text,
                checked,
            } => {
                println!(
                    "{} update checkmark found at: {}\n{}",
                    "[sync]:".cyan(),
                    path.display(),
                    render_line(text, *checked).trim()
                );
                service.set_checked(&list.id, item_id, *checked)?;
            }
            Mutation::AddItem { text, checked } => {
                println!(
                    "{} adding item found at: {}\n{}",
                    "[sync]:".green(),
                    path.display(),
                    render_line(text, *checked).trim()
                );
                service.add_item(&list.id, text, *checked, Placement::Top)?;
            }
        }
    }

    service.sync()?;
    Ok(Some(mutations))
}

/// Upload every list file under `notes_root`, one remote sync per file.
pub fn upload<S: NoteService + ?Sized>(
    service: &mut S,
    notes_root: &Path,
) -> Result<UploadReport> {
    let mut report = UploadReport::default();
    if !notes_root.is_dir() {
        warn!("{} does not exist, nothing to upload", notes_root.display());
        return Ok(report);
    }

    for path in list_files(notes_root)? {
        report.files += 1;
        let Some(mutations) = upload_file(service, &path)? else {
            report.skipped += 1;
            continue;
        };
        for mutation in &mutations {
            match mutation {
                Mutation::SetChecked { .. } => report.updated += 1,
                Mutation::AddItem { .. } => report.added += 1,
            }
        }
    }

    debug!("Uploaded {}", report.summary());
    Ok(report)
}
