//! Identity footer - the three trailing lines that tie a local file to a
//! remote entity.
//!
//! ```text
//! ---
//! id:    1712345678901.4f2a9c0b7d1e3a55
//! title: Groceries
//! ```
//!
//! File names are only a convenience; the footer is the authoritative link.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const SEPARATOR: &str = "---";

/// Width of the `id:    ` / `title: ` labels.
const LABEL_WIDTH: usize = 7;

/// Identity decoded from a footer. Both fields are empty for unowned files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub title: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// True when no footer was found.
    pub fn is_unowned(&self) -> bool {
        self.id.is_empty() && self.title.is_empty()
    }
}

/// Build the footer block appended verbatim after a file's body.
///
/// Line breaks in either field become spaces so the block stays exactly
/// three lines long.
pub fn encode_footer(title: &str, id: &str) -> String {
    format!(
        "\n\n{SEPARATOR}\nid:    {}\ntitle: {}",
        single_line(id),
        single_line(title)
    )
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// The identity a footer for `(id, title)` reads back as: line breaks turned
/// into spaces and trailing whitespace gone.
pub fn stored_identity(id: &str, title: &str) -> Identity {
    decode_content(&encode_footer(title, id))
}

/// Decode the identity from the last three lines of a file.
///
/// Anything that does not start with the `---` separator yields an unowned
/// identity, as does input with fewer than three lines.
pub fn decode_footer<S: AsRef<str>>(lines: &[S]) -> Identity {
    if lines.len() < 3 {
        return Identity::default();
    }
    let tail = &lines[lines.len() - 3..];

    if tail[0].as_ref().trim() != SEPARATOR {
        return Identity::default();
    }

    Identity {
        id: strip_label(tail[1].as_ref()),
        title: strip_label(tail[2].as_ref()),
    }
}

fn strip_label(line: &str) -> String {
    line.trim().chars().skip(LABEL_WIDTH).collect()
}

/// Decode the footer of file content held in memory.
pub fn decode_content(content: &str) -> Identity {
    let lines: Vec<&str> = content.lines().collect();
    decode_footer(&lines)
}

/// Read a file and decode its footer. Non UTF-8 bytes are replaced rather
/// than failing, so binary junk just reads as unowned.
pub fn read_identity(path: &Path) -> Result<Identity> {
    let bytes =
        fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    Ok(decode_content(&String::from_utf8_lossy(&bytes)))
}

/// Turn a title into a file stem: `/ ? :` and spaces become `_`, then
/// lowercase. Distinct titles may collapse to the same stem.
pub fn trim_title_to_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '?' | ':' | ' ' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}
