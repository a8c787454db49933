//! Error taxonomy for conditions callers may want to match on.
//!
//! Operations return `anyhow::Result`; these variants travel inside the
//! `anyhow::Error` and can be recovered with `downcast_ref::<KeepError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeepError {
    /// Credentials or cached token rejected by the auth endpoint.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A footer references an id the remote side does not know.
    #[error("remote entity not found: {id}")]
    EntityNotFound { id: String },

    /// A `.todo` footer points at a plain note.
    #[error("remote entity {id} is not a list")]
    NotAList { id: String },

    #[error("no free file name for {} after {max} suffixes", .path.display())]
    SuffixesExhausted { path: PathBuf, max: u32 },

    #[error("Keep API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid config: {0}")]
    Config(String),
}
