//! keepsync - sync Google Keep notes and checklists with plain-text files.
//!
//! Every remote note becomes `<title>.txt`, every list `<title>.todo`, each
//! ending in a three line footer that records the remote id and title:
//! - download: rewrite local files from the remote state
//! - upload: push check-state changes and new items from `.todo` files
//!
//! The footer, not the file name, is what ties a file to its remote entity.

pub mod checklist;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod footer;
pub mod remote;
pub mod resolve;
pub mod session;
pub mod upload;

// Re-export main types
pub use config::Config;
pub use credentials::{KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use download::{download, DownloadReport};
pub use error::KeepError;
pub use remote::{KeepClient, NoteService, RemoteEntity};
pub use session::open_session;
pub use upload::{upload, UploadReport};
