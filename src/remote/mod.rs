//! Remote side - data model and the `NoteService` seam.
//!
//! Reconcilers only talk to `NoteService`; `KeepClient` is the HTTPS
//! implementation, tests plug in an in-memory one.

pub mod auth;
pub mod keep;
pub mod nodes;

pub use keep::KeepClient;

use anyhow::Result;

/// Kind of a top-level remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Note,
    List,
}

/// One checklist entry of a remote list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub id: String,
    pub text: String,
    pub checked: bool,
}

impl ListItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>, checked: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            checked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text body.
    Note(String),
    /// Items in display order.
    List(Vec<ListItem>),
}

/// A note or list as the remote service presents it. Identity is `id`;
/// `title` is mutable, may be empty and is not unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntity {
    pub id: String,
    pub title: String,
    pub content: Content,
}

impl RemoteEntity {
    pub fn note(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: Content::Note(text.into()),
        }
    }

    pub fn list(id: impl Into<String>, title: impl Into<String>, items: Vec<ListItem>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: Content::List(items),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.content {
            Content::Note(_) => EntityKind::Note,
            Content::List(_) => EntityKind::List,
        }
    }

    pub fn items(&self) -> &[ListItem] {
        match &self.content {
            Content::List(items) => items,
            Content::Note(_) => &[],
        }
    }

    pub fn unchecked(&self) -> impl Iterator<Item = &ListItem> {
        self.items().iter().filter(|i| !i.checked)
    }

    pub fn checked(&self) -> impl Iterator<Item = &ListItem> {
        self.items().iter().filter(|i| i.checked)
    }
}

/// Where a new list item goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Top,
    Bottom,
}

/// Operations the reconcilers need from a note service.
///
/// Mutations are buffered until `sync` flushes them; implementations are
/// best-effort, not transactional.
pub trait NoteService {
    /// Log in with account credentials, returning a long-lived token.
    fn login(&mut self, username: &str, password: &str) -> Result<String>;

    /// Restore a session from a token returned by `login`.
    fn resume(&mut self, username: &str, token: &str) -> Result<()>;

    /// Every note and list known to the service.
    fn all(&self) -> Result<Vec<RemoteEntity>>;

    /// Fetch one entity; fails with `KeepError::EntityNotFound` when absent.
    fn get(&self, id: &str) -> Result<RemoteEntity>;

    fn set_checked(&mut self, list_id: &str, item_id: &str, checked: bool) -> Result<()>;

    fn add_item(
        &mut self,
        list_id: &str,
        text: &str,
        checked: bool,
        placement: Placement,
    ) -> Result<()>;

    /// Push pending mutations to the server.
    fn sync(&mut self) -> Result<()>;
}
