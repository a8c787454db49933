//! In-memory note service shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use keepsync::remote::{Content, ListItem, NoteService, Placement, RemoteEntity};
use keepsync::KeepError;

/// A change the fake has accepted, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Checked {
        list_id: String,
        item_id: String,
        checked: bool,
    },
    Added {
        list_id: String,
        text: String,
        checked: bool,
    },
}

#[derive(Debug, Default)]
pub struct FakeKeep {
    pub entities: Vec<RemoteEntity>,
    pub password: String,
    pub valid_tokens: Vec<String>,
    pub resume_transport_error: bool,
    pub logins: usize,
    pub resumes: usize,
    pub syncs: usize,
    pub pending: Vec<Change>,
    pub committed: Vec<Change>,
    pub next_item: usize,
}

impl FakeKeep {
    pub fn with_entities(entities: Vec<RemoteEntity>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    pub fn entity(&self, id: &str) -> &RemoteEntity {
        self.entities.iter().find(|e| e.id == id).unwrap()
    }

    fn list_items(&mut self, list_id: &str) -> Result<&mut Vec<ListItem>> {
        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id == list_id)
            .ok_or_else(|| KeepError::EntityNotFound {
                id: list_id.to_string(),
            })?;
        match &mut entity.content {
            Content::List(items) => Ok(items),
            Content::Note(_) => Err(KeepError::NotAList {
                id: list_id.to_string(),
            }
            .into()),
        }
    }
}

impl NoteService for FakeKeep {
    fn login(&mut self, _username: &str, password: &str) -> Result<String> {
        if password != self.password {
            return Err(KeepError::Auth("BadAuthentication".to_string()).into());
        }
        self.logins += 1;
        let token = format!("master-{}", self.logins);
        self.valid_tokens.push(token.clone());
        Ok(token)
    }

    fn resume(&mut self, _username: &str, token: &str) -> Result<()> {
        self.resumes += 1;
        if self.resume_transport_error {
            return Err(anyhow!("connection reset by peer"));
        }
        if !self.valid_tokens.iter().any(|t| t == token) {
            return Err(KeepError::Auth("BadAuthentication".to_string()).into());
        }
        Ok(())
    }

    fn all(&self) -> Result<Vec<RemoteEntity>> {
        Ok(self.entities.clone())
    }

    fn get(&self, id: &str) -> Result<RemoteEntity> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| KeepError::EntityNotFound { id: id.to_string() }.into())
    }

    fn set_checked(&mut self, list_id: &str, item_id: &str, checked: bool) -> Result<()> {
        let item = self
            .list_items(list_id)?
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| anyhow!("no item {item_id}"))?;
        item.checked = checked;
        self.pending.push(Change::Checked {
            list_id: list_id.to_string(),
            item_id: item_id.to_string(),
            checked,
        });
        Ok(())
    }

    fn add_item(
        &mut self,
        list_id: &str,
        text: &str,
        checked: bool,
        placement: Placement,
    ) -> Result<()> {
        self.next_item += 1;
        let item = ListItem::new(format!("new-{}", self.next_item), text, checked);
        let items = self.list_items(list_id)?;
        match placement {
            Placement::Top => items.insert(0, item),
            Placement::Bottom => items.push(item),
        }
        self.pending.push(Change::Added {
            list_id: list_id.to_string(),
            text: text.to_string(),
            checked,
        });
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.syncs += 1;
        self.committed.append(&mut self.pending);
        Ok(())
    }
}

pub fn groceries() -> RemoteEntity {
    RemoteEntity::list(
        "list.groceries",
        "Groceries",
        vec![
            ListItem::new("i-milk", "milk", false),
            ListItem::new("i-bread", "bread", true),
            ListItem::new("i-eggs", "eggs", false),
        ],
    )
}
