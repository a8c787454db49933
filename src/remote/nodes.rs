//! Keep wire nodes and the local mirror built from `changes` responses.
//!
//! Every note, list and list item is a flat node linked to its parent by
//! `parentId`. Fields this crate does not interpret are kept in `extra` so
//! a node sent back to the server carries everything it came with.

use crate::error::KeepError;
use crate::remote::{ListItem, Placement, RemoteEntity};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Parent id of top-level notes and lists.
pub const ROOT_ID: &str = "root";

/// Keep's "unset" timestamp.
pub const EPOCH: &str = "1970-01-01T00:00:00.000Z";

/// Gap left between sort values of neighbouring items.
const SORT_DELTA: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Note,
    List,
    ListItem,
    Blob,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Timestamps {
    fn fresh(now: &str) -> Self {
        Self {
            created: Some(now.to_string()),
            updated: Some(now.to_string()),
            trashed: Some(EPOCH.to_string()),
            deleted: Some(EPOCH.to_string()),
            extra: Map::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        is_set(self.deleted.as_deref())
    }
}

fn is_set(timestamp: Option<&str>) -> bool {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .is_some_and(|t| t.timestamp_millis() > 0)
}

/// Format a time the way Keep expects (`2024-05-01T10:00:00.000Z`).
pub fn keep_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// New client-side node id: millisecond timestamp and 64 random bits, in hex.
pub fn new_node_id() -> String {
    format!(
        "{:x}.{:016x}",
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_server_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, with = "sort_value")]
    pub sort_value: i64,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    fn is_live(&self) -> bool {
        !self.timestamps.is_deleted()
    }
}

/// `sortValue` travels as a decimal string but older payloads use numbers.
mod sort_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Local mirror of the server's node tree plus the ids of nodes changed
/// since the last successful sync.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: HashMap<String, Node>,
    dirty: Vec<String>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply nodes returned by the server, replacing local copies.
    pub fn merge(&mut self, incoming: Vec<Node>) {
        for node in incoming {
            self.nodes.insert(node.id.clone(), node);
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.dirty.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every live top-level note and list, highest sort value first.
    pub fn entities(&self) -> Vec<RemoteEntity> {
        let mut tops: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_id == ROOT_ID && n.is_live())
            .filter(|n| matches!(n.kind, NodeType::Note | NodeType::List))
            .collect();
        tops.sort_by(|a, b| b.sort_value.cmp(&a.sort_value).then(a.id.cmp(&b.id)));

        tops.into_iter().map(|n| self.build_entity(n)).collect()
    }

    /// Look up a top-level entity by client id, falling back to server id.
    pub fn entity(&self, id: &str) -> Option<RemoteEntity> {
        let node = self.nodes.get(id).or_else(|| {
            self.nodes
                .values()
                .find(|n| n.server_id.as_deref() == Some(id))
        })?;

        if !node.is_live() || !matches!(node.kind, NodeType::Note | NodeType::List) {
            return None;
        }
        Some(self.build_entity(node))
    }

    fn build_entity(&self, node: &Node) -> RemoteEntity {
        let children = self.children(&node.id);
        match node.kind {
            NodeType::List => RemoteEntity::list(
                &node.id,
                &node.title,
                children
                    .iter()
                    .map(|c| ListItem::new(&c.id, &c.text, c.checked))
                    .collect(),
            ),
            _ => RemoteEntity::note(
                &node.id,
                &node.title,
                children.first().map_or("", |c| c.text.as_str()),
            ),
        }
    }

    /// Live list items under `parent_id`, highest sort value first.
    fn children(&self, parent_id: &str) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_id == parent_id && n.kind == NodeType::ListItem && n.is_live())
            .collect();
        children.sort_by(|a, b| b.sort_value.cmp(&a.sort_value).then(a.id.cmp(&b.id)));
        children
    }

    fn list_node(&self, list_id: &str) -> Result<&Node> {
        match self.nodes.get(list_id) {
            Some(node) if node.kind == NodeType::List && node.is_live() => Ok(node),
            Some(_) => bail!(KeepError::NotAList {
                id: list_id.to_string()
            }),
            None => bail!(KeepError::EntityNotFound {
                id: list_id.to_string()
            }),
        }
    }

    pub fn set_checked(
        &mut self,
        list_id: &str,
        item_id: &str,
        checked: bool,
        now: &str,
    ) -> Result<()> {
        self.list_node(list_id)?;

        let item = match self.nodes.get_mut(item_id) {
            Some(item) if item.parent_id == list_id => item,
            _ => bail!(KeepError::EntityNotFound {
                id: item_id.to_string()
            }),
        };
        if item.checked == checked {
            return Ok(());
        }

        item.checked = checked;
        item.timestamps.updated = Some(now.to_string());
        self.mark_dirty(item_id);
        Ok(())
    }

    pub fn add_item(
        &mut self,
        list_id: &str,
        text: &str,
        checked: bool,
        placement: Placement,
        new_id: String,
        now: &str,
    ) -> Result<()> {
        let list = self.list_node(list_id)?;
        let parent_server_id = list.server_id.clone();

        let sorts = self.children(list_id).into_iter().map(|c| c.sort_value);
        let sort_value = match placement {
            Placement::Top => sorts.max().map_or(0, |s| s + SORT_DELTA),
            Placement::Bottom => sorts.min().map_or(0, |s| s - SORT_DELTA),
        };

        let mut extra = Map::new();
        extra.insert("kind".to_string(), Value::from("notes#node"));

        let node = Node {
            id: new_id.clone(),
            kind: NodeType::ListItem,
            parent_id: list_id.to_string(),
            server_id: None,
            parent_server_id,
            title: String::new(),
            text: text.to_string(),
            checked,
            sort_value,
            timestamps: Timestamps::fresh(now),
            extra,
        };
        self.nodes.insert(new_id.clone(), node);
        self.mark_dirty(&new_id);
        Ok(())
    }

    fn mark_dirty(&mut self, id: &str) {
        if !self.dirty.iter().any(|d| d == id) {
            self.dirty.push(id.to_string());
        }
    }

    /// Copies of nodes changed since the last sync, in change order.
    pub fn dirty_nodes(&self) -> Vec<Node> {
        self.dirty
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2024-05-01T10:00:00.000Z";

    fn node(value: Value) -> Node {
        serde_json::from_value(value).unwrap()
    }

    fn sample_store() -> NodeStore {
        let mut store = NodeStore::new();
        store.merge(vec![
            node(json!({
                "kind": "notes#node", "id": "list1", "serverId": "srv-list1",
                "type": "LIST", "parentId": "root", "title": "Groceries",
                "sortValue": "200", "color": "DEFAULT",
                "timestamps": {"created": NOW, "deleted": EPOCH}
            })),
            node(json!({
                "id": "i1", "type": "LIST_ITEM", "parentId": "list1",
                "text": "milk", "checked": false, "sortValue": "300"
            })),
            node(json!({
                "id": "i2", "type": "LIST_ITEM", "parentId": "list1",
                "text": "bread", "checked": true, "sortValue": 100
            })),
            node(json!({
                "id": "i3", "type": "LIST_ITEM", "parentId": "list1",
                "text": "eggs", "checked": false, "sortValue": "200"
            })),
            node(json!({
                "id": "note1", "type": "NOTE", "parentId": "root",
                "title": "", "sortValue": "100"
            })),
            node(json!({
                "id": "note1-text", "type": "LIST_ITEM", "parentId": "note1",
                "text": "remember the milk"
            })),
            node(json!({
                "id": "gone", "type": "NOTE", "parentId": "root",
                "timestamps": {"deleted": "2024-04-01T00:00:00.000Z"}
            })),
            node(json!({"id": "pic", "type": "BLOB", "parentId": "note1"})),
            node(json!({"id": "odd", "type": "SOMETHING_NEW", "parentId": "root"})),
        ]);
        store
    }

    #[test]
    fn test_entities_skip_deleted_and_unknown() {
        let store = sample_store();
        let ids: Vec<String> = store.entities().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["list1", "note1"]);
    }

    #[test]
    fn test_list_items_ordered_by_sort_value() {
        let list = sample_store().entity("list1").unwrap();
        let unchecked: Vec<&str> = list.unchecked().map(|i| i.text.as_str()).collect();
        let checked: Vec<&str> = list.checked().map(|i| i.text.as_str()).collect();
        assert_eq!(unchecked, vec!["milk", "eggs"]);
        assert_eq!(checked, vec!["bread"]);
    }

    #[test]
    fn test_note_text_from_child() {
        let note = sample_store().entity("note1").unwrap();
        assert_eq!(note, RemoteEntity::note("note1", "", "remember the milk"));
    }

    #[test]
    fn test_lookup_by_server_id() {
        let store = sample_store();
        assert_eq!(store.entity("srv-list1").unwrap().id, "list1");
        assert!(store.entity("gone").is_none());
        assert!(store.entity("i1").is_none());
    }

    #[test]
    fn test_set_checked_marks_dirty_once() {
        let mut store = sample_store();
        store.set_checked("list1", "i1", true, NOW).unwrap();
        store.set_checked("list1", "i1", true, NOW).unwrap();

        let dirty = store.dirty_nodes();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].checked);
        assert_eq!(dirty[0].timestamps.updated.as_deref(), Some(NOW));

        store.clear_dirty();
        assert!(store.dirty_nodes().is_empty());
    }

    #[test]
    fn test_set_checked_unchanged_is_not_dirty() {
        let mut store = sample_store();
        store.set_checked("list1", "i2", true, NOW).unwrap();
        assert!(store.dirty_nodes().is_empty());
    }

    #[test]
    fn test_set_checked_rejects_foreign_item() {
        let mut store = sample_store();
        let err = store.set_checked("list1", "note1-text", true, NOW).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeepError>(),
            Some(KeepError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn test_add_item_top_and_bottom() {
        let mut store = sample_store();
        store
            .add_item("list1", "butter", false, Placement::Top, "new1".into(), NOW)
            .unwrap();
        store
            .add_item("list1", "salt", true, Placement::Bottom, "new2".into(), NOW)
            .unwrap();

        let list = store.entity("list1").unwrap();
        let texts: Vec<&str> = list.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["butter", "milk", "eggs", "bread", "salt"]);

        let dirty = store.dirty_nodes();
        assert_eq!(dirty.len(), 2);
        assert_eq!(dirty[0].sort_value, 300 + SORT_DELTA);
        assert_eq!(dirty[0].parent_server_id.as_deref(), Some("srv-list1"));
    }

    #[test]
    fn test_add_item_to_note_fails() {
        let mut store = sample_store();
        let err = store
            .add_item("note1", "x", false, Placement::Top, "n".into(), NOW)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeepError>(),
            Some(KeepError::NotAList { .. })
        ));
    }

    #[test]
    fn test_round_trip_keeps_unknown_fields() {
        let store = sample_store();
        let list = store.nodes.get("list1").unwrap();
        let value = serde_json::to_value(list).unwrap();
        assert_eq!(value["color"], "DEFAULT");
        assert_eq!(value["kind"], "notes#node");
        assert_eq!(value["sortValue"], "200");
        assert_eq!(value["type"], "LIST");
    }

    #[test]
    fn test_new_node_id_shape() {
        let id = new_node_id();
        let (millis, random) = id.split_once('.').unwrap();
        assert!(i64::from_str_radix(millis, 16).is_ok());
        assert_eq!(random.len(), 16);
    }

    #[test]
    fn test_keep_timestamp_format() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(keep_timestamp(time), NOW);
    }
}
