//! Blocking HTTPS client for the Keep notes API.
//!
//! The whole account is mirrored in a `NodeStore` on resume. Mutations
//! only touch the mirror until `sync` posts the changed nodes to the
//! `changes` endpoint and merges what the server sends back.

use crate::error::KeepError;
use crate::remote::auth::GoogleAuth;
use crate::remote::nodes::{keep_timestamp, new_node_id, Node, NodeStore};
use crate::remote::{NoteService, Placement, RemoteEntity};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const CHANGES_URL: &str = "https://www.googleapis.com/notes/v1/changes";

const CAPABILITIES: [&str; 11] = [
    "NC", "PI", "LB", "AN", "SH", "DR", "TR", "IN", "SNB", "MI", "CO",
];

/// Full resyncs the server may force within one `changes` exchange.
const MAX_FORCED_RESYNCS: u32 = 2;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangesRequest<'a> {
    nodes: Vec<Node>,
    client_timestamp: String,
    request_header: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_version: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangesResponse {
    #[serde(default)]
    nodes: Vec<Node>,
    to_version: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    force_full_resync: bool,
}

/// What the `changes` loop does after absorbing a response.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    Fetch,
    Done,
}

/// Node mirror plus the server version it reflects.
#[derive(Debug, Default)]
struct Mirror {
    store: NodeStore,
    version: Option<String>,
}

impl Mirror {
    fn reset(&mut self) {
        self.version = None;
        self.store.clear();
    }

    /// Fold one `changes` response into the mirror. `pushed` is how many
    /// dirty nodes the request carried; `resyncs` counts forced resyncs
    /// within the current exchange.
    fn absorb(
        &mut self,
        pushed: usize,
        response: ChangesResponse,
        resyncs: &mut u32,
    ) -> Result<Next> {
        if pushed > 0 {
            debug!("Pushed {} changed nodes", pushed);
            self.store.clear_dirty();
        }

        if response.force_full_resync {
            *resyncs += 1;
            if *resyncs > MAX_FORCED_RESYNCS {
                bail!("Keep API keeps forcing a full resync");
            }
            warn!("Keep API requested a full resync");
            self.reset();
            return Ok(Next::Fetch);
        }

        debug!("Received {} nodes", response.nodes.len());
        self.store.merge(response.nodes);
        if let Some(version) = response.to_version {
            self.version = Some(version);
        }

        Ok(if response.truncated {
            Next::Fetch
        } else {
            Next::Done
        })
    }
}

pub struct KeepClient {
    http: reqwest::blocking::Client,
    auth: GoogleAuth,
    bearer: Option<String>,
    session_id: String,
    mirror: Mirror,
}

impl KeepClient {
    pub fn new(android_id: &str) -> Self {
        let http = reqwest::blocking::Client::new();
        let session_id = format!(
            "s--{}--{}",
            Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(1_000_000_000u64..10_000_000_000)
        );

        Self {
            auth: GoogleAuth::new(http.clone(), android_id),
            http,
            bearer: None,
            session_id,
            mirror: Mirror::default(),
        }
    }

    fn request_header(&self) -> Value {
        let capabilities: Vec<Value> = CAPABILITIES
            .iter()
            .map(|c| json!({ "type": c }))
            .collect();

        json!({
            "clientSessionId": self.session_id,
            "clientPlatform": "ANDROID",
            "clientVersion": {"major": "9", "minor": "9", "build": "9", "revision": "9"},
            "capabilities": capabilities,
        })
    }

    fn post_changes(&self, nodes: Vec<Node>) -> Result<ChangesResponse> {
        let Some(bearer) = self.bearer.as_deref() else {
            bail!(KeepError::Auth("not logged in".to_string()));
        };

        let request = ChangesRequest {
            nodes,
            client_timestamp: keep_timestamp(Utc::now()),
            request_header: self.request_header(),
            target_version: self.mirror.version.as_deref(),
        };

        let response = self
            .http
            .post(CHANGES_URL)
            .header("Authorization", format!("OAuth {}", bearer))
            .json(&request)
            .send()
            .context("Cannot connect to Keep API")?;

        let status = response.status();
        if status.as_u16() == 401 {
            bail!(KeepError::Auth("Keep API rejected the session".to_string()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(KeepError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .context("Cannot parse Keep changes response")
    }

    /// Send dirty nodes, then keep pulling until the server has nothing more.
    fn changes(&mut self) -> Result<()> {
        let mut outgoing = self.mirror.store.dirty_nodes();
        let mut resyncs = 0;

        loop {
            let pushed = outgoing.len();
            let response = self.post_changes(std::mem::take(&mut outgoing))?;
            if self.mirror.absorb(pushed, response, &mut resyncs)? == Next::Done {
                break;
            }
        }

        debug!("Mirror holds {} nodes", self.mirror.store.len());
        Ok(())
    }
}

impl NoteService for KeepClient {
    fn login(&mut self, username: &str, password: &str) -> Result<String> {
        info!("Logging in as {}", username);
        let master_token = self.auth.master_login(username, password)?;
        self.resume(username, &master_token)?;
        Ok(master_token)
    }

    fn resume(&mut self, username: &str, token: &str) -> Result<()> {
        debug!("Resuming session for {}", username);
        self.bearer = Some(self.auth.exchange(username, token)?);
        self.mirror.reset();
        self.changes()
    }

    fn all(&self) -> Result<Vec<RemoteEntity>> {
        Ok(self.mirror.store.entities())
    }

    fn get(&self, id: &str) -> Result<RemoteEntity> {
        self.mirror
            .store
            .entity(id)
            .ok_or_else(|| KeepError::EntityNotFound { id: id.to_string() }.into())
    }

    fn set_checked(&mut self, list_id: &str, item_id: &str, checked: bool) -> Result<()> {
        let now = keep_timestamp(Utc::now());
        self.mirror.store.set_checked(list_id, item_id, checked, &now)
    }

    fn add_item(
        &mut self,
        list_id: &str,
        text: &str,
        checked: bool,
        placement: Placement,
    ) -> Result<()> {
        let now = keep_timestamp(Utc::now());
        self.mirror
            .store
            .add_item(list_id, text, checked, placement, new_node_id(), &now)
    }

    fn sync(&mut self) -> Result<()> {
        self.changes()
    }
}
