use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use super::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Waiting for the user to scan a QR code.
    Pairing,
    Connected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub channel_id: i32,
    pub tenant_id: i32,
    pub provider: Provider,
    pub state: SessionState,
    /// Provider-side identity, e.g. the Telegram bot username.
    pub account: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Live sessions of this process, keyed by channel id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<i32, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session, returning the handle it replaced.
    pub fn insert(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.sessions.insert(handle.channel_id, handle)
    }

    pub fn get(&self, channel_id: i32) -> Option<SessionHandle> {
        self.sessions.get(&channel_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, channel_id: i32) -> Option<SessionHandle> {
        self.sessions.remove(&channel_id).map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
