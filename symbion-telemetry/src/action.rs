//! Remote actions for actionable entity kinds
//!
//! Only kinds implementing `Actionable` accept actions. Executing an action
//! queues an `ActionRequest` (same shape as an agent command: id, target,
//! type, timestamp) for the transport layer to drain and deliver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteAction {
    Stop,
    Restart,
}

impl RemoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteAction::Stop => "stop",
            RemoteAction::Restart => "restart",
        }
    }
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(RemoteAction::Stop),
            "restart" => Ok(RemoteAction::Restart),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub command_id: Uuid,
    pub seuid: String,
    pub action: RemoteAction,
    pub requested_at: DateTime<Utc>,
}

impl ActionRequest {
    pub fn new(seuid: impl Into<String>, action: RemoteAction) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            seuid: seuid.into(),
            action,
            requested_at: Utc::now(),
        }
    }
}

/// Capability of entity kinds that accept remote actions
pub trait Actionable {
    /// Queues `action` and returns the request that was queued
    fn execute_action(&mut self, action: RemoteAction) -> ActionRequest;

    fn pending_actions(&self) -> &[ActionRequest];

    /// Hands every queued request to the caller, oldest first
    fn drain_actions(&mut self) -> Vec<ActionRequest>;
}
