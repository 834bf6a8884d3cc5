//! Team messaging: best-effort broadcast between agents plus resource claims.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMessageKind {
    /// The sender is hurt and wants company.
    Help,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMessage {
    pub id: Uuid,
    pub sender: String,
    pub sender_position: Position,
    pub kind: TeamMessageKind,
    pub sent_at: DateTime<Utc>,
}

impl TeamMessage {
    pub fn help(sender: impl Into<String>, sender_position: Position) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            sender_position,
            kind: TeamMessageKind::Help,
            sent_at: Utc::now(),
        }
    }
}

/// Categories of claimable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Bed,
}

/// Outbound side of team coordination.
///
/// Inbound messages reach an agent through its runtime, never through this
/// trait. No delivery or ordering guarantee.
#[async_trait]
pub trait TeamChannel: Send + Sync {
    async fn broadcast(&self, message: TeamMessage);

    /// Mark the resource at `key` as taken. Returns false if someone else
    /// holds it.
    fn claim(&self, kind: ClaimKind, key: &str, owner: &str) -> bool;

    fn release(&self, kind: ClaimKind, key: &str, owner: &str);

    /// Whether the resource at `key` is held by anyone other than `asking`.
    fn is_claimed(&self, kind: ClaimKind, key: &str, asking: &str) -> bool;

    /// Drop everything `owner` holds.
    fn release_all(&self, owner: &str);
}
