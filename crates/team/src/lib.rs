//! Team hub: best-effort broadcast between agents in one process, plus a
//! registry of claimed resources.
//!
//! Every agent runtime subscribes to the hub and drops its own messages.
//! Receivers apply their own proximity filter before acting. There is no
//! ordering guarantee and a lagging receiver simply misses messages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use wardens_config::TeamConfig;
use wardens_core::{ClaimKind, TeamChannel, TeamMessage};

/// Claimed resources, keyed by category then position key, holding the owner.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    claims: Mutex<HashMap<ClaimKind, HashMap<String, String>>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `owner`. Re-claiming your own resource succeeds.
    pub fn claim(&self, kind: ClaimKind, key: &str, owner: &str) -> bool {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        let held = claims.entry(kind).or_default();
        match held.get(key) {
            Some(current) if current != owner => false,
            _ => {
                held.insert(key.to_string(), owner.to_string());
                true
            }
        }
    }

    /// Release `key` if `owner` holds it.
    pub fn release(&self, kind: ClaimKind, key: &str, owner: &str) {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(held) = claims.get_mut(&kind) {
            if held.get(key).is_some_and(|current| current == owner) {
                held.remove(key);
            }
        }
    }

    /// Drop every claim `owner` holds. Returns how many were released.
    pub fn release_all(&self, owner: &str) -> usize {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        let mut released = 0;
        for held in claims.values_mut() {
            let before = held.len();
            held.retain(|_, current| current != owner);
            released += before - held.len();
        }
        released
    }

    /// Whether the candidate position `key` is held by someone other than `asking`.
    pub fn is_claimed(&self, kind: ClaimKind, key: &str, asking: &str) -> bool {
        let claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        claims
            .get(&kind)
            .and_then(|held| held.get(key))
            .is_some_and(|owner| owner != asking)
    }
}

/// In-process implementation of [`TeamChannel`].
pub struct TeamHub {
    sender: broadcast::Sender<TeamMessage>,
    capacity: usize,
    claims: ClaimRegistry,
}

impl TeamHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            claims: ClaimRegistry::new(),
        }
    }

    /// Hub sized from the `[team]` config section.
    pub fn from_config(config: &TeamConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receiver for one agent runtime.
    pub fn subscribe(&self) -> broadcast::Receiver<TeamMessage> {
        self.sender.subscribe()
    }

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }
}

impl Default for TeamHub {
    fn default() -> Self {
        Self::from_config(&TeamConfig::default())
    }
}

#[async_trait]
impl TeamChannel for TeamHub {
    async fn broadcast(&self, message: TeamMessage) {
        match self.sender.send(message) {
            Ok(receivers) => debug!(receivers, "Team message sent"),
            Err(_) => warn!("Team message dropped, nobody is listening"),
        }
    }

    fn claim(&self, kind: ClaimKind, key: &str, owner: &str) -> bool {
        self.claims.claim(kind, key, owner)
    }

    fn release(&self, kind: ClaimKind, key: &str, owner: &str) {
        self.claims.release(kind, key, owner);
    }

    fn is_claimed(&self, kind: ClaimKind, key: &str, asking: &str) -> bool {
        self.claims.is_claimed(kind, key, asking)
    }

    fn release_all(&self, owner: &str) {
        let released = self.claims.release_all(owner);
        if released > 0 {
            debug!(owner, released, "Claims released");
        }
    }
}
