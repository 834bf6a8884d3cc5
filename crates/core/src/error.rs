//! Error types for the Wardens domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error variant.

use thiserror::Error;

/// The top-level error type for all Wardens operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Motion errors ---
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),

    // --- Inventory errors ---
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    // --- Body action errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum MotionError {
    #[error("Goal was changed before it was reached")]
    GoalChanged,

    #[error("No path to goal: {0}")]
    NoPath(String),

    #[error("Motion collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Container at {0} could not be opened")]
    ContainerUnavailable(String),

    #[error("Transfer of {item} failed: {reason}")]
    TransferFailed { item: String, reason: String },

    #[error("Could not equip {item}: {reason}")]
    EquipFailed { item: String, reason: String },
}

/// Why the world refused to let the agent sleep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SleepRefusal {
    #[error("you may not rest now, there are monsters nearby")]
    MonstersNearby,

    #[error("not sleeping")]
    NotSleeping,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("Sleep refused: {0}")]
    SleepRefused(#[from] SleepRefusal),

    #[error("Block {block} cannot be used: {reason}")]
    BlockUnusable { block: String, reason: String },

    #[error("Action failed: {0}")]
    Failed(String),
}
