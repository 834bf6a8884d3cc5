//! # Wardens Core
//!
//! Domain types, collaborator traits, and error definitions for Wardens
//! agents. This crate knows nothing about schedulers or decision logic; it
//! defines the vocabulary every other crate speaks.
//!
//! ## Design Philosophy
//!
//! The world an agent lives in is reached only through the traits in
//! [`world`] and [`team`]. Implementations live outside the core. This enables:
//! - Running the same agent logic against a live server or a scripted fake
//! - Testing every control loop deterministically
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod geometry;
pub mod world;
pub mod task;
pub mod persona;
pub mod team;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ActionError, Error, InventoryError, MotionError, Result, SleepRefusal};
pub use geometry::{Goal, Position};
pub use world::{
    Block, Body, Collaborators, Container, Entity, EntityId, EntityKind, Inventory, Item, Motion,
    WorldView,
};
pub use task::{ContainerSearch, Task, TaskKind};
pub use persona::{AgentRecord, AttackMode, Persona};
pub use team::{ClaimKind, TeamChannel, TeamMessage, TeamMessageKind};
pub use event::{AgentEvent, DomainEvent, EventBus};
