//! Collaborator traits: the narrow surface through which an agent sees and
//! touches the world.
//!
//! Connection handling, pathfinding, and raw inventory manipulation are
//! implemented elsewhere. The agent crate only ever talks to these traits,
//! which keeps every control loop testable against a scripted fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ActionError, InventoryError, MotionError};
use crate::geometry::{Goal, Position};
use crate::team::TeamChannel;

/// Stable identifier of an entity for as long as it stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Hostile,
    Player,
    ItemDrop,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
    pub height: f64,
}

/// A stack of items, in an inventory or a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub count: u32,
}

impl Item {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }

    /// Whether this item belongs to a loose category such as `"sword"` or
    /// `"arrow"`. Item names embed their category (`iron_sword`).
    pub fn is_a(&self, category: &str) -> bool {
        self.name.contains(category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub position: Position,
    /// Growth stage for crops; zero for everything else.
    #[serde(default)]
    pub age: u8,
    /// Nothing solid sits on top of this block.
    #[serde(default)]
    pub clear_above: bool,
    /// Beds: someone is already lying in it.
    #[serde(default)]
    pub occupied: bool,
}

impl Block {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            age: 0,
            clear_above: true,
            occupied: false,
        }
    }
}

// ── Collaborators ──────────────────────────────────────────────────────────

/// Movement execution. Goal requests may be rejected when superseded; the
/// caller decides arrival on its own by polling the position.
#[async_trait]
pub trait Motion: Send + Sync {
    /// Ask the pathfinder to move toward `goal`. Resolves when the goal is
    /// reached or abandoned.
    async fn request_goal(&self, goal: Goal) -> std::result::Result<(), MotionError>;

    /// Drop whatever goal is active.
    fn clear_goal(&self);

    fn current_position(&self) -> Position;

    fn is_moving(&self) -> bool;

    /// Cheap reachability probe. Not a full path search.
    fn can_reach(&self, target: Position) -> bool;

    fn look_at(&self, target: Position);
}

/// Read-only world queries.
pub trait WorldView: Send + Sync {
    /// Nearest hostile within `range` that also passes `filter`.
    fn nearest_hostile(&self, range: f64, filter: &dyn Fn(&Entity) -> bool) -> Option<Entity>;

    /// Current state of an entity, `None` once it is gone.
    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// Every loaded entity except the agent itself.
    fn entities(&self) -> Vec<Entity>;

    fn player_position(&self, username: &str) -> Option<Position>;

    fn line_of_sight(&self, target: Position) -> bool;

    /// Dropped items within `range`, nearest first.
    fn nearby_item_drops(&self, range: f64) -> Vec<Entity>;

    /// Blocks with any of `names` within `range`, nearest first, at most `max`.
    fn find_blocks_by_name(&self, names: &[String], range: f64, max: usize) -> Vec<Block>;

    fn is_day(&self) -> bool;
}

/// A container window. Closed explicitly by the caller.
#[async_trait]
pub trait Container: Send {
    fn items(&self) -> Vec<Item>;

    async fn deposit(&mut self, item: &Item, count: u32) -> std::result::Result<(), InventoryError>;

    async fn withdraw(&mut self, item: &Item, count: u32)
        -> std::result::Result<(), InventoryError>;

    fn close(&mut self);
}

#[async_trait]
pub trait Inventory: Send + Sync {
    /// Items in the main inventory slots.
    fn items(&self) -> Vec<Item>;

    /// Worn armor plus whatever is in hand.
    fn equipment(&self) -> Vec<Item>;

    fn empty_slots(&self) -> usize;

    fn is_food(&self, name: &str) -> bool;

    async fn equip(&self, item: &Item) -> std::result::Result<(), InventoryError>;

    async fn unequip_hand(&self) -> std::result::Result<(), InventoryError>;

    async fn open_container(&self, at: Position) -> Option<Box<dyn Container>>;
}

/// Actions the agent performs with its own body.
#[async_trait]
pub trait Body: Send + Sync {
    fn health(&self) -> f32;

    fn food(&self) -> f32;

    fn is_sleeping(&self) -> bool;

    fn is_using_item(&self) -> bool;

    fn attack(&self, target: EntityId);

    fn activate_item(&self);

    fn deactivate_item(&self);

    async fn dig(&self, block: &Block) -> std::result::Result<(), ActionError>;

    /// Place the held item on top of `block`.
    async fn place_on(&self, block: &Block) -> std::result::Result<(), ActionError>;

    async fn sleep_in(&self, bed: &Block) -> std::result::Result<(), ActionError>;

    async fn wake(&self) -> std::result::Result<(), ActionError>;

    fn chat(&self, text: &str);
}

/// Every collaborator an agent needs, bundled for construction.
#[derive(Clone)]
pub struct Collaborators {
    pub motion: Arc<dyn Motion>,
    pub world: Arc<dyn WorldView>,
    pub inventory: Arc<dyn Inventory>,
    pub body: Arc<dyn Body>,
    pub team: Arc<dyn TeamChannel>,
}
