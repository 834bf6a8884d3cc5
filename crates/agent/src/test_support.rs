//! Scripted collaborators for tests.
//!
//! Only depends on `wardens-core` and `wardens-team` so integration tests
//! can include it with `#[path]`.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use wardens_core::{
    ActionError, Block, Body, Collaborators, Container, Entity, EntityId, EntityKind, Goal,
    Inventory, InventoryError, Item, Motion, MotionError, Position, WorldView,
};
use wardens_team::TeamHub;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

// ── Motion ─────────────────────────────────────────────────────────────────

/// How the fake body moves when its position is read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionScript {
    /// Never moves.
    Stuck,
    /// Steps `speed` blocks toward the active goal per position read.
    Walk { speed: f64 },
    /// Moves one block east per read, never arriving anywhere.
    Drift,
}

pub struct FakeMotion {
    position: Mutex<Position>,
    goal: Mutex<Option<Goal>>,
    script: Mutex<MotionScript>,
    unreachable: Mutex<HashSet<String>>,
    pub goals: Mutex<Vec<Goal>>,
    pub looks: Mutex<Vec<Position>>,
    clears: AtomicUsize,
    reject_goals: AtomicBool,
}

impl FakeMotion {
    pub fn new(position: Position) -> Self {
        Self {
            position: Mutex::new(position),
            goal: Mutex::new(None),
            script: Mutex::new(MotionScript::Walk { speed: 100.0 }),
            unreachable: Mutex::new(HashSet::new()),
            goals: Mutex::new(Vec::new()),
            looks: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
            reject_goals: AtomicBool::new(false),
        }
    }

    pub fn set_script(&self, script: MotionScript) {
        *lock(&self.script) = script;
    }

    pub fn teleport(&self, position: Position) {
        *lock(&self.position) = position;
    }

    /// Current position without advancing the script.
    pub fn peek(&self) -> Position {
        *lock(&self.position)
    }

    pub fn mark_unreachable(&self, position: Position) {
        lock(&self.unreachable).insert(position.key());
    }

    pub fn reject_goals(&self, reject: bool) {
        self.reject_goals.store(reject, Ordering::SeqCst);
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn goal_count(&self) -> usize {
        lock(&self.goals).len()
    }

    pub fn last_goal(&self) -> Option<Goal> {
        lock(&self.goals).last().copied()
    }

    fn step(&self) -> Position {
        let script = *lock(&self.script);
        let goal = *lock(&self.goal);
        let mut position = lock(&self.position);
        match script {
            MotionScript::Stuck => {}
            MotionScript::Drift => position.x += 1.0,
            MotionScript::Walk { speed } => {
                if let Some(goal) = goal {
                    let remaining = position.distance_to(&goal.target);
                    if remaining <= speed {
                        *position = goal.target;
                    } else {
                        let ratio = speed / remaining;
                        *position = position.offset(
                            (goal.target.x - position.x) * ratio,
                            (goal.target.y - position.y) * ratio,
                            (goal.target.z - position.z) * ratio,
                        );
                    }
                }
            }
        }
        *position
    }
}

#[async_trait]
impl Motion for FakeMotion {
    async fn request_goal(&self, goal: Goal) -> Result<(), MotionError> {
        lock(&self.goals).push(goal);
        if self.reject_goals.load(Ordering::SeqCst) {
            return Err(MotionError::NoPath("scripted rejection".into()));
        }
        *lock(&self.goal) = Some(goal);
        Ok(())
    }

    fn clear_goal(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *lock(&self.goal) = None;
    }

    fn current_position(&self) -> Position {
        self.step()
    }

    fn is_moving(&self) -> bool {
        let Some(goal) = *lock(&self.goal) else {
            return false;
        };
        let script = *lock(&self.script);
        match script {
            MotionScript::Stuck => false,
            MotionScript::Drift => true,
            MotionScript::Walk { .. } => self.peek().distance_to(&goal.target) > goal.range,
        }
    }

    fn can_reach(&self, target: Position) -> bool {
        !lock(&self.unreachable).contains(&target.key())
    }

    fn look_at(&self, target: Position) {
        lock(&self.looks).push(target);
    }
}

// ── World ──────────────────────────────────────────────────────────────────

pub struct FakeWorld {
    motion: Arc<FakeMotion>,
    entities: Mutex<Vec<Entity>>,
    players: Mutex<HashMap<String, Position>>,
    blocks: Mutex<Vec<Block>>,
    day: AtomicBool,
    line_of_sight: AtomicBool,
}

impl FakeWorld {
    pub fn new(motion: Arc<FakeMotion>) -> Self {
        Self {
            motion,
            entities: Mutex::new(Vec::new()),
            players: Mutex::new(HashMap::new()),
            blocks: Mutex::new(Vec::new()),
            day: AtomicBool::new(true),
            line_of_sight: AtomicBool::new(true),
        }
    }

    pub fn add_hostile(&self, id: u64, position: Position) -> EntityId {
        self.add_entity(id, "zombie", EntityKind::Hostile, position)
    }

    pub fn add_drop(&self, id: u64, position: Position) -> EntityId {
        self.add_entity(id, "item", EntityKind::ItemDrop, position)
    }

    pub fn add_entity(&self, id: u64, name: &str, kind: EntityKind, position: Position) -> EntityId {
        let entity = Entity {
            id: EntityId(id),
            name: name.to_string(),
            kind,
            position,
            height: 1.8,
        };
        lock(&self.entities).push(entity);
        EntityId(id)
    }

    pub fn remove_entity(&self, id: EntityId) {
        lock(&self.entities).retain(|entity| entity.id != id);
    }

    pub fn move_entity(&self, id: EntityId, position: Position) {
        if let Some(entity) = lock(&self.entities).iter_mut().find(|e| e.id == id) {
            entity.position = position;
        }
    }

    pub fn add_player(&self, name: &str, position: Position) {
        lock(&self.players).insert(name.to_string(), position);
    }

    pub fn add_block(&self, block: Block) {
        lock(&self.blocks).push(block);
    }

    pub fn set_day(&self, day: bool) {
        self.day.store(day, Ordering::SeqCst);
    }

    pub fn set_line_of_sight(&self, clear: bool) {
        self.line_of_sight.store(clear, Ordering::SeqCst);
    }

    fn sorted_by_distance<T>(&self, mut items: Vec<T>, position: impl Fn(&T) -> Position) -> Vec<T> {
        let here = self.motion.peek();
        items.sort_by(|a, b| {
            here.distance_to(&position(a))
                .total_cmp(&here.distance_to(&position(b)))
        });
        items
    }
}

impl WorldView for FakeWorld {
    fn nearest_hostile(&self, range: f64, filter: &dyn Fn(&Entity) -> bool) -> Option<Entity> {
        let here = self.motion.peek();
        let candidates: Vec<Entity> = lock(&self.entities)
            .iter()
            .filter(|e| e.kind == EntityKind::Hostile && here.distance_to(&e.position) <= range)
            .cloned()
            .collect();
        self.sorted_by_distance(candidates, |e| e.position)
            .into_iter()
            .find(|e| filter(e))
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        lock(&self.entities).iter().find(|e| e.id == id).cloned()
    }

    fn entities(&self) -> Vec<Entity> {
        lock(&self.entities).clone()
    }

    fn player_position(&self, username: &str) -> Option<Position> {
        lock(&self.players).get(username).copied()
    }

    fn line_of_sight(&self, _target: Position) -> bool {
        self.line_of_sight.load(Ordering::SeqCst)
    }

    fn nearby_item_drops(&self, range: f64) -> Vec<Entity> {
        let here = self.motion.peek();
        let drops: Vec<Entity> = lock(&self.entities)
            .iter()
            .filter(|e| e.kind == EntityKind::ItemDrop && here.distance_to(&e.position) <= range)
            .cloned()
            .collect();
        self.sorted_by_distance(drops, |e| e.position)
    }

    fn find_blocks_by_name(&self, names: &[String], range: f64, max: usize) -> Vec<Block> {
        let here = self.motion.peek();
        let blocks: Vec<Block> = lock(&self.blocks)
            .iter()
            .filter(|b| names.contains(&b.name) && here.distance_to(&b.position) <= range)
            .cloned()
            .collect();
        let mut sorted = self.sorted_by_distance(blocks, |b| b.position);
        sorted.truncate(max);
        sorted
    }

    fn is_day(&self) -> bool {
        self.day.load(Ordering::SeqCst)
    }
}

// ── Inventory ──────────────────────────────────────────────────────────────

pub struct FakeInventory {
    items: Arc<Mutex<Vec<Item>>>,
    armor: Mutex<Vec<Item>>,
    hand: Mutex<Option<Item>>,
    containers: Mutex<HashMap<String, Arc<Mutex<Vec<Item>>>>>,
    foods: HashSet<String>,
    total_slots: usize,
    empty_slots_override: Mutex<Option<usize>>,
    refuse_equips: AtomicBool,
    pub equips: Mutex<Vec<String>>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            armor: Mutex::new(Vec::new()),
            hand: Mutex::new(None),
            containers: Mutex::new(HashMap::new()),
            foods: ["bread", "apple", "cooked_beef", "baked_potato"]
                .into_iter()
                .map(String::from)
                .collect(),
            total_slots: 36,
            empty_slots_override: Mutex::new(None),
            refuse_equips: AtomicBool::new(false),
            equips: Mutex::new(Vec::new()),
        }
    }

    pub fn give(&self, name: &str, count: u32) {
        lock(&self.items).push(Item::new(name, count));
    }

    pub fn wear(&self, name: &str) {
        lock(&self.armor).push(Item::new(name, 1));
    }

    pub fn item_names(&self) -> Vec<String> {
        lock(&self.items).iter().map(|i| i.name.clone()).collect()
    }

    pub fn count_of(&self, name: &str) -> u32 {
        lock(&self.items)
            .iter()
            .filter(|i| i.name == name)
            .map(|i| i.count)
            .sum()
    }

    pub fn held(&self) -> Option<Item> {
        lock(&self.hand).clone()
    }

    pub fn refuse_equips(&self, refuse: bool) {
        self.refuse_equips.store(refuse, Ordering::SeqCst);
    }

    pub fn set_empty_slots(&self, slots: usize) {
        *lock(&self.empty_slots_override) = Some(slots);
    }

    /// Put a container with `contents` at `position`.
    pub fn add_container(&self, position: Position, contents: Vec<Item>) {
        lock(&self.containers).insert(position.key(), Arc::new(Mutex::new(contents)));
    }

    pub fn container_contents(&self, position: Position) -> Vec<Item> {
        lock(&self.containers)
            .get(&position.key())
            .map(|c| lock(c).clone())
            .unwrap_or_default()
    }
}

impl Default for FakeInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    fn items(&self) -> Vec<Item> {
        lock(&self.items).clone()
    }

    fn equipment(&self) -> Vec<Item> {
        let mut equipment = lock(&self.armor).clone();
        equipment.extend(lock(&self.hand).clone());
        equipment
    }

    fn empty_slots(&self) -> usize {
        lock(&self.empty_slots_override)
            .unwrap_or_else(|| self.total_slots.saturating_sub(lock(&self.items).len()))
    }

    fn is_food(&self, name: &str) -> bool {
        self.foods.contains(name)
    }

    async fn equip(&self, item: &Item) -> Result<(), InventoryError> {
        if self.refuse_equips.load(Ordering::SeqCst) {
            return Err(InventoryError::EquipFailed {
                item: item.name.clone(),
                reason: "hands full".into(),
            });
        }
        let owned = lock(&self.items).iter().any(|i| i.name == item.name);
        if !owned {
            return Err(InventoryError::ItemNotFound(item.name.clone()));
        }
        lock(&self.equips).push(item.name.clone());
        *lock(&self.hand) = Some(item.clone());
        Ok(())
    }

    async fn unequip_hand(&self) -> Result<(), InventoryError> {
        *lock(&self.hand) = None;
        Ok(())
    }

    async fn open_container(&self, at: Position) -> Option<Box<dyn Container>> {
        let contents = lock(&self.containers).get(&at.key()).cloned()?;
        Some(Box::new(FakeContainer {
            contents,
            inventory: Arc::clone(&self.items),
        }))
    }
}

struct FakeContainer {
    contents: Arc<Mutex<Vec<Item>>>,
    inventory: Arc<Mutex<Vec<Item>>>,
}

fn take(stacks: &mut Vec<Item>, name: &str, count: u32) -> u32 {
    let mut taken = 0;
    for stack in stacks.iter_mut().filter(|s| s.name == name) {
        let moved = stack.count.min(count - taken);
        stack.count -= moved;
        taken += moved;
        if taken == count {
            break;
        }
    }
    stacks.retain(|s| s.count > 0);
    taken
}

#[async_trait]
impl Container for FakeContainer {
    fn items(&self) -> Vec<Item> {
        lock(&self.contents).clone()
    }

    async fn deposit(&mut self, item: &Item, count: u32) -> Result<(), InventoryError> {
        let moved = take(&mut lock(&self.inventory), &item.name, count);
        if moved == 0 {
            return Err(InventoryError::ItemNotFound(item.name.clone()));
        }
        lock(&self.contents).push(Item::new(item.name.clone(), moved));
        Ok(())
    }

    async fn withdraw(&mut self, item: &Item, count: u32) -> Result<(), InventoryError> {
        let moved = take(&mut lock(&self.contents), &item.name, count);
        if moved == 0 {
            return Err(InventoryError::ItemNotFound(item.name.clone()));
        }
        lock(&self.inventory).push(Item::new(item.name.clone(), moved));
        Ok(())
    }

    fn close(&mut self) {}
}

// ── Body ───────────────────────────────────────────────────────────────────

pub struct FakeBody {
    world: Arc<FakeWorld>,
    health: Mutex<f32>,
    food: Mutex<f32>,
    sleeping: AtomicBool,
    using_item: AtomicBool,
    hits_to_kill: Mutex<HashMap<EntityId, u32>>,
    sleep_results: Mutex<VecDeque<Result<(), ActionError>>>,
    pub chats: Mutex<Vec<String>>,
    pub attacks: Mutex<Vec<EntityId>>,
    pub dug: Mutex<Vec<Position>>,
    pub placed: Mutex<Vec<Position>>,
    activations: AtomicUsize,
    sleep_attempts: AtomicUsize,
    wakes: AtomicUsize,
}

impl FakeBody {
    pub fn new(world: Arc<FakeWorld>) -> Self {
        Self {
            world,
            health: Mutex::new(20.0),
            food: Mutex::new(20.0),
            sleeping: AtomicBool::new(false),
            using_item: AtomicBool::new(false),
            hits_to_kill: Mutex::new(HashMap::new()),
            sleep_results: Mutex::new(VecDeque::new()),
            chats: Mutex::new(Vec::new()),
            attacks: Mutex::new(Vec::new()),
            dug: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            activations: AtomicUsize::new(0),
            sleep_attempts: AtomicUsize::new(0),
            wakes: AtomicUsize::new(0),
        }
    }

    pub fn set_health(&self, health: f32) {
        *lock(&self.health) = health;
    }

    pub fn set_food(&self, food: f32) {
        *lock(&self.food) = food;
    }

    pub fn set_using_item(&self, using: bool) {
        self.using_item.store(using, Ordering::SeqCst);
    }

    /// The entity disappears from the world after `hits` attacks.
    pub fn dies_after(&self, id: EntityId, hits: u32) {
        lock(&self.hits_to_kill).insert(id, hits);
    }

    pub fn script_sleep(&self, result: Result<(), ActionError>) {
        lock(&self.sleep_results).push_back(result);
    }

    pub fn said(&self, needle: &str) -> bool {
        lock(&self.chats).iter().any(|line| line.contains(needle))
    }

    pub fn attack_count(&self) -> usize {
        lock(&self.attacks).len()
    }

    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn sleep_attempts(&self) -> usize {
        self.sleep_attempts.load(Ordering::SeqCst)
    }

    pub fn wake_count(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Body for FakeBody {
    fn health(&self) -> f32 {
        *lock(&self.health)
    }

    fn food(&self) -> f32 {
        *lock(&self.food)
    }

    fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::SeqCst)
    }

    fn is_using_item(&self) -> bool {
        self.using_item.load(Ordering::SeqCst)
    }

    fn attack(&self, target: EntityId) {
        lock(&self.attacks).push(target);
        let mut hits = lock(&self.hits_to_kill);
        if let Some(left) = hits.get_mut(&target) {
            *left = left.saturating_sub(1);
            if *left == 0 {
                hits.remove(&target);
                self.world.remove_entity(target);
            }
        }
    }

    fn activate_item(&self) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn deactivate_item(&self) {}

    async fn dig(&self, block: &Block) -> Result<(), ActionError> {
        lock(&self.dug).push(block.position);
        Ok(())
    }

    async fn place_on(&self, block: &Block) -> Result<(), ActionError> {
        lock(&self.placed).push(block.position);
        Ok(())
    }

    async fn sleep_in(&self, _bed: &Block) -> Result<(), ActionError> {
        self.sleep_attempts.fetch_add(1, Ordering::SeqCst);
        let result = lock(&self.sleep_results).pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.sleeping.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn wake(&self) -> Result<(), ActionError> {
        self.wakes.fetch_add(1, Ordering::SeqCst);
        self.sleeping.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn chat(&self, text: &str) {
        lock(&self.chats).push(text.to_string());
    }
}

// ── Fixture ────────────────────────────────────────────────────────────────

/// One agent's worth of fakes, wired together.
pub struct Fixture {
    pub motion: Arc<FakeMotion>,
    pub world: Arc<FakeWorld>,
    pub inventory: Arc<FakeInventory>,
    pub body: Arc<FakeBody>,
    pub team: Arc<TeamHub>,
}

impl Fixture {
    pub fn at(position: Position) -> Self {
        Self::with_team(position, Arc::new(TeamHub::new(16)))
    }

    pub fn with_team(position: Position, team: Arc<TeamHub>) -> Self {
        let motion = Arc::new(FakeMotion::new(position));
        let world = Arc::new(FakeWorld::new(Arc::clone(&motion)));
        let body = Arc::new(FakeBody::new(Arc::clone(&world)));
        Self {
            motion,
            world,
            inventory: Arc::new(FakeInventory::new()),
            body,
            team,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            motion: self.motion.clone(),
            world: self.world.clone(),
            inventory: self.inventory.clone(),
            body: self.body.clone(),
            team: self.team.clone(),
        }
    }
}
