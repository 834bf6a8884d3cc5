//! Item selection: tool tiers, weapon checks, and what to move in and out of
//! containers.

use std::time::Duration;
use tracing::{debug, warn};

use wardens_config::BehaviorConfig;
use wardens_core::{Inventory, Item, Motion, Position, Result};

/// Material tiers, best first.
pub const TOOL_TIERS: [&str; 6] = ["netherite", "diamond", "iron", "stone", "wooden", "golden"];

/// Tools usable for melee, in tie-break order.
pub const MELEE_TOOLS: [&str; 4] = ["sword", "axe", "pickaxe", "shovel"];

/// Categories every agent tries to carry. Checked off when already held.
pub const PULL_LIST: [&str; 11] = [
    "food",
    "sword",
    "pickaxe",
    "helmet",
    "chestplate",
    "leggings",
    "boots",
    "axe",
    "bow",
    "crossbow",
    "arrow",
];

/// Categories never deposited.
pub const KEEP_LIST: [&str; 2] = ["food", "arrow"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    Melee,
    Ranged,
    Ammo,
}

impl WeaponKind {
    fn categories(&self) -> &'static [&'static str] {
        match self {
            WeaponKind::Melee => &["sword", "axe"],
            WeaponKind::Ranged => &["bow"],
            WeaponKind::Ammo => &["arrow"],
        }
    }
}

/// Whether `item` belongs to `category`. Food is decided by the inventory.
pub fn matches_category(inventory: &dyn Inventory, category: &str, item: &Item) -> bool {
    item.is_a(category) || (category == "food" && inventory.is_food(&item.name))
}

fn held_items(inventory: &dyn Inventory, include_equipment: bool) -> Vec<Item> {
    let mut items = if include_equipment {
        inventory.equipment()
    } else {
        Vec::new()
    };
    items.extend(inventory.items());
    items
}

/// Highest-tier tool among `types`. Equal tiers fall back to the order of `types`.
pub fn best_tool(items: &[Item], types: &[&str]) -> Option<Item> {
    TOOL_TIERS.iter().find_map(|tier| {
        types.iter().find_map(|kind| {
            let name = format!("{tier}_{kind}");
            items.iter().find(|item| item.name == name).cloned()
        })
    })
}

/// Equip the best tool of `types`, if any is carried.
pub async fn equip_best_tool(inventory: &dyn Inventory, types: &[&str]) -> Result<Option<Item>> {
    let Some(tool) = best_tool(&inventory.items(), types) else {
        return Ok(None);
    };
    inventory.equip(&tool).await?;
    Ok(Some(tool))
}

pub fn has_weapon(inventory: &dyn Inventory, kind: WeaponKind) -> bool {
    held_items(inventory, true)
        .iter()
        .any(|item| kind.categories().iter().any(|c| item.is_a(c)))
}

pub fn find_food(inventory: &dyn Inventory) -> Option<Item> {
    held_items(inventory, true)
        .into_iter()
        .find(|item| matches_category(inventory, "food", item))
}

pub fn item_named(inventory: &dyn Inventory, name: &str) -> Option<Item> {
    inventory.items().into_iter().find(|item| item.name == name)
}

pub fn ranged_weapon(inventory: &dyn Inventory) -> Option<Item> {
    inventory
        .items()
        .into_iter()
        .find(|item| item.name == "bow" || item.name == "crossbow")
}

/// Put a bow or crossbow in hand. Returns what was equipped.
pub async fn equip_ranged(inventory: &dyn Inventory) -> Result<Option<Item>> {
    let Some(weapon) = ranged_weapon(inventory) else {
        return Ok(None);
    };
    inventory.equip(&weapon).await?;
    Ok(Some(weapon))
}

/// Store everything outside [`KEEP_LIST`] in the container at `at`.
///
/// Stops at the first failed transfer. Returns the number of stacks stored.
pub async fn deposit_items(
    inventory: &dyn Inventory,
    motion: &dyn Motion,
    at: Position,
    settle: Duration,
) -> Result<usize> {
    motion.look_at(at);
    let Some(mut container) = inventory.open_container(at).await else {
        debug!(at = %at, "No container to deposit into");
        return Ok(0);
    };
    tokio::time::sleep(settle).await;

    let to_store: Vec<Item> = held_items(inventory, false)
        .into_iter()
        .filter(|item| !KEEP_LIST.iter().any(|c| matches_category(inventory, c, item)))
        .collect();

    let mut stored = 0;
    for item in &to_store {
        if let Err(e) = container.deposit(item, item.count).await {
            warn!(item = %item.name, "Deposit failed: {e}");
            break;
        }
        stored += 1;
    }

    container.close();
    Ok(stored)
}

/// Take what the agent is missing from the container at `at`.
///
/// Wanted categories are [`PULL_LIST`] plus `extra`, minus what is already
/// held. Arrows are only taken alongside a ranged weapon, held or withdrawn
/// now. Each category takes at most its withdraw cap. Returns the number of
/// stacks taken.
pub async fn withdraw_items(
    inventory: &dyn Inventory,
    motion: &dyn Motion,
    at: Position,
    extra: &[String],
    behavior: &BehaviorConfig,
) -> Result<usize> {
    motion.look_at(at);
    let Some(mut container) = inventory.open_container(at).await else {
        debug!(at = %at, "No container to withdraw from");
        return Ok(0);
    };
    tokio::time::sleep(behavior.container_settle()).await;

    let held = held_items(inventory, true);
    let mut wanted: Vec<String> = PULL_LIST.iter().map(|c| c.to_string()).collect();
    for item in extra {
        if !wanted.contains(item) {
            wanted.push(item.clone());
        }
    }
    wanted.retain(|category| !held.iter().any(|i| matches_category(inventory, category, i)));

    let mut picks: Vec<(String, Item)> = Vec::new();
    for chest_item in container.items() {
        if let Some(index) = wanted
            .iter()
            .position(|category| matches_category(inventory, category, &chest_item))
        {
            picks.push((wanted.remove(index), chest_item));
        }
    }

    let ranged_available = has_weapon(inventory, WeaponKind::Ranged)
        || picks.iter().any(|(_, item)| item.is_a("bow"));
    if !ranged_available {
        picks.retain(|(category, _)| category != "arrow");
    }

    let mut taken = 0;
    for (category, item) in &picks {
        let count = item.count.min(behavior.withdraw_cap(category));
        match container.withdraw(item, count).await {
            Ok(()) => taken += 1,
            Err(e) => warn!(item = %item.name, "Withdraw failed: {e}"),
        }
    }

    container.close();
    Ok(taken)
}
