//! Prepackaged module bundles, one per persona.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use wardens_core::Persona;

use super::engine::{Bundle, DecisionModule};
use super::modules::*;

/// Always evaluated after the persona bundle.
pub fn standard() -> Bundle {
    vec![
        Arc::new(AttackAdjacentEnemies),
        Arc::new(TrySleeping),
        Arc::new(ForceEat),
    ]
}

/// Idle filler for agents without a job.
pub fn boredom() -> Bundle {
    vec![
        Arc::new(LookAtSomething),
        Arc::new(GoHome),
        Arc::new(CheckStorage),
        Arc::new(CollectItems::idle()),
        Arc::new(VisitBlock::new("bell")),
    ]
}

pub fn guard() -> Bundle {
    vec![
        Arc::new(UnarmedComplaint),
        Arc::new(DefendHome),
        Arc::new(ReturnToPost),
        Arc::new(CollectItems::tidy_up()),
    ]
}

pub fn farmer() -> Bundle {
    vec![
        Arc::new(HarvestField),
        Arc::new(SowField),
        Arc::new(CollectItems::idle()),
        Arc::new(DepositItems),
        Arc::new(VisitBlock::new("composter")),
    ]
}

pub fn loot() -> Bundle {
    vec![Arc::new(LootDrops)]
}

pub fn follower() -> Bundle {
    vec![Arc::new(FollowLeader)]
}

/// A module as shown by `wardens bundles`.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub chance: f64,
    pub continues: bool,
}

/// Persona to bundle mapping. Personas without an entry get boredom.
#[derive(Clone)]
pub struct BundleSet {
    standard: Bundle,
    boredom: Bundle,
    personas: HashMap<Persona, Bundle>,
}

impl Default for BundleSet {
    fn default() -> Self {
        Self::stock()
    }
}

impl BundleSet {
    pub fn stock() -> Self {
        let personas = HashMap::from([
            (Persona::Guard, guard()),
            (Persona::Farmer, farmer()),
            (Persona::Loot, loot()),
            (Persona::Follower, follower()),
        ]);
        Self {
            standard: standard(),
            boredom: boredom(),
            personas,
        }
    }

    /// Empty everywhere. Useful for driving an agent by hand.
    pub fn empty() -> Self {
        Self {
            standard: Vec::new(),
            boredom: Vec::new(),
            personas: HashMap::new(),
        }
    }

    pub fn with_standard(mut self, bundle: Bundle) -> Self {
        self.standard = bundle;
        self
    }

    pub fn with_boredom(mut self, bundle: Bundle) -> Self {
        self.boredom = bundle;
        self
    }

    pub fn with_persona(mut self, persona: Persona, bundle: Bundle) -> Self {
        self.personas.insert(persona, bundle);
        self
    }

    pub fn standard(&self) -> &[Arc<dyn DecisionModule>] {
        &self.standard
    }

    pub fn for_persona(&self, persona: Persona) -> &[Arc<dyn DecisionModule>] {
        self.personas.get(&persona).unwrap_or(&self.boredom)
    }

    pub fn describe(bundle: &[Arc<dyn DecisionModule>]) -> Vec<ModuleInfo> {
        bundle
            .iter()
            .map(|module| ModuleInfo {
                name: module.name().to_string(),
                chance: module.chance(),
                continues: module.continues(),
            })
            .collect()
    }
}
