//! Tasks: discrete units of intent an agent commits to completing.
//!
//! A task is immutable once enqueued. Follow-up behavior is expressed by
//! building new task values, never by mutating a queued one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::geometry::Position;
use crate::world::EntityId;

/// Default container block names searched by [`Task::FindContainer`].
pub const DEFAULT_CONTAINER_BLOCKS: &[&str] = &["chest", "barrel"];

/// Everything an agent can be asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Walk to a player.
    Come {
        username: String,
        #[serde(default)]
        one_time: bool,
        #[serde(default)]
        set_home: bool,
    },
    /// Fight. Without a target, the nearest reachable hostile.
    Hunt {
        #[serde(default)]
        target: Option<EntityId>,
        #[serde(default)]
        force_melee: bool,
        #[serde(default)]
        verbose: bool,
    },
    /// Go back to the home point.
    Return,
    Visit {
        position: Position,
    },
    /// Pick up dropped items nearby.
    Collect {
        #[serde(default)]
        verbose: bool,
    },
    FindContainer(ContainerSearch),
    Withdraw {
        position: Position,
        #[serde(default)]
        items: Vec<String>,
        #[serde(default)]
        verbose: bool,
    },
    Deposit {
        position: Position,
        #[serde(default)]
        verbose: bool,
    },
    SetHome,
    Sleep,
    Eat,
    /// Activity label shown while a decision module runs.
    PersonaTask {
        description: String,
    },
}

/// Field-less discriminant of [`Task`], used by queue predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Come,
    Hunt,
    Return,
    Visit,
    Collect,
    FindContainer,
    Withdraw,
    Deposit,
    SetHome,
    Sleep,
    Eat,
    PersonaTask,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Come { .. } => TaskKind::Come,
            Task::Hunt { .. } => TaskKind::Hunt,
            Task::Return => TaskKind::Return,
            Task::Visit { .. } => TaskKind::Visit,
            Task::Collect { .. } => TaskKind::Collect,
            Task::FindContainer(_) => TaskKind::FindContainer,
            Task::Withdraw { .. } => TaskKind::Withdraw,
            Task::Deposit { .. } => TaskKind::Deposit,
            Task::SetHome => TaskKind::SetHome,
            Task::Sleep => TaskKind::Sleep,
            Task::Eat => TaskKind::Eat,
            Task::PersonaTask { .. } => TaskKind::PersonaTask,
        }
    }

    /// Hunt the nearest hostile.
    pub fn hunt() -> Self {
        Task::Hunt {
            target: None,
            force_melee: false,
            verbose: false,
        }
    }

    pub fn come(username: impl Into<String>) -> Self {
        Task::Come {
            username: username.into(),
            one_time: false,
            set_home: false,
        }
    }

    pub fn visit(position: Position) -> Self {
        Task::Visit { position }
    }

    pub fn collect() -> Self {
        Task::Collect { verbose: false }
    }

    /// Short human label: the persona-task description or the kind.
    pub fn label(&self) -> String {
        match self {
            Task::PersonaTask { description } => description.clone(),
            other => other.kind().to_string(),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Come => "come",
            TaskKind::Hunt => "hunt",
            TaskKind::Return => "return",
            TaskKind::Visit => "visit",
            TaskKind::Collect => "collect",
            TaskKind::FindContainer => "find_container",
            TaskKind::Withdraw => "withdraw",
            TaskKind::Deposit => "deposit",
            TaskKind::SetHome => "set_home",
            TaskKind::Sleep => "sleep",
            TaskKind::Eat => "eat",
            TaskKind::PersonaTask => "persona_task",
        };
        f.write_str(name)
    }
}

/// Parameters of a container search.
///
/// When a container is found, the executor enqueues the transfer tasks and,
/// for `multiple` searches, a fresh search whose `visited` set includes the
/// container just handled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerSearch {
    /// `Some(extra)` pulls the default list plus `extra`. `None` withdraws nothing.
    #[serde(default)]
    pub withdraw: Option<Vec<String>>,
    #[serde(default)]
    pub deposit: bool,
    /// Keep searching other containers after this one.
    #[serde(default)]
    pub multiple: bool,
    /// Block names to look for; empty means chests and barrels.
    #[serde(default)]
    pub block_names: Vec<String>,
    /// Position keys of containers already handled in this search chain.
    #[serde(default)]
    pub visited: BTreeSet<String>,
    #[serde(default)]
    pub range: Option<f64>,
    #[serde(default)]
    pub ignore_y: bool,
    #[serde(default)]
    pub verbose: bool,
}

impl ContainerSearch {
    /// Pull the default item list (plus `extra`).
    pub fn withdrawing(extra: Vec<String>) -> Self {
        Self {
            withdraw: Some(extra),
            ..Self::default()
        }
    }

    pub fn depositing() -> Self {
        Self {
            deposit: true,
            ..Self::default()
        }
    }

    /// Walk to the nearest block with one of `names` and do nothing else.
    pub fn visiting(names: Vec<String>) -> Self {
        Self {
            block_names: names,
            ..Self::default()
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn ignoring_y(mut self) -> Self {
        self.ignore_y = true;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Block names to match, falling back to chests and barrels.
    pub fn names(&self) -> Vec<String> {
        if self.block_names.is_empty() {
            DEFAULT_CONTAINER_BLOCKS.iter().map(|s| s.to_string()).collect()
        } else {
            self.block_names.clone()
        }
    }

    /// The follow-up search after handling the container at `handled`.
    pub fn continued_after(&self, handled: &Position) -> Self {
        let mut next = self.clone();
        next.visited.insert(handled.key());
        next
    }
}

impl From<ContainerSearch> for Task {
    fn from(search: ContainerSearch) -> Self {
        Task::FindContainer(search)
    }
}
