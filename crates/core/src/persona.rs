//! Personas, attack modes, and the small persisted agent record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geometry::Position;

/// Operating mode selecting which decision bundle runs when the queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// No assignment: boredom filler only.
    #[default]
    #[serde(rename = "normal")]
    None,
    Guard,
    Farmer,
    Loot,
    Follower,
    Lookout,
    Miner,
}

impl Persona {
    pub const ALL: [Persona; 7] = [
        Persona::None,
        Persona::Guard,
        Persona::Farmer,
        Persona::Loot,
        Persona::Follower,
        Persona::Lookout,
        Persona::Miner,
    ];

    /// Whether wandering too far from home should pull the agent back.
    pub fn returns_home(&self) -> bool {
        !matches!(self, Persona::None | Persona::Follower)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::None => "normal",
            Persona::Guard => "guard",
            Persona::Farmer => "farmer",
            Persona::Loot => "loot",
            Persona::Follower => "follower",
            Persona::Lookout => "lookout",
            Persona::Miner => "miner",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "none" | "" => Ok(Persona::None),
            "guard" => Ok(Persona::Guard),
            "farmer" | "farm" => Ok(Persona::Farmer),
            "loot" | "looter" => Ok(Persona::Loot),
            "follower" | "follow" => Ok(Persona::Follower),
            "lookout" => Ok(Persona::Lookout),
            "miner" => Ok(Persona::Miner),
            other => Err(format!("unknown persona: {other}")),
        }
    }
}

/// Preference for how fights are fought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackMode {
    /// Ranged when eligible, melee otherwise.
    #[default]
    Normal,
    /// Melee only.
    Melee,
    /// No ranged attacks. Ordered hunts still melee.
    Peace,
}

impl AttackMode {
    pub fn allows_ranged(&self) -> bool {
        matches!(self, AttackMode::Normal)
    }
}

/// The part of an agent that outlives a process: home point and persona.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(default)]
    pub home_point: Option<Position>,
    #[serde(default)]
    pub persona: Persona,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unassigned_and_followers_roam() {
        assert!(!Persona::None.returns_home());
        assert!(!Persona::Follower.returns_home());
        assert!(Persona::Guard.returns_home());
        assert!(Persona::Farmer.returns_home());
        assert!(Persona::Miner.returns_home());
    }

    #[test]
    fn persona_parses_aliases() {
        assert_eq!("Farm".parse::<Persona>().unwrap(), Persona::Farmer);
        assert_eq!("normal".parse::<Persona>().unwrap(), Persona::None);
        assert!("wizard".parse::<Persona>().is_err());
    }

    #[test]
    fn record_roundtrips_json() {
        let record = AgentRecord {
            home_point: Some(Position::new(1.0, 64.0, -2.0)),
            persona: Persona::Guard,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"guard\""));
        let back: AgentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unassigned_persona_serializes_as_normal() {
        assert_eq!(serde_json::to_string(&Persona::None).unwrap(), "\"normal\"");
    }
}
