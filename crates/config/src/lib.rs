//! Configuration loading, validation, and management for Wardens.
//!
//! Loads configuration from `~/.wardens/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Every timing and distance the agent crate uses lives here, so a whole
//! team can be retuned without touching code.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use wardens_core::{Persona, Position};

/// Rate limiter keys used by the agent's decision modules and handlers.
pub mod limit_keys {
    pub const CHECK_STORAGE: &str = "check_storage";
    pub const FIND_SEEDS: &str = "find_seeds";
    pub const UNARMED_GUARD: &str = "unarmed_guard";
    pub const FIND_BED: &str = "find_bed";
    pub const DEMAND_HELP: &str = "demand_help";
}

/// The root configuration structure.
///
/// Maps directly to `~/.wardens/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persona for roster entries that do not name one
    #[serde(default)]
    pub default_persona: Persona,

    /// Tick pacing
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Goal polling and give-up thresholds
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Engagement ranges and strike pacing
    #[serde(default)]
    pub combat: CombatConfig,

    /// Home radius, inventory thresholds, and other persona tuning
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Per-key call windows
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Cross-agent messaging
    #[serde(default)]
    pub team: TeamConfig,

    /// Agents to run
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
}

fn default_true() -> bool {
    true
}

// ── Scheduler ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay after an idle tick
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Delay after a tick that ran a task
    #[serde(default = "default_busy_delay_ms")]
    pub busy_delay_ms: u64,

    /// Delay while the agent is listening or asleep
    #[serde(default = "default_blocked_delay_ms")]
    pub blocked_delay_ms: u64,
}

fn default_idle_delay_ms() -> u64 {
    2000
}
fn default_busy_delay_ms() -> u64 {
    500
}
fn default_blocked_delay_ms() -> u64 {
    4000
}

impl SchedulerConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }
    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }
    pub fn blocked_delay(&self) -> Duration {
        Duration::from_millis(self.blocked_delay_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: default_idle_delay_ms(),
            busy_delay_ms: default_busy_delay_ms(),
            blocked_delay_ms: default_blocked_delay_ms(),
        }
    }
}

// ── Navigation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up after this long regardless of motion
    #[serde(default = "default_nav_timeout_ms")]
    pub timeout_ms: u64,

    /// Consecutive polls at the same block before giving up
    #[serde(default = "default_stall_polls")]
    pub stall_polls: u32,

    /// Acceptance radius for "close enough to interact"
    #[serde(default = "default_near_range")]
    pub near_range: f64,
}

fn default_poll_interval_ms() -> u64 {
    500
}
fn default_nav_timeout_ms() -> u64 {
    10_000
}
fn default_stall_polls() -> u32 {
    2
}
fn default_near_range() -> f64 {
    2.0
}

impl NavigationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_nav_timeout_ms(),
            stall_polls: default_stall_polls(),
            near_range: default_near_range(),
        }
    }
}

// ── Combat ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Standard search and pursuit range
    #[serde(default = "default_range")]
    pub range: f64,

    #[serde(default = "default_melee_range")]
    pub melee_range: f64,

    /// Farthest distance to shoot from
    #[serde(default = "default_shoot_range")]
    pub shoot_range: f64,

    /// Closer than this always falls back to melee
    #[serde(default = "default_min_shoot_distance")]
    pub min_shoot_distance: f64,

    #[serde(default = "default_strike_interval_ms")]
    pub strike_interval_ms: u64,

    /// Pace of point-blank retaliation
    #[serde(default = "default_wild_interval_ms")]
    pub wild_interval_ms: u64,

    /// Retaliation only continues while the aggressor is this close
    #[serde(default = "default_wild_radius")]
    pub wild_radius: f64,

    /// Pursuit range when retaliation falls back to a full attack
    #[serde(default = "default_wild_fallback_range")]
    pub wild_fallback_range: f64,

    /// Upper bound on strike rounds per engagement
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_range() -> f64 {
    30.0
}
fn default_melee_range() -> f64 {
    4.0
}
fn default_shoot_range() -> f64 {
    10.0
}
fn default_min_shoot_distance() -> f64 {
    5.0
}
fn default_strike_interval_ms() -> u64 {
    500
}
fn default_wild_interval_ms() -> u64 {
    800
}
fn default_wild_radius() -> f64 {
    5.0
}
fn default_wild_fallback_range() -> f64 {
    7.0
}
fn default_max_rounds() -> u32 {
    40
}

impl CombatConfig {
    pub fn strike_interval(&self) -> Duration {
        Duration::from_millis(self.strike_interval_ms)
    }
    pub fn wild_interval(&self) -> Duration {
        Duration::from_millis(self.wild_interval_ms)
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            range: default_range(),
            melee_range: default_melee_range(),
            shoot_range: default_shoot_range(),
            min_shoot_distance: default_min_shoot_distance(),
            strike_interval_ms: default_strike_interval_ms(),
            wild_interval_ms: default_wild_interval_ms(),
            wild_radius: default_wild_radius(),
            wild_fallback_range: default_wild_fallback_range(),
            max_rounds: default_max_rounds(),
        }
    }
}

// ── Behavior ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// How far normal duties may stray from home
    #[serde(default = "default_home_range")]
    pub home_range: f64,

    /// Farther than this from home counts as "away"
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f64,

    /// Auto-deposit when fewer empty slots remain after a pickup
    #[serde(default = "default_inventory_reserve")]
    pub inventory_reserve: usize,

    /// Farmers deposit when fewer empty slots remain
    #[serde(default = "default_deposit_threshold")]
    pub deposit_threshold: usize,

    /// Below this health, damage triggers a call for help
    #[serde(default = "default_low_health")]
    pub low_health: f32,

    /// Below this food level, eating is considered
    #[serde(default = "default_hunger_threshold")]
    pub hunger_threshold: f32,

    #[serde(default = "default_death_block_ms")]
    pub death_block_ms: u64,

    /// Wait after opening a container before reading it
    #[serde(default = "default_container_settle_ms")]
    pub container_settle_ms: u64,

    /// Never take more of one item than this unless overridden
    #[serde(default = "default_max_withdraw")]
    pub max_withdraw: u32,

    #[serde(default = "default_withdraw_overrides")]
    pub withdraw_overrides: HashMap<String, u32>,

    /// How far to look for a free bed
    #[serde(default = "default_bed_search_range")]
    pub bed_search_range: f64,

    /// Say what the agent is doing in chat
    #[serde(default = "default_true")]
    pub chatty: bool,
}

fn default_home_range() -> f64 {
    100.0
}
fn default_wander_radius() -> f64 {
    10.0
}
fn default_inventory_reserve() -> usize {
    4
}
fn default_deposit_threshold() -> usize {
    5
}
fn default_low_health() -> f32 {
    8.0
}
fn default_hunger_threshold() -> f32 {
    10.0
}
fn default_death_block_ms() -> u64 {
    5000
}
fn default_container_settle_ms() -> u64 {
    1000
}
fn default_max_withdraw() -> u32 {
    10
}
fn default_withdraw_overrides() -> HashMap<String, u32> {
    HashMap::from([("arrow".to_string(), 64)])
}
fn default_bed_search_range() -> f64 {
    100.0
}

impl BehaviorConfig {
    pub fn death_block(&self) -> Duration {
        Duration::from_millis(self.death_block_ms)
    }
    pub fn container_settle(&self) -> Duration {
        Duration::from_millis(self.container_settle_ms)
    }

    /// Withdrawal cap for an item category.
    pub fn withdraw_cap(&self, category: &str) -> u32 {
        self.withdraw_overrides
            .get(category)
            .copied()
            .unwrap_or(self.max_withdraw)
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            home_range: default_home_range(),
            wander_radius: default_wander_radius(),
            inventory_reserve: default_inventory_reserve(),
            deposit_threshold: default_deposit_threshold(),
            low_health: default_low_health(),
            hunger_threshold: default_hunger_threshold(),
            death_block_ms: default_death_block_ms(),
            container_settle_ms: default_container_settle_ms(),
            max_withdraw: default_max_withdraw(),
            withdraw_overrides: default_withdraw_overrides(),
            bed_search_range: default_bed_search_range(),
            chatty: true,
        }
    }
}

// ── Rate limits ────────────────────────────────────────────────────────────

/// At most `max` calls per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub window_ms: u64,
    pub max: u32,
}

impl RateLimitRule {
    pub const fn new(window_ms: u64, max: u32) -> Self {
        Self { window_ms, max }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Rule for keys without their own entry
    #[serde(default = "default_rate_rule")]
    pub default: RateLimitRule,

    #[serde(default = "default_rate_keys")]
    pub keys: HashMap<String, RateLimitRule>,
}

fn default_rate_rule() -> RateLimitRule {
    RateLimitRule::new(60_000, 1)
}

fn default_rate_keys() -> HashMap<String, RateLimitRule> {
    const MINUTE: u64 = 60_000;
    HashMap::from([
        (limit_keys::CHECK_STORAGE.to_string(), RateLimitRule::new(5 * MINUTE, 1)),
        (limit_keys::FIND_SEEDS.to_string(), RateLimitRule::new(10 * MINUTE, 1)),
        (limit_keys::UNARMED_GUARD.to_string(), RateLimitRule::new(30 * MINUTE, 1)),
        (limit_keys::FIND_BED.to_string(), RateLimitRule::new(600 * MINUTE, 1)),
        (limit_keys::DEMAND_HELP.to_string(), RateLimitRule::new(30_000, 1)),
    ])
}

impl RateLimitConfig {
    /// Rule for `key`, falling back to the default.
    pub fn rule_for(&self, key: &str) -> RateLimitRule {
        self.keys.get(key).copied().unwrap_or(self.default)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: default_rate_rule(),
            keys: default_rate_keys(),
        }
    }
}

// ── Team ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Ignore team messages from senders farther away than this
    #[serde(default = "default_proximity")]
    pub proximity: f64,

    /// Broadcast channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_proximity() -> f64 {
    30.0
}
fn default_channel_capacity() -> usize {
    64
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            proximity: default_proximity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

// ── Roster ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Position>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.wardens/config.toml).
    ///
    /// Environment overrides:
    /// - `WARDENS_PERSONA` replaces the default persona
    /// - `WARDENS_TEAM_PROXIMITY` replaces the team proximity
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `WARDENS_*` overrides, reading variables through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(persona) = lookup("WARDENS_PERSONA") {
            self.default_persona = persona.parse().map_err(ConfigError::ValidationError)?;
        }

        if let Some(proximity) = lookup("WARDENS_TEAM_PROXIMITY") {
            self.team.proximity = proximity.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "WARDENS_TEAM_PROXIMITY is not a number: {proximity}"
                ))
            })?;
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wardens")
    }

    /// Persona for a roster entry.
    pub fn persona_for(&self, entry: &AgentEntry) -> Persona {
        entry.persona.unwrap_or(self.default_persona)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("scheduler.idle_delay_ms", self.scheduler.idle_delay_ms),
            ("scheduler.busy_delay_ms", self.scheduler.busy_delay_ms),
            ("scheduler.blocked_delay_ms", self.scheduler.blocked_delay_ms),
            ("navigation.poll_interval_ms", self.navigation.poll_interval_ms),
            ("combat.strike_interval_ms", self.combat.strike_interval_ms),
            ("combat.wild_interval_ms", self.combat.wild_interval_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
            }
        }

        if self.navigation.timeout_ms < self.navigation.poll_interval_ms {
            return Err(ConfigError::ValidationError(
                "navigation.timeout_ms must be at least one poll interval".into(),
            ));
        }

        if self.navigation.near_range <= 0.0 || self.combat.melee_range <= 0.0 {
            return Err(ConfigError::ValidationError(
                "near_range and melee_range must be > 0".into(),
            ));
        }

        if self.combat.min_shoot_distance >= self.combat.shoot_range {
            return Err(ConfigError::ValidationError(
                "combat.min_shoot_distance must be below combat.shoot_range".into(),
            ));
        }

        if self.team.proximity <= 0.0 || self.team.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "team.proximity and team.channel_capacity must be > 0".into(),
            ));
        }

        let rules = std::iter::once(("default", &self.rate_limits.default)).chain(
            self.rate_limits
                .keys
                .iter()
                .map(|(key, rule)| (key.as_str(), rule)),
        );
        for (key, rule) in rules {
            if rule.max == 0 || rule.window_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "rate limit '{key}' needs max > 0 and window_ms > 0"
                )));
            }
        }

        let mut names = HashSet::new();
        for entry in &self.agents {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::ValidationError("agent names must not be empty".into()));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate agent name: {}",
                    entry.name
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self {
            agents: vec![AgentEntry {
                name: "Warden".into(),
                persona: Some(Persona::Guard),
                home: None,
            }],
            ..Self::default()
        };
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_persona: Persona::None,
            scheduler: SchedulerConfig::default(),
            navigation: NavigationConfig::default(),
            combat: CombatConfig::default(),
            behavior: BehaviorConfig::default(),
            rate_limits: RateLimitConfig::default(),
            team: TeamConfig::default(),
            agents: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for wardens_core::Error {
    fn from(err: ConfigError) -> Self {
        wardens_core::Error::Config {
            message: err.to_string(),
        }
    }
}
