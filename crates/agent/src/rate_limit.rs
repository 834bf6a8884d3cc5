//! Keyed, windowed call gate.
//!
//! Built from [`RateLimitConfig`] and owned by one agent. A record is
//! created on the first call for a key and reset once its window has
//! elapsed. Exhaustion is a normal `false`, never an error.

use std::collections::HashMap;

use tokio::time::Instant;
use wardens_config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    window_start: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    records: HashMap<String, WindowRecord>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    /// Count a call against `key` (scoped by `id` when given) and report
    /// whether it is allowed.
    pub fn try_call(&mut self, key: &str, id: Option<&str>) -> bool {
        let rule = self.config.rule_for(key);
        let record_key = match id {
            Some(id) => format!("{key}-{id}"),
            None => key.to_string(),
        };
        let now = Instant::now();

        let record = self.records.entry(record_key).or_insert(WindowRecord {
            window_start: now,
            count: 0,
        });

        if now.duration_since(record.window_start) > rule.window() {
            *record = WindowRecord {
                window_start: now,
                count: 0,
            };
        }

        if record.count >= rule.max {
            return false;
        }
        record.count += 1;
        true
    }

    /// Forget every record.
    pub fn reset(&mut self) {
        self.records.clear();
    }
}
