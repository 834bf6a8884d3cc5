//! `wardens config`: Configuration management commands.

use wardens_config::AppConfig;

/// Settings that load fine but probably do not do what was intended.
pub fn warnings_for(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.combat.range < config.combat.shoot_range {
        warnings.push("combat.range is below shoot_range; distant targets are never engaged");
    }

    if config.behavior.bed_search_range > config.behavior.home_range {
        warnings.push("behavior.bed_search_range reaches beyond home_range");
    }

    if config.behavior.deposit_threshold <= config.behavior.inventory_reserve {
        warnings.push("behavior.deposit_threshold should exceed inventory_reserve");
    }

    warnings
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings_for(&config);

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Persona:   {}", config.default_persona);
            println!("   Home:      {} blocks", config.behavior.home_range);
            println!("   Team:      {} blocks", config.team.proximity);
            println!("   Agents:    {}", config.agents.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardens_config::CombatConfig;

    #[test]
    fn short_pursuit_range_is_flagged() {
        let config = AppConfig {
            combat: CombatConfig {
                range: 8.0,
                ..CombatConfig::default()
            },
            ..AppConfig::default()
        };
        let warnings = warnings_for(&config);
        assert!(warnings.iter().any(|w| w.starts_with("combat.range")));
        assert!(!warnings_for(&AppConfig::default())
            .iter()
            .any(|w| w.starts_with("combat.range")));
    }

    #[test]
    fn config_path_is_valid() {
        let path = wardens_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".wardens"));
    }
}
