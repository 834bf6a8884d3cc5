//! `wardens doctor`: Diagnose configuration health.

use std::path::Path;

use wardens_config::AppConfig;

/// Problems found with the config at `path`, one line each.
pub fn diagnose(path: &Path) -> Vec<String> {
    let mut issues = Vec::new();

    if !path.exists() {
        issues.push("No config file — run `wardens onboard`".to_string());
        return issues;
    }

    let config = match AppConfig::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            issues.push(format!("Config file invalid: {e}"));
            return issues;
        }
    };

    if config.agents.is_empty() {
        issues.push("Roster is empty — add an [[agents]] entry".to_string());
    }
    if config.agents.iter().all(|entry| entry.home.is_none()) && !config.agents.is_empty() {
        issues.push("No agent has a home; homes will be set at first spawn".to_string());
    }
    if !config.behavior.chatty {
        issues.push("behavior.chatty is off; agents will not answer in chat".to_string());
    }

    issues
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Wardens Doctor — Configuration Diagnostics");
    println!("============================================\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    let issues = diagnose(&config_path);

    if issues.is_empty() {
        println!("  ✅ Config file valid");
        println!("  ✅ Roster configured");
        println!("\n  🎉 All checks passed!");
    } else {
        for issue in &issues {
            println!("  ⚠️  {issue}");
        }
        println!("\n  ⚠️  {} issue(s) found. See above for details.", issues.len());
    }

    Ok(())
}
