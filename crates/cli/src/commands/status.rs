//! `wardens status`: Show the configured roster.

use wardens_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🛡️  Wardens Status");
    println!("=================");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!("  Default persona: {}", config.default_persona);
    println!(
        "  Tick delays:     idle {}ms / busy {}ms / blocked {}ms",
        config.scheduler.idle_delay_ms,
        config.scheduler.busy_delay_ms,
        config.scheduler.blocked_delay_ms
    );
    println!("  Team proximity:  {}", config.team.proximity);
    println!("  Chatty:          {}", if config.behavior.chatty { "yes" } else { "no" });

    println!("\n  Roster ({}):", config.agents.len());
    if config.agents.is_empty() {
        println!("    (empty — add [[agents]] entries to config.toml)");
    }
    for entry in &config.agents {
        let home = entry
            .home
            .map(|h| h.to_string())
            .unwrap_or_else(|| "spawn point".into());
        println!(
            "    {:<16} {:<10} home: {home}",
            entry.name,
            config.persona_for(entry)
        );
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `wardens onboard` first");
    }

    Ok(())
}
