//! `wardens onboard`: First-time setup.

use std::path::{Path, PathBuf};

use wardens_config::AppConfig;

/// Write the default config into `config_dir`. Returns `None` when a config
/// already exists there.
pub fn write_default(config_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        return Ok(None);
    }
    std::fs::create_dir_all(config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    Ok(Some(config_path))
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("🛡️  Wardens — First-Time Setup");
    println!("=============================\n");

    match write_default(&config_dir)? {
        Some(config_path) => {
            println!("✅ Created config.toml at: {}", config_path.display());
            println!("\n📝 Next steps:");
            println!("   1. Edit the [[agents]] roster in {}", config_path.display());
            println!("   2. Run: wardens doctor");
            println!("   3. Run: wardens bundles to see what each persona does\n");
        }
        None => {
            let config_path = config_dir.join("config.toml");
            println!("⚠️  Config already exists at: {}", config_path.display());
            println!("   Edit it manually or delete and re-run onboard.\n");
        }
    }

    Ok(())
}
