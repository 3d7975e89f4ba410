//! `giftbot onboard` — first-time setup.

use std::path::PathBuf;

use giftbot_config::AppConfig;

pub fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("🎲 giftbot — First-Time Setup");
    println!("=============================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty())
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("✅ Created config directory: {}", dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Pick a channel (`cli` to play locally, `discord` for a server)");
    println!("   2. For Discord, set `discord.bot_token` or export BOT_TOKEN");
    println!("   3. Run `giftbot run`");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        run(Some(path.clone())).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.channel, "cli");
        assert_eq!(config.scheduler.tick_seconds, 5);

        std::fs::write(&path, "channel = \"discord\"\n").unwrap();
        run(Some(path.clone())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "channel = \"discord\"\n");
    }
}
