//! `taskling init` — First-time setup.

use taskling_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📋 Taskling — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("   Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        let default_toml = AppConfig::default_toml();
        std::fs::write(&config_path, &default_toml)?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add your model API key under [model] (or set TASKLING_API_KEY)");
        println!("   2. Map at least one bearer token under [auth.tokens]:");
        println!("      \"tok_some_long_random_string\" = \"your-user-id\"");
        println!("   3. Run: taskling serve");
        println!("   4. POST /v1/chat with that bearer token and start delegating!\n");
    }

    Ok(())
}
