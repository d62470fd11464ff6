//! `taskling doctor` — Diagnose system health.

use taskling_config::AppConfig;
use taskling_core::ModelClient;
use taskling_model::OpenAiCompatClient;

/// Request timeout for the diagnostic model ping, in seconds. Deliberately
/// shorter than the serving timeout; a diagnosis should not hang.
const PING_TIMEOUT_SECS: u64 = 10;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Taskling Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    // Check config file
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file — run `taskling init` (running on defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the config file and re-run `taskling doctor`.");
            return Ok(());
        }
    };

    // Check API key
    if config.has_api_key() {
        println!("  ✅ Model API key configured");
    } else {
        println!("  ⚠️  No model API key — set TASKLING_API_KEY or [model] api_key");
        issues += 1;
    }

    // Check auth tokens
    if config.auth.tokens.is_empty() {
        println!("  ⚠️  No [auth.tokens] entries — every /v1 request will be rejected");
        issues += 1;
    } else {
        println!(
            "  ✅ Bearer tokens configured ({} user(s))",
            config.auth.tokens.len()
        );
    }

    // Check model endpoint
    let model = OpenAiCompatClient::new(
        config.model.base_url.clone(),
        config.model.api_key.clone().unwrap_or_default(),
        PING_TIMEOUT_SECS,
    );
    match model.health_check().await {
        Ok(true) => println!("  ✅ Model endpoint reachable: {}", config.model.base_url),
        Ok(false) => {
            println!(
                "  ⚠️  Model endpoint answered with an error status: {}",
                config.model.base_url
            );
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Model endpoint unreachable: {e}");
            issues += 1;
        }
    }

    // Check store backend: connecting runs the migrations, so a pass here
    // means `serve` will come up against the same backend.
    match taskling_store::build_from_config(&config.store).await {
        Ok(_) => println!("  ✅ Store reachable ({})", config.store.backend),
        Err(e) => {
            println!("  ❌ Store check failed: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
