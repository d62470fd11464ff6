//! `taskling serve` — Start the HTTP API server.

use tracing::info;

use taskling_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("📋 Taskling Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {}", config.store.backend);
    println!("   Model:     {} via {}", config.model.model, config.model.base_url);
    println!("   Users:     {} token(s) configured", config.auth.tokens.len());

    info!(
        backend = %config.store.backend,
        model = %config.model.model,
        users = config.auth.tokens.len(),
        "Configuration loaded"
    );

    // Start gateway (this blocks)
    taskling_gateway::start(config).await?;

    Ok(())
}
