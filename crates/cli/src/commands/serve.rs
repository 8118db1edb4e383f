//! `mastermind serve` — Start the HTTP API server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("Master Mind Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.completion.model);

    mastermind_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway stopped: {e}"))
}
