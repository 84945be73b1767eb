//! `loopclaw serve`: start the HTTP gateway.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("LoopClaw Gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} @ {}", config.provider.model, config.provider.base_url);
    println!("   Workspace: {}", config.tools.workspace_dir.display());

    loopclaw_gateway::start(config).await?;

    Ok(())
}
