//! leader-beacon - publishes Mesos master and framework leaders into Consul

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leader_beacon::{
    config::Args,
    coordinator::MesosClient,
    health,
    registry::{AgentAddress, ConsulRegistry},
    Reconciler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("leader_beacon={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("======================================");
    info!("  leader-beacon");
    info!("======================================");
    for (i, url) in config.candidates.iter().enumerate() {
        info!("  master-{}: {}", i, url);
    }
    info!("Frameworks: {:?}", config.frameworks);
    info!("Interval: {:?}", config.interval);
    info!("Service name: {}", config.service_name);
    match &config.agent {
        AgentAddress::CoLocated { port } => info!("Consul: agent on leader host, port {}", port),
        AgentAddress::Fixed(url) => info!("Consul: {}", url),
    }
    info!("Healthcheck: {}", config.healthcheck);
    info!("======================================");

    let mesos = MesosClient::new(config.candidates.clone(), config.request_timeout)?;
    let consul = ConsulRegistry::new(
        config.agent.clone(),
        config.consul_token.clone(),
        config.request_timeout,
    )?;

    // Liveness runs on its own; a failed bind is fatal at startup
    let listener = tokio::net::TcpListener::bind(config.healthcheck).await?;
    info!("Healthcheck listening on http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health::router()).await {
            error!(error = %e, "Healthcheck server error");
        }
    });

    let reconciler = Reconciler::new(mesos, consul, &config);

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };
    reconciler.run(shutdown).await;

    Ok(())
}
