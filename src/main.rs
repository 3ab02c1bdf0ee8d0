use orchard_risk::config::{Config, SourceKind};
use orchard_risk::provider::{FixtureSource, HttpSource, SensorSource};
use orchard_risk::scheduler::Scheduler;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orchard_risk=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Orchard risk service starting...");

    let config_path =
        std::env::var("ORCHARD_RISK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = Config::load(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}\n\n\
             Make sure:\n\
             1. The config file exists (or set ORCHARD_RISK_CONFIG)\n\
             2. All required environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            config_path,
            e
        )
    })?;
    info!("Configuration loaded from {}", config_path);

    // Set up shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    match config.source.kind {
        SourceKind::Http => {
            let base_url = config.source.base_url.clone().unwrap_or_default();
            let source = HttpSource::new(
                &base_url,
                &config.source.range,
                config.source.auth_token.clone(),
            )?;
            info!("Reading device history from {}", base_url);
            run_scheduler(config, source, shutdown_rx).await?;
        }
        SourceKind::Fixture => {
            let path = config.source.fixture_path.clone().unwrap_or_default();
            let source = FixtureSource::load(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load fixture {}: {}", path.display(), e)
            })?;
            info!("Reading device history from fixture {}", path.display());
            run_scheduler(config, source, shutdown_rx).await?;
        }
    }

    info!("Orchard risk service shutting down");
    Ok(())
}

async fn run_scheduler<S: SensorSource>(
    config: Config,
    source: S,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut scheduler = Scheduler::new(config, source, shutdown_rx)?;

    if let Err(e) = scheduler.run().await {
        error!("Scheduler error: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
