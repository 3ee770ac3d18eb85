// # registratord - DNS Registrator Daemon
//
// Thin integration layer: all reconciliation logic lives in
// registrator-core. The daemon is responsible for:
//
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the tokio runtime
// 3. Connecting the Docker runtime, metadata resolver and record store
// 4. Serving the liveness endpoint
// 5. Running the engine until a signal arrives or the event feed is lost
//
// ## Configuration
//
// ### Zone and records
// - `REGISTRATOR_ZONE_ID`: Hosted zone id (default `Z1P7DHMHEAX6O3`)
// - `REGISTRATOR_TTL`, `REGISTRATOR_WEIGHT`: Record set shape (5, 50)
// - `REGISTRATOR_RECORD_TYPE`: auto, a or cname (default auto)
//
// ### Classifier
// - `REGISTRATOR_MODE`: container_name (default) or label
// - `REGISTRATOR_CONTAINER`, `REGISTRATOR_RECORD_NAME`: container_name mode
// - `REGISTRATOR_LABEL`, `REGISTRATOR_SUFFIX`, `REGISTRATOR_DOMAIN`: label mode
// - `REGISTRATOR_PURGE_ON_START`: Delete this host's stale record at startup
//
// ### Provider
// - `REGISTRATOR_PROVIDER`: route53 (default) or memory
// - `REGISTRATOR_REGION`: AWS region (falls back to `AWS_REGION`, then us-east-1)
// - `REGISTRATOR_DRY_RUN`: Query Route 53 but only log changes
//
// ### Host address and runtime
// - `REGISTRATOR_METADATA_ENDPOINT`: Metadata service (default 169.254.169.254)
// - `REGISTRATOR_ADDRESS`: public_hostname (default) or local_ipv4
// - `DOCKER_HOST`: Docker daemon (default `unix:///var/run/docker.sock`)
//
// ### Process
// - `REGISTRATOR_LIVENESS_ADDR`: Liveness bind address (default 0.0.0.0:8080)
// - `REGISTRATOR_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export REGISTRATOR_MODE=label
// export REGISTRATOR_ZONE_ID=Z1P7DHMHEAX6O3
// export REGISTRATOR_DRY_RUN=true
//
// registratord
// ```

mod config;
mod liveness;

use anyhow::{Context, Result};
use config::Config;
use registrator_addr_metadata::MetadataAddressResolver;
use registrator_core::config::ProviderConfig;
use registrator_core::traits::{ContainerRuntime, RecordStore};
use registrator_core::{EngineEvent, MemoryRecordStore, RegistratorEngine};
use registrator_runtime_docker::DockerRuntime;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, error, info, trace, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (event feed lost)
#[derive(Debug, Clone, Copy)]
enum RegistratorExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RegistratorExitCode> for ExitCode {
    fn from(code: RegistratorExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Everything wired up and ready to run
struct Daemon {
    engine: RegistratorEngine,
    engine_events: mpsc::Receiver<EngineEvent>,
    liveness: TcpListener,
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RegistratorExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return RegistratorExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RegistratorExitCode::ConfigError.into();
    }

    info!("Starting registratord");
    info!(
        zone_id = %config.core.zone_id,
        classifier = config.core.classifier.mode_name(),
        provider = config.core.provider.type_name(),
        "Configuration loaded"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RegistratorExitCode::RuntimeError.into();
        }
    };

    let exit = rt.block_on(async {
        let daemon = match start(config).await {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return RegistratorExitCode::ConfigError;
            }
        };

        match run(daemon).await {
            Ok(()) => RegistratorExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                RegistratorExitCode::RuntimeError
            }
        }
    });

    exit.into()
}

/// Connect every collaborator and build the engine
///
/// Any failure here is a startup failure: an unreachable Docker daemon,
/// missing AWS configuration or an unbindable liveness address.
async fn start(config: Config) -> Result<Daemon> {
    let runtime = DockerRuntime::connect(&config.core.runtime)?;
    runtime
        .ping()
        .await
        .with_context(|| {
            format!(
                "Docker daemon at {} is not reachable",
                config.core.runtime.docker_host
            )
        })?;
    info!(docker_host = %config.core.runtime.docker_host, "Connected to Docker");

    let resolver = MetadataAddressResolver::new(&config.core.metadata)?;
    info!(url = resolver.url(), "Resolving host address from instance metadata");

    let store = build_store(&config).await?;
    info!(provider = store.provider_name(), "Record store ready");

    let (engine, engine_events) = RegistratorEngine::new(
        Arc::new(runtime),
        Arc::new(resolver),
        store,
        config.core,
    )?;

    let liveness = TcpListener::bind(config.liveness_addr)
        .await
        .with_context(|| format!("Cannot bind liveness endpoint to {}", config.liveness_addr))?;

    Ok(Daemon {
        engine,
        engine_events,
        liveness,
    })
}

async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.core.provider {
        #[cfg(feature = "route53")]
        provider @ ProviderConfig::Route53 { .. } => {
            let store = registrator_provider_route53::Route53RecordStore::from_config(
                provider,
                config.core.record.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "route53"))]
        ProviderConfig::Route53 { .. } => {
            anyhow::bail!("Route 53 support was not compiled in")
        }
        ProviderConfig::Memory => {
            warn!("Using the in-memory record store - records live only as long as this process");
            Ok(Arc::new(MemoryRecordStore::with_record_config(
                config.core.record.clone(),
            )))
        }
    }
}

/// Run until a shutdown signal arrives or the engine fails
async fn run(daemon: Daemon) -> Result<()> {
    let Daemon {
        engine,
        mut engine_events,
        liveness,
    } = daemon;

    let liveness_task = tokio::spawn(async move {
        if let Err(e) = liveness::serve(liveness).await {
            error!("Liveness endpoint failed: {:#}", e);
        }
    });

    // The engine already logs every reconciliation; keep the channel drained
    let observer_task = tokio::spawn(async move {
        while let Some(event) = engine_events.recv().await {
            trace!(?event, "Engine event");
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let engine_run = engine.run_with_shutdown(Some(shutdown_rx));
    tokio::pin!(engine_run);

    let finished = tokio::select! {
        result = &mut engine_run => Some(result),
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
            None
        }
    };

    let result = match finished {
        Some(result) => result.context("Engine stopped"),
        None => {
            let _ = shutdown_tx.send(());
            engine_run.await.context("Engine failed during shutdown")
        }
    };

    liveness_task.abort();
    observer_task.abort();

    if result.is_ok() {
        info!("Shutting down registratord");
    }
    result
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
