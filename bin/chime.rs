use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chime::{
    Config, Dispatcher,
    store::{MemoryReminderStore, MemorySubscriptionStore, ReminderStore, SubscriptionStore},
    transport::{PushTransport, WebPushTransport},
};

#[derive(Debug, Parser)]
#[command(name = "chime", about = "Scheduled web-push reminder dispatcher")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "chime.config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive dispatch cycles on an interval until interrupted
    Run,
    /// Run a single dispatch cycle and exit
    Once,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CHIME_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn memory_stores() -> (Arc<dyn ReminderStore>, Arc<dyn SubscriptionStore>) {
    warn!("DATABASE_URL is not set, using transient in-memory stores");
    (
        Arc::new(MemoryReminderStore::new()),
        Arc::new(MemorySubscriptionStore::new()),
    )
}

#[cfg(feature = "postgres")]
async fn build_stores() -> anyhow::Result<(Arc<dyn ReminderStore>, Arc<dyn SubscriptionStore>)> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = chime::store::PgStore::connect(&url)
                .await
                .context("failed to connect to postgres")?;
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        Err(_) => Ok(memory_stores()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_stores() -> anyhow::Result<(Arc<dyn ReminderStore>, Arc<dyn SubscriptionStore>)> {
    Ok(memory_stores())
}

async fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let private_key = config
        .vapid_private_key()
        .context("push transport credentials")?;

    let transport: Arc<dyn PushTransport> = Arc::new(
        WebPushTransport::new(config.transport.subject.clone(), private_key)
            .context("failed to build push transport")?,
    );

    let (reminders, subscriptions) = build_stores().await?;

    Ok(Dispatcher::new(
        config.dispatch.clone(),
        reminders,
        subscriptions,
        transport,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "no config file found, using defaults");
        Config::default()
    };

    let dispatcher = build_dispatcher(&config).await?;

    match cli.command {
        Command::Once => {
            let summary = dispatcher
                .run_cycle()
                .await
                .context("dispatch cycle failed")?;
            info!(%summary, "done");
        }
        Command::Run => {
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(());
                }
            });

            dispatcher.serve(shutdown_rx).await;
            info!("shutting down");
        }
    }

    Ok(())
}
