//! Run command - chat listener plus scheduled publishing

use anyhow::{Context, Result, bail};
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tootbridge_adapters::{
    chat::{ConsoleTransport, SlackTransport},
    mastodon::MastodonPublisher,
};
use tootbridge_domain::{
    ChatTransport, StatusPublisher, Store, SystemClock,
    usecases::{Dispatcher, PostLifecycle, Scheduler},
};

use crate::args::RunArgs;
use crate::commands::build_store;
use crate::config::{AppConfig, load_secret};

type Lifecycle = PostLifecycle<dyn Store, dyn StatusPublisher, SystemClock>;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let use_console = args.console || config.chat.transport.trim() == "console";
    let scheduler_enabled = config.scheduler.enabled && !args.no_scheduler;

    tracing::info!(
        once = args.once,
        console = use_console,
        scheduler = scheduler_enabled,
        store = %config.store.backend,
        "Starting tootbridge"
    );

    // Build dependencies
    let store = build_store(&config, args.ephemeral).await?;
    let publisher: Arc<dyn StatusPublisher> = Arc::new(build_publisher(&config)?);
    let lifecycle: Arc<Lifecycle> = Arc::new(PostLifecycle::new(
        store,
        publisher,
        Arc::new(SystemClock),
    ));

    if args.once {
        run_tick(&Scheduler::new(lifecycle.clone())).await;
        tracing::info!("tootbridge run completed");
        return Ok(());
    }

    let transport: Box<dyn ChatTransport> = if use_console {
        Box::new(ConsoleTransport::stdio())
    } else {
        Box::new(build_slack_transport(&config).await?)
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_task = if scheduler_enabled {
        let period = Duration::from_secs(config.scheduler.interval_secs.max(1));
        let scheduler = Scheduler::new(lifecycle.clone());
        let shutdown = shutdown_rx.clone();
        tracing::info!(interval_secs = period.as_secs(), "Scheduler started");
        Some(tokio::spawn(async move {
            scheduler.run(period, shutdown).await;
        }))
    } else {
        None
    };

    let dispatcher = Dispatcher::new(lifecycle);
    let serve = dispatcher.serve(transport.as_ref(), shutdown_rx);
    tokio::pin!(serve);

    // On Ctrl+C the chat loop finishes the command in hand before stopping
    let outcome = tokio::select! {
        result = &mut serve => result,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
            }
            shutdown_tx.send_replace(true);
            serve.await
        }
    };

    shutdown_tx.send_replace(true);
    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }

    tracing::info!("tootbridge run completed");
    outcome.context("Chat transport failed")
}

async fn run_tick(scheduler: &Scheduler<dyn Store, dyn StatusPublisher, SystemClock>) {
    match scheduler.tick().await {
        Ok(report) => {
            tracing::info!(
                published = report.published.len(),
                failed = report.failed.len(),
                "Scheduler tick complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduler tick failed");
        }
    }
}

fn build_publisher(config: &AppConfig) -> Result<MastodonPublisher> {
    let host = load_secret(&config.mastodon.host_env, "Mastodon host")?;
    let token = load_secret(&config.mastodon.access_token_env, "Mastodon access token")?;

    MastodonPublisher::with_timeout(
        token,
        host.expose_secret(),
        Duration::from_secs(config.mastodon.timeout_secs),
    )
    .context("Failed to initialize Mastodon publisher")
}

async fn build_slack_transport(config: &AppConfig) -> Result<SlackTransport> {
    if config.slack.channels.is_empty() {
        bail!("Slack transport selected but no channels configured");
    }

    let token = load_secret(&config.slack.bot_token_env, "Slack bot token")?;
    let transport = SlackTransport::with_base_url(
        token,
        config.slack.base_url.clone(),
        config.slack.channels.clone(),
        Duration::from_secs(config.slack.poll_interval_secs.max(1)),
    )
    .context("Failed to initialize Slack transport")?;

    transport
        .connect()
        .await
        .context("Failed to connect to Slack")?;

    Ok(transport)
}
