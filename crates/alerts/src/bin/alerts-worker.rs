//! alerts-worker: runs scheduled search alert rules.
//!
//! Loads every rule file from the rules directory, starts one cron job per
//! rule and delivers triggered alerts to the rule's channels.
//!
//! Rules are reloaded when files in the rules directory change and on
//! SIGHUP. A reload that fails validation keeps the running rule set.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use stupid_alerts::{
    AlwaysLeader, Controller, ControllerSettings, ElasticsearchClient, JobContext, Leadership,
    LockFileLeadership, MemoryStateStore, ScheduleStateStore,
};
use stupid_core::config::load_dotenv;
use stupid_core::Config;
use stupid_rules::RuleLoader;

/// Quiet period before a burst of file events triggers one reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

// ── CLI ─────────────────────────────────────────────────────────────

/// Scheduled search alerting worker.
#[derive(Parser, Debug)]
#[command(name = "alerts-worker", version, about)]
struct Cli {
    /// Rules directory (overrides ALERTS_RULES_DIR from the profile).
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Configuration profile (e.g. PROD).
    #[arg(long, env = "STUPID_PROFILE")]
    profile: Option<String>,

    /// Validate the rule files and exit.
    #[arg(long, default_value_t = false)]
    check: bool,
}

// ── Signals ─────────────────────────────────────────────────────────

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler, waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Forward SIGHUP as a reload trigger.
#[cfg(unix)]
fn forward_sighup(trigger: mpsc::Sender<()>, shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};
    let mut hup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "cannot install SIGHUP handler");
            return;
        }
    };
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                sig = hup.recv() => {
                    if sig.is_none() {
                        break;
                    }
                    info!("SIGHUP received");
                    let _ = trigger.try_send(());
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn forward_sighup(_trigger: mpsc::Sender<()>, _shutdown: CancellationToken) {}

// ── Reload ──────────────────────────────────────────────────────────

/// Re-read the rules directory on every trigger and hand valid rule sets to
/// the controller.
async fn reload_loop(
    rules_dir: PathBuf,
    mut trigger: mpsc::Receiver<()>,
    reload: mpsc::Sender<Vec<stupid_rules::Rule>>,
    shutdown: CancellationToken,
) {
    let loader = RuleLoader::new(rules_dir);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            t = trigger.recv() => if t.is_none() { break },
        }

        // Editors write files in several steps; wait for the burst to end.
        tokio::time::sleep(RELOAD_DEBOUNCE).await;
        while trigger.try_recv().is_ok() {}

        match loader.load_all() {
            Ok(rules) => {
                info!(rules = rules.len(), "rule files reloaded");
                if reload.send(rules).await.is_err() {
                    break;
                }
            }
            Err(e) => error!(error = %e, "rule reload failed, keeping current rules"),
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    load_dotenv();

    let mut config = match &cli.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = cli.rules_dir {
        config.alerts.rules_dir = dir;
    }
    config.validate()?;
    info!(version = env!("CARGO_PKG_VERSION"), "alerts-worker starting");
    config.log_summary();

    let mut loader = RuleLoader::new(config.alerts.rules_dir.clone());
    let rules = loader
        .load_all()
        .with_context(|| format!("loading rules from {}", config.alerts.rules_dir.display()))?;
    info!(rules = rules.len(), "rules loaded");
    if cli.check {
        for rule in &rules {
            info!(rule = %rule.name, index = %rule.index, schedule = %rule.schedule, "ok");
        }
        return Ok(());
    }

    let es = Arc::new(ElasticsearchClient::new(&config.elasticsearch)?);
    let state: Arc<dyn ScheduleStateStore> = if config.elasticsearch.maintain_state {
        if let Err(e) = es.ensure_state_template().await {
            warn!(error = %e, "cannot install state index template");
        }
        es.clone() as Arc<dyn ScheduleStateStore>
    } else {
        info!("job state kept in memory only");
        Arc::new(MemoryStateStore::new())
    };

    let leadership: Arc<dyn Leadership> = match (&config.leadership.lock_file, config.leadership.distributed) {
        (Some(path), true) => {
            info!(lock_file = %path.display(), "distributed mode, leader while lock file exists");
            Arc::new(LockFileLeadership::new(path))
        }
        _ => Arc::new(AlwaysLeader),
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown signal received");
        signal_token.cancel();
    });

    let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);
    let (reload_tx, reload_rx) = mpsc::channel(1);
    if config.alerts.watch_rules {
        let watch_trigger = trigger_tx.clone();
        if let Err(e) = loader.watch(move || {
            let _ = watch_trigger.try_send(());
        }) {
            warn!(error = %e, "cannot watch rules directory, reload on SIGHUP only");
        }
    }
    forward_sighup(trigger_tx, shutdown.clone());
    tokio::spawn(reload_loop(
        config.alerts.rules_dir.clone(),
        trigger_rx,
        reload_tx,
        shutdown.clone(),
    ));

    let context = JobContext {
        search: es,
        state,
        leadership,
    };
    Controller::new(ControllerSettings::from_config(&config), context)
        .run(rules, reload_rx, shutdown)
        .await;

    // Keeps the watcher alive until here.
    drop(loader);
    info!("alerts-worker stopped");
    Ok(())
}
