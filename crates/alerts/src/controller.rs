//! Owns the rule jobs, the alert queue and the dispatcher.
//!
//! Jobs run as one task each inside a [`TaskTracker`]; the dispatcher is a
//! separate task reading the bounded queue. Reloads swap the job set while
//! the dispatcher and its inventory live on. On shutdown the jobs finish
//! first, which drops every queue sender and lets the dispatcher drain.

use std::sync::Arc;
use std::time::Duration;

use stupid_core::Config;
use stupid_notify::Dispatcher;
use stupid_rules::Rule;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::factory::{JobContext, JobFactory};
use crate::job::JobSignals;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub queue_capacity: usize,
    pub retry_budget: u32,
    /// How often leadership is re-checked when it cannot push changes.
    pub poll_interval: Duration,
    /// Upper bound for jobs and then the dispatcher to finish on shutdown.
    pub shutdown_timeout: Duration,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            queue_capacity: config.alerts.queue_capacity.max(1),
            retry_budget: config.alerts.retry_budget,
            poll_interval: config.leadership.poll_interval(),
            shutdown_timeout: config.alerts.shutdown_timeout(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            retry_budget: stupid_notify::inventory::DEFAULT_RETRY_BUDGET,
            poll_interval: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// The job set of one rule generation.
struct RunningJobs {
    stop: CancellationToken,
    tracker: TaskTracker,
}

impl RunningJobs {
    fn start(factory: &JobFactory, rules: &[Rule], shutdown: &CancellationToken) -> Self {
        let signals = JobSignals::new(shutdown.clone());
        let tracker = TaskTracker::new();
        for job in factory.build_all(rules) {
            tracker.spawn(job.run(signals.clone()));
        }
        tracker.close();
        info!(jobs = tracker.len(), "rule jobs started");
        Self {
            stop: signals.stop,
            tracker,
        }
    }

    /// Stop waiting jobs and wait for in-flight cycles to finish.
    async fn stop(self) {
        self.stop.cancel();
        self.tracker.wait().await;
    }
}

enum Wake {
    Shutdown,
    Reload(Vec<Rule>),
    ReloadClosed,
    LeadershipChanged,
    LeadershipClosed,
    Poll,
}

pub struct Controller {
    settings: ControllerSettings,
    context: JobContext,
    dispatcher: Arc<Dispatcher>,
}

impl Controller {
    pub fn new(settings: ControllerSettings, context: JobContext) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(settings.retry_budget));
        Self {
            settings,
            context,
            dispatcher,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Every rule list received on `reload` replaces the current job set.
    pub async fn run(
        self,
        rules: Vec<Rule>,
        mut reload: mpsc::Receiver<Vec<Rule>>,
        shutdown: CancellationToken,
    ) {
        let (alerts_tx, alerts_rx) = mpsc::channel(self.settings.queue_capacity);
        let dispatcher = tokio::spawn(Arc::clone(&self.dispatcher).run(alerts_rx, shutdown.clone()));
        let factory = JobFactory::new(self.context.clone(), alerts_tx);
        let leadership = Arc::clone(&self.context.leadership);

        let mut rules = rules;
        let mut leader = leadership.is_leader();
        let mut running = if leader {
            Some(RunningJobs::start(&factory, &rules, &shutdown))
        } else {
            info!(rules = rules.len(), "not leader, jobs on standby");
            None
        };

        let mut leader_rx = leadership.subscribe();
        let mut reload_open = true;
        let mut poll = tokio::time::interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Wake::Shutdown,
                msg = reload.recv(), if reload_open => match msg {
                    Some(new_rules) => Wake::Reload(new_rules),
                    None => Wake::ReloadClosed,
                },
                ok = leadership_changed(&mut leader_rx) => {
                    if ok { Wake::LeadershipChanged } else { Wake::LeadershipClosed }
                },
                _ = poll.tick() => Wake::Poll,
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Reload(new_rules) => {
                    info!(rules = new_rules.len(), "reloading rules");
                    if let Some(jobs) = running.take() {
                        jobs.stop().await;
                    }
                    rules = new_rules;
                    if leader {
                        running = Some(RunningJobs::start(&factory, &rules, &shutdown));
                    }
                }
                Wake::ReloadClosed => {
                    debug!("reload channel closed");
                    reload_open = false;
                }
                Wake::LeadershipClosed => {
                    debug!("leadership notifications ended, polling only");
                    leader_rx = None;
                }
                Wake::LeadershipChanged | Wake::Poll => {}
            }

            let now_leader = leadership.is_leader();
            if now_leader == leader {
                continue;
            }
            leader = now_leader;
            if leader {
                info!("leadership acquired, starting rule jobs");
                running = Some(RunningJobs::start(&factory, &rules, &shutdown));
            } else if let Some(jobs) = running.take() {
                info!("leadership lost, stopping rule jobs");
                jobs.stop().await;
            }
        }

        info!("shutting down rule jobs");
        if let Some(jobs) = running.take() {
            if tokio::time::timeout(self.settings.shutdown_timeout, jobs.stop())
                .await
                .is_err()
            {
                warn!("rule jobs did not stop within the shutdown timeout");
            }
        }

        // Last sender: the dispatcher sees the queue close once it is drained.
        drop(factory);
        match tokio::time::timeout(self.settings.shutdown_timeout, dispatcher).await {
            Ok(Ok(())) => info!("controller stopped"),
            Ok(Err(e)) => error!(error = %e, "dispatcher task failed"),
            Err(_) => warn!(
                in_flight = self.dispatcher.inventory().len(),
                "dispatcher did not drain within the shutdown timeout"
            ),
        }
    }
}

/// Resolves on the next leadership notification; `false` once the sender is
/// gone. Never resolves without a notification source.
async fn leadership_changed(rx: &mut Option<watch::Receiver<bool>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}
