//! Delivers alerts to their channels with bounded retry.
//!
//! The dispatcher consumes alerts from the shared queue. Every alert is
//! delivered on its own task and every channel of an alert retries on its own,
//! so one slow or failing channel never blocks the others. Retry bookkeeping
//! lives in the shared [`Inventory`].

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::alert::Alert;
use crate::inventory::Inventory;
use crate::traits::Channel;

/// Result of delivering one alert to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub channel: String,
    pub attempts: u32,
    /// Remaining attempts reported after each failed attempt, in order.
    pub failures: Vec<u32>,
    pub delivered: bool,
}

pub struct Dispatcher {
    inventory: Arc<Inventory>,
}

impl Dispatcher {
    /// Create a dispatcher whose deliveries get `retry_budget` attempts each.
    pub fn new(retry_budget: u32) -> Self {
        Self::with_inventory(Arc::new(Inventory::new(retry_budget)))
    }

    pub fn with_inventory(inventory: Arc<Inventory>) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    /// Consume alerts until the queue closes, then wait for every in-flight
    /// delivery to finish.
    ///
    /// `shutdown` does not stop consumption: alerts already queued still get
    /// one attempt, but failed attempts are no longer retried.
    pub async fn run(self: Arc<Self>, mut alerts: mpsc::Receiver<Alert>, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();
        info!(retry_budget = self.inventory.budget(), "dispatcher started");

        while let Some(alert) = alerts.recv().await {
            debug!(alert_id = %alert.id, rule = %alert.rule_name, "alert dequeued");
            let dispatcher = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tracker.spawn(async move {
                dispatcher.dispatch(&alert, &shutdown).await;
            });
        }

        tracker.close();
        tracker.wait().await;
        info!("dispatcher stopped: queue closed and deliveries finished");
    }

    /// Deliver one alert to all of its channels concurrently.
    pub async fn dispatch(&self, alert: &Alert, shutdown: &CancellationToken) -> Vec<DeliveryOutcome> {
        if alert.channels.is_empty() {
            warn!(alert_id = %alert.id, rule = %alert.rule_name, "alert has no channels");
            return Vec::new();
        }

        let deliveries = alert
            .channels
            .iter()
            .enumerate()
            .map(|(index, channel)| self.deliver_with_retry(alert, index, channel.as_ref(), shutdown));
        join_all(deliveries).await
    }

    async fn deliver_with_retry(
        &self,
        alert: &Alert,
        index: usize,
        channel: &dyn Channel,
        shutdown: &CancellationToken,
    ) -> DeliveryOutcome {
        let id = alert.delivery_id(index);
        let name = channel.channel_name().to_string();
        let mut outcome = DeliveryOutcome {
            channel: name.clone(),
            attempts: 0,
            failures: Vec::new(),
            delivered: false,
        };

        self.inventory.register(&id);

        loop {
            outcome.attempts += 1;
            match channel.deliver(&alert.rule_name, &alert.records).await {
                Ok(()) => {
                    info!(
                        alert_id = %alert.id,
                        rule = %alert.rule_name,
                        channel = %name,
                        attempts = outcome.attempts,
                        "alert delivered"
                    );
                    outcome.delivered = true;
                    break;
                }
                Err(e) => {
                    let remaining = self.inventory.decrement(&id);
                    outcome.failures.push(remaining);
                    error!(
                        alert_id = %alert.id,
                        rule = %alert.rule_name,
                        channel = %name,
                        remaining_retries = remaining,
                        error = %e,
                        "alert delivery failed"
                    );
                    if remaining == 0 {
                        error!(
                            alert_id = %alert.id,
                            rule = %alert.rule_name,
                            channel = %name,
                            "retry budget exhausted, dropping alert for this channel"
                        );
                        break;
                    }
                    if shutdown.is_cancelled() {
                        warn!(
                            alert_id = %alert.id,
                            rule = %alert.rule_name,
                            channel = %name,
                            remaining_retries = remaining,
                            "shutting down, abandoning remaining retries"
                        );
                        break;
                    }
                }
            }
        }

        self.inventory.deregister(&id);
        outcome
    }
}
