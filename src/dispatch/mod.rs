//! Dispatch cycle orchestration
//!
//! One cycle runs select → resolve → fan out → classify → reconcile →
//! sweep. The driver owns no durable state: everything it holds between
//! steps dies with the cycle, and everything that must survive lives in the
//! two stores.

mod fanout;
mod reconcile;
mod resolve;
mod sweep;

use std::{
    collections::HashSet,
    sync::Arc,
    time::Instant,
};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    config::DispatchConfig,
    error::{DispatchError, FailureKind},
    store::{ReminderStore, SubscriptionStore},
    transport::PushTransport,
    types::{CycleSummary, Endpoint, ReminderId, UserId},
};

/// Drives dispatch cycles against a pair of stores and a push transport.
///
/// All collaborators and credentials are passed in at construction; the
/// dispatcher holds no process-wide state. Overlapping cycles are tolerated
/// (every mutation is idempotent) but never scheduled by [`serve`].
///
/// [`serve`]: Dispatcher::serve
pub struct Dispatcher {
    config: DispatchConfig,
    reminders: Arc<dyn ReminderStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn PushTransport>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        config: DispatchConfig,
        reminders: Arc<dyn ReminderStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            config,
            reminders,
            subscriptions,
            transport,
        }
    }

    /// Run one complete dispatch cycle.
    ///
    /// # Errors
    ///
    /// Returns an error when selecting due reminders or resolving
    /// subscriptions fails; the cycle aborts immediately, the sweeper
    /// included, and is retried wholesale on the next invocation. Delivery
    /// and reconciliation failures never surface here.
    pub async fn run_cycle(&self) -> Result<CycleSummary, DispatchError> {
        let started = Instant::now();
        let now = Utc::now();

        let due = self
            .reminders
            .due_before(now, self.config.batch_limit)
            .await?;

        if due.is_empty() {
            debug!("no due reminders");
            sweep::sweep(self.reminders.as_ref(), now, self.config.retention()).await;

            return Ok(CycleSummary {
                elapsed: started.elapsed(),
                ..CycleSummary::default()
            });
        }

        let considered = due.len();
        let recipients: HashSet<UserId> = due.iter().map(|r| r.user_id.clone()).collect();

        let targets =
            resolve::resolve_targets(self.subscriptions.as_ref(), &recipients).await?;

        let outcomes = fanout::fan_out(
            &self.transport,
            due,
            &targets,
            self.config.max_in_flight,
        )
        .await;

        let mut served: HashSet<ReminderId> = HashSet::new();
        let mut expired: HashSet<Endpoint> = HashSet::new();
        let mut attempted = 0;
        let mut delivered = 0;

        for outcome in &outcomes {
            attempted += outcome.attempts.len();

            for attempt in &outcome.attempts {
                match &attempt.result {
                    Ok(()) => delivered += 1,
                    Err(e) => match e.failure_kind() {
                        FailureKind::Permanent => {
                            warn!(
                                endpoint = %attempt.endpoint,
                                error = %e,
                                "endpoint permanently gone, scheduling removal"
                            );
                            expired.insert(attempt.endpoint.clone());
                        }
                        FailureKind::Transient => {
                            warn!(endpoint = %attempt.endpoint, error = %e, "delivery failed");
                        }
                    },
                }
            }

            if outcome.served() {
                served.insert(outcome.id.clone());
            }
        }

        reconcile::reconcile(
            self.reminders.as_ref(),
            self.subscriptions.as_ref(),
            &served,
            &expired,
        )
        .await;

        sweep::sweep(self.reminders.as_ref(), now, self.config.retention()).await;

        let summary = CycleSummary {
            considered,
            attempted,
            delivered,
            elapsed: started.elapsed(),
        };
        info!(%summary, "dispatch cycle complete");

        Ok(summary)
    }

    /// Drive cycles at the configured interval until shutdown.
    ///
    /// A failed cycle is logged and the loop keeps going; the next tick
    /// retries wholesale. Ticks never overlap: a cycle that outlives the
    /// interval delays the next one instead of running alongside it.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut timer = tokio::time::interval(self.config.cycle_interval());
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Skip the first tick to avoid immediate execution
        timer.tick().await;

        info!(
            interval_secs = self.config.cycle_interval_secs,
            "dispatcher started"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "dispatch cycle failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }
}
