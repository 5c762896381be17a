//! Concurrent delivery fan-out
//!
//! Two nested levels of structured concurrency: a `JoinSet` across due
//! reminders, and a `JoinSet` across each reminder's targets. A shared
//! semaphore bounds outstanding sends so a recipient with very many devices
//! cannot widen the fan-out without limit. Every attempt is joined before
//! the engine returns; nothing outlives the cycle.

use std::{collections::HashMap, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error};

use crate::{
    error::TransportError,
    transport::PushTransport,
    types::{Endpoint, PushPayload, Reminder, ReminderId, Subscription, UserId},
};

/// Result of one delivery attempt to one target.
#[derive(Debug)]
pub(crate) struct TargetOutcome {
    pub endpoint: Endpoint,
    pub result: Result<(), TransportError>,
}

/// All attempts made for one reminder.
///
/// A reminder whose recipient had no resolved targets carries an empty
/// attempt list: nothing was sent and it stays pending.
#[derive(Debug)]
pub(crate) struct ReminderOutcome {
    pub id: ReminderId,
    pub attempts: Vec<TargetOutcome>,
}

impl ReminderOutcome {
    /// A reminder counts as served once any single target confirmed
    /// receipt, even if every other target failed.
    pub(crate) fn served(&self) -> bool {
        self.attempts.iter().any(|a| a.result.is_ok())
    }
}

/// Deliver every due reminder to every resolved target for its recipient.
///
/// Attempts are unordered, both across reminders and across the targets of
/// one reminder; a failure on one target never prevents attempts on the
/// others. The payload is rendered once per reminder.
pub(crate) async fn fan_out(
    transport: &Arc<dyn PushTransport>,
    reminders: Vec<Reminder>,
    targets_by_user: &HashMap<UserId, Vec<Subscription>>,
    max_in_flight: usize,
) -> Vec<ReminderOutcome> {
    let limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks: JoinSet<ReminderOutcome> = JoinSet::new();
    let mut outcomes = Vec::with_capacity(reminders.len());

    for reminder in reminders {
        let targets = targets_by_user
            .get(&reminder.user_id)
            .filter(|targets| !targets.is_empty());

        let Some(targets) = targets else {
            debug!(
                reminder = %reminder.id,
                user = %reminder.user_id,
                "recipient has no registered devices, leaving reminder pending"
            );
            outcomes.push(ReminderOutcome {
                id: reminder.id,
                attempts: Vec::new(),
            });
            continue;
        };

        let payload = Arc::new(reminder.payload());
        let targets = targets.clone();
        let transport = Arc::clone(transport);
        let limiter = Arc::clone(&limiter);

        tasks.spawn(async move {
            deliver_reminder(transport, limiter, reminder.id, targets, payload).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "delivery task panicked"),
        }
    }

    outcomes
}

/// Send one reminder's payload to every target concurrently.
async fn deliver_reminder(
    transport: Arc<dyn PushTransport>,
    limiter: Arc<Semaphore>,
    id: ReminderId,
    targets: Vec<Subscription>,
    payload: Arc<PushPayload>,
) -> ReminderOutcome {
    let mut sends: JoinSet<TargetOutcome> = JoinSet::new();

    for target in targets {
        let transport = Arc::clone(&transport);
        let payload = Arc::clone(&payload);
        let limiter = Arc::clone(&limiter);

        sends.spawn(async move {
            // A closed semaphore would mean the cycle is tearing down;
            // proceed unbounded rather than dropping the attempt.
            let _permit = limiter.acquire_owned().await.ok();

            let result = transport.send(&target, &payload).await;
            TargetOutcome {
                endpoint: target.endpoint,
                result,
            }
        });
    }

    let mut attempts = Vec::new();
    while let Some(joined) = sends.join_next().await {
        match joined {
            Ok(attempt) => attempts.push(attempt),
            Err(e) => error!(reminder = %id, error = %e, "send task panicked"),
        }
    }

    ReminderOutcome { id, attempts }
}
