//! Idempotent state reconciliation after a fan-out pass

use std::collections::HashSet;

use tracing::{info, warn};

use crate::{
    store::{ReminderStore, SubscriptionStore},
    types::{Endpoint, ReminderId},
};

/// Commit the two batch mutations a fan-out pass produces: delete
/// subscriptions whose endpoints are permanently gone, and mark reminders
/// that reached at least one device as sent.
///
/// Each mutation is skipped outright when its input set is empty, so idle
/// passes never issue empty-filter writes. Both mutations are idempotent
/// and independent: a failure in one is logged without rolling back the
/// other, and neither failure fails the cycle. A reminder whose mark-as-sent
/// was lost is simply re-delivered next cycle.
pub(crate) async fn reconcile(
    reminders: &dyn ReminderStore,
    subscriptions: &dyn SubscriptionStore,
    served: &HashSet<ReminderId>,
    expired: &HashSet<Endpoint>,
) {
    if !expired.is_empty() {
        match subscriptions.delete_endpoints(expired).await {
            Ok(removed) => info!(removed, "deleted expired subscriptions"),
            Err(e) => warn!(error = %e, "failed to delete expired subscriptions"),
        }
    }

    if !served.is_empty() {
        match reminders.mark_sent(served).await {
            Ok(()) => info!(count = served.len(), "marked reminders sent"),
            Err(e) => {
                warn!(error = %e, "failed to mark reminders sent, they will be redelivered next cycle");
            }
        }
    }
}
