//! Retention sweep for sent reminders

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::store::ReminderStore;

/// Delete sent reminders whose fire time fell out of the retention window.
///
/// Runs at the end of every cycle, idle ones included; a store failure here
/// is logged and the cycle still counts as successful.
pub(crate) async fn sweep(store: &dyn ReminderStore, now: DateTime<Utc>, retention: TimeDelta) {
    let cutoff = now - retention;

    match store.purge_sent_before(cutoff).await {
        Ok(0) => debug!("retention sweep removed nothing"),
        Ok(purged) => info!(purged, "retention sweep complete"),
        Err(e) => warn!(error = %e, "retention sweep failed"),
    }
}
