//! Target resolution for due reminders

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    error::StoreError,
    store::SubscriptionStore,
    types::{Subscription, UserId},
};

/// Load and group every subscription for the given recipients.
///
/// One store query for the whole batch. Within each recipient's group the
/// first occurrence of an endpoint wins and later duplicates are dropped,
/// so one cycle never sends twice to the same device. Recipients with no
/// registered subscriptions are absent from the map; callers treat absent
/// and empty identically.
///
/// # Errors
///
/// A store error here aborts the whole cycle.
pub(crate) async fn resolve_targets(
    store: &dyn SubscriptionStore,
    recipients: &HashSet<UserId>,
) -> Result<HashMap<UserId, Vec<Subscription>>, StoreError> {
    if recipients.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = store.for_users(recipients).await?;

    let mut by_user: HashMap<UserId, Vec<Subscription>> = HashMap::new();
    for subscription in rows {
        let targets = by_user.entry(subscription.user_id.clone()).or_default();

        if targets.iter().any(|t| t.endpoint == subscription.endpoint) {
            debug!(
                user = %subscription.user_id,
                endpoint = %subscription.endpoint,
                "dropping duplicate subscription row"
            );
            continue;
        }

        targets.push(subscription);
    }

    Ok(by_user)
}
