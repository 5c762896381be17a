//! Integration tests for the dispatch cycle

mod support;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use chime::{
    DispatchConfig, Dispatcher, Endpoint, Reminder, ReminderId, Subscription, UserId,
    store::{MemoryReminderStore, MemorySubscriptionStore, ReminderStore, SubscriptionStore},
};
use support::{flaky_store::FlakyReminderStore, mock_transport::MockPushTransport};

fn reminder(id: &str, user: &str, fire_at: DateTime<Utc>, sent: bool) -> Reminder {
    Reminder {
        id: ReminderId::new(id),
        user_id: UserId::new(user),
        title: "Stand-up".to_string(),
        body: "Daily stand-up in 5 minutes".to_string(),
        url: None,
        fire_at,
        sent,
    }
}

fn subscription(user: &str, endpoint: &str) -> Subscription {
    Subscription {
        user_id: UserId::new(user),
        endpoint: Endpoint::new(endpoint),
        p256dh: "p256dh-key".to_string(),
        auth: "auth-secret".to_string(),
    }
}

fn dispatcher(
    reminders: Arc<dyn ReminderStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    transport: Arc<MockPushTransport>,
) -> Dispatcher {
    let config = DispatchConfig {
        batch_limit: 100,
        max_in_flight: 4,
        ..DispatchConfig::default()
    };

    Dispatcher::new(config, reminders, subscriptions, transport)
}

#[tokio::test]
async fn test_partial_failure_still_serves_and_prunes_dead_endpoint() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(
        MockPushTransport::new().with_status_failure("https://push.example/b", 410, "Gone"),
    );

    let now = Utc::now();
    reminders.insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));
    subscriptions.insert(subscription("u-1", "https://push.example/b"));

    let summary = dispatcher(reminders.clone(), subscriptions.clone(), transport.clone())
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.considered, 1);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.delivered, 1);

    // One device confirmed, so the reminder is served
    assert!(reminders.get(&ReminderId::new("r-1")).expect("exists").sent);

    // The gone endpoint is pruned, the live one kept
    assert!(!subscriptions.contains_endpoint(&Endpoint::new("https://push.example/b")));
    assert!(subscriptions.contains_endpoint(&Endpoint::new("https://push.example/a")));
}

#[tokio::test]
async fn test_transient_failure_keeps_endpoint_and_reminder_pending() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(
        MockPushTransport::new().with_status_failure(
            "https://push.example/a",
            503,
            "Service Unavailable",
        ),
    );

    let now = Utc::now();
    reminders.insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));

    let summary = dispatcher(reminders.clone(), subscriptions.clone(), transport.clone())
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.delivered, 0);

    // Transient failures delete nothing and serve nothing
    assert!(!reminders.get(&ReminderId::new("r-1")).expect("exists").sent);
    assert!(subscriptions.contains_endpoint(&Endpoint::new("https://push.example/a")));
}

#[tokio::test]
async fn test_zero_target_recipient_stays_pending_with_no_attempts() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    reminders.insert(reminder("r-2", "u-2", now - TimeDelta::minutes(1), false));

    let summary = dispatcher(reminders.clone(), subscriptions, transport.clone())
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.considered, 1);
    assert_eq!(summary.attempted, 0);
    assert_eq!(transport.send_count(), 0);
    assert!(!reminders.get(&ReminderId::new("r-2")).expect("exists").sent);
}

#[tokio::test]
async fn test_idle_cycle_still_runs_the_sweeper() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    // Nothing due, but one sent reminder has aged out of retention
    reminders.insert(reminder("ancient", "u-1", now - TimeDelta::days(45), true));
    reminders.insert(reminder("future", "u-1", now + TimeDelta::hours(1), false));

    let summary = dispatcher(reminders.clone(), subscriptions, transport.clone())
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.considered, 0);
    assert_eq!(transport.send_count(), 0);
    assert!(reminders.get(&ReminderId::new("ancient")).is_none());
    assert!(reminders.get(&ReminderId::new("future")).is_some());
}

#[tokio::test]
async fn test_duplicate_subscription_rows_yield_one_send_per_endpoint() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    reminders.insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));

    let summary = dispatcher(reminders, subscriptions, transport.clone())
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.attempted, 1);
    assert_eq!(transport.sends_to("https://push.example/a"), 1);
}

#[tokio::test]
async fn test_batch_limit_caps_considered_reminders() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    for i in 0..10 {
        reminders.insert(reminder(
            &format!("r-{i}"),
            "u-1",
            now - TimeDelta::minutes(i + 1),
            false,
        ));
    }
    subscriptions.insert(subscription("u-1", "https://push.example/a"));

    let config = DispatchConfig {
        batch_limit: 3,
        ..DispatchConfig::default()
    };
    let summary = Dispatcher::new(config, reminders, subscriptions, transport)
        .run_cycle()
        .await
        .expect("cycle succeeds");

    assert_eq!(summary.considered, 3);
    assert_eq!(summary.attempted, 3);
}

#[tokio::test]
async fn test_due_select_failure_aborts_cycle_before_sweep() {
    let reminders = Arc::new(FlakyReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    reminders
        .inner
        .insert(reminder("ancient", "u-1", now - TimeDelta::days(45), true));
    reminders.fail_due_queries(true);

    let result = dispatcher(reminders.clone(), subscriptions, transport.clone())
        .run_cycle()
        .await;

    assert!(result.is_err());
    assert_eq!(transport.send_count(), 0);
    // Fail-fast: the sweeper must not have run
    assert!(reminders.inner.get(&ReminderId::new("ancient")).is_some());
}

#[tokio::test]
async fn test_mark_sent_failure_is_tolerated_and_redelivers_next_cycle() {
    let reminders = Arc::new(FlakyReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    reminders
        .inner
        .insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));
    reminders.fail_mark_sent(true);

    let driver = dispatcher(reminders.clone(), subscriptions, transport.clone());

    // Reconciliation failure is non-fatal: the cycle still reports success
    let summary = driver.run_cycle().await.expect("cycle succeeds");
    assert_eq!(summary.delivered, 1);
    assert!(!reminders.inner.get(&ReminderId::new("r-1")).expect("exists").sent);

    // Next cycle redelivers and the write goes through this time
    reminders.fail_mark_sent(false);
    let summary = driver.run_cycle().await.expect("cycle succeeds");
    assert_eq!(summary.delivered, 1);
    assert_eq!(transport.sends_to("https://push.example/a"), 2);
    assert!(reminders.inner.get(&ReminderId::new("r-1")).expect("exists").sent);
}

#[tokio::test]
async fn test_served_reminder_is_not_reconsidered() {
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new());

    let now = Utc::now();
    reminders.insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/a"));

    let driver = dispatcher(reminders, subscriptions, transport.clone());

    driver.run_cycle().await.expect("first cycle");
    let summary = driver.run_cycle().await.expect("second cycle");

    // The second cycle finds nothing due and sends nothing
    assert_eq!(summary.considered, 0);
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_failed_secondary_device_is_not_retried_once_served() {
    // At-least-one-delivery policy: after any device confirms, the
    // reminder is done and the failed device never sees it again.
    let reminders = Arc::new(MemoryReminderStore::new());
    let subscriptions = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(MockPushTransport::new().with_network_failure(
        "https://push.example/flaky",
        "connect timeout",
    ));

    let now = Utc::now();
    reminders.insert(reminder("r-1", "u-1", now - TimeDelta::minutes(1), false));
    subscriptions.insert(subscription("u-1", "https://push.example/ok"));
    subscriptions.insert(subscription("u-1", "https://push.example/flaky"));

    let driver = dispatcher(reminders.clone(), subscriptions.clone(), transport.clone());

    driver.run_cycle().await.expect("first cycle");
    assert!(reminders.get(&ReminderId::new("r-1")).expect("exists").sent);
    // Transient failure leaves the subscription registered
    assert!(subscriptions.contains_endpoint(&Endpoint::new("https://push.example/flaky")));

    driver.run_cycle().await.expect("second cycle");
    assert_eq!(transport.sends_to("https://push.example/flaky"), 1);
}
