//! Access gate behavior

mod helpers;

use std::time::Duration;
use assert_matches::assert_matches;
use helpers::*;
use KinoBot::services::{ActionKind, DenyReason, Verdict};
use KinoBot::KinoBotError;

const USER: i64 = 42;

#[tokio::test]
async fn test_blocked_user_denied_regardless_of_subscription_and_channels() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.user_registry.extend_subscription(USER, 30).await.unwrap();
    ctx.services.user_registry.block(USER).await.unwrap();
    ctx.services.settings.add_channel("@kino").await.unwrap();

    for action in [ActionKind::MovieLookup, ActionKind::PaymentSubmission] {
        let verdict = ctx.services.access_gate.evaluate_access(USER, action).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(DenyReason::Blocked));
    }
    // Blocked is terminal: no membership query was made
    assert!(ctx.membership.calls().is_empty());
}

#[tokio::test]
async fn test_missing_channels_are_reported_in_configured_order() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.user_registry.extend_subscription(USER, 30).await.unwrap();
    for channel in ["@a", "@b", "@c"] {
        ctx.services.settings.add_channel(channel).await.unwrap();
    }
    ctx.membership.join("@b", USER);

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();

    assert_eq!(
        verdict,
        Verdict::Deny(DenyReason::NotSubscribedToChannels(vec!["@a".to_string(), "@c".to_string()]))
    );
}

#[tokio::test]
async fn test_member_of_a_only_is_denied_b() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.settings.add_channel("@A").await.unwrap();
    ctx.services.settings.add_channel("@B").await.unwrap();
    ctx.membership.join("@A", USER);

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();

    assert_eq!(verdict, Verdict::Deny(DenyReason::NotSubscribedToChannels(vec!["@B".to_string()])));
}

#[tokio::test]
async fn test_failed_or_slow_membership_check_counts_as_unsatisfied() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.user_registry.extend_subscription(USER, 30).await.unwrap();
    ctx.services.settings.add_channel("@broken").await.unwrap();
    ctx.services.settings.add_channel("@slow").await.unwrap();
    ctx.membership.set("@broken", ChannelBehavior::Fails);
    ctx.membership.set("@slow", ChannelBehavior::Slow(Duration::from_millis(500)));

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access_within(USER, ActionKind::MovieLookup, Duration::from_millis(50))
        .await
        .unwrap();

    assert_eq!(
        verdict,
        Verdict::Deny(DenyReason::NotSubscribedToChannels(vec![
            "@broken".to_string(),
            "@slow".to_string()
        ]))
    );
}

#[tokio::test]
async fn test_force_subscribe_off_skips_channels() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.user_registry.extend_subscription(USER, 30).await.unwrap();
    ctx.services.settings.add_channel("@kino").await.unwrap();
    ctx.services.settings.set_force_subscribe(false).await.unwrap();

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();

    assert_eq!(verdict, Verdict::Allow);
    assert!(ctx.membership.calls().is_empty());
}

#[tokio::test]
async fn test_lookup_requires_active_subscription() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Deny(DenyReason::SubscriptionExpired));

    ctx.services.user_registry.extend_subscription(USER, 1).await.unwrap();
    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Allow);

    ctx.clock.advance(chrono::Duration::days(1));
    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Deny(DenyReason::SubscriptionExpired));
}

#[tokio::test]
async fn test_payment_submission_never_needs_subscription() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::PaymentSubmission)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Allow);
}

#[tokio::test]
async fn test_lookup_without_subscription_requirement() {
    let mut settings = test_settings();
    settings.access.require_subscription = false;
    let ctx = TestContext::with_settings(settings).await;
    ctx.user(USER).await;

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Allow);
}

#[tokio::test]
async fn test_allow_refreshes_activity() {
    let ctx = TestContext::new().await;
    let before = ctx.user(USER).await;
    ctx.clock.advance(chrono::Duration::hours(5));

    ctx.services
        .access_gate
        .evaluate_access(USER, ActionKind::PaymentSubmission)
        .await
        .unwrap();

    let after = ctx.services.user_registry.get_user(USER).await.unwrap().unwrap();
    assert_eq!(after.last_activity_at, before.last_activity_at + chrono::Duration::hours(5));
}

#[tokio::test]
async fn test_denial_does_not_refresh_activity() {
    let ctx = TestContext::new().await;
    let before = ctx.user(USER).await;
    ctx.clock.advance(chrono::Duration::hours(5));

    ctx.services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();

    let after = ctx.services.user_registry.get_user(USER).await.unwrap().unwrap();
    assert_eq!(after.last_activity_at, before.last_activity_at);
}

#[tokio::test]
async fn test_admin_command_authorization() {
    let ctx = TestContext::new().await;
    let gate = &ctx.services.access_gate;

    assert_eq!(gate.evaluate_access(SUPER_ADMIN, ActionKind::AdminCommand).await.unwrap(), Verdict::Allow);
    assert_eq!(gate.evaluate_access(ADMIN, ActionKind::AdminCommand).await.unwrap(), Verdict::Allow);
    assert_eq!(
        gate.evaluate_access(USER, ActionKind::AdminCommand).await.unwrap(),
        Verdict::Deny(DenyReason::NotAuthorized)
    );
}

#[tokio::test]
async fn test_repeated_admin_denials_auto_block() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.user_registry.extend_subscription(USER, 30).await.unwrap();

    for _ in 0..2 {
        ctx.services
            .access_gate
            .evaluate_access(USER, ActionKind::AdminCommand)
            .await
            .unwrap();
    }
    assert!(!ctx.services.user_registry.is_blocked(USER).await.unwrap());

    ctx.services
        .access_gate
        .evaluate_access(USER, ActionKind::AdminCommand)
        .await
        .unwrap();
    assert!(ctx.services.user_registry.is_blocked(USER).await.unwrap());

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(USER, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Deny(DenyReason::Blocked));
}

#[tokio::test]
async fn test_auto_block_disabled() {
    let mut settings = test_settings();
    settings.access.auto_block_threshold = None;
    let ctx = TestContext::with_settings(settings).await;
    ctx.user(USER).await;

    for _ in 0..10 {
        ctx.services
            .access_gate
            .evaluate_access(USER, ActionKind::AdminCommand)
            .await
            .unwrap();
    }

    let user = ctx.services.user_registry.get_user(USER).await.unwrap().unwrap();
    assert!(!user.is_blocked);
    assert_eq!(user.failed_attempts, 0);
}

#[tokio::test]
async fn test_unknown_user_is_treated_as_fresh() {
    let ctx = TestContext::new().await;

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(77, ActionKind::PaymentSubmission)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Allow);

    let verdict = ctx
        .services
        .access_gate
        .evaluate_access(77, ActionKind::MovieLookup)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Deny(DenyReason::SubscriptionExpired));
    assert!(ctx.services.user_registry.get_user(77).await.unwrap().is_none());
}

#[tokio::test]
async fn test_verdict_maps_to_error_kinds() {
    assert!(Verdict::Allow.into_result(USER).is_ok());
    assert_matches!(
        Verdict::Deny(DenyReason::Blocked).into_result(USER),
        Err(KinoBotError::Blocked { user_id: USER })
    );
    assert_matches!(
        Verdict::Deny(DenyReason::NotSubscribedToChannels(vec!["@b".to_string()])).into_result(USER),
        Err(KinoBotError::NotSubscribedToChannels { channels }) if channels == vec!["@b".to_string()]
    );
    assert_matches!(
        Verdict::Deny(DenyReason::SubscriptionExpired).into_result(USER),
        Err(KinoBotError::SubscriptionExpired { .. })
    );
    assert_matches!(
        Verdict::Deny(DenyReason::NotAuthorized).into_result(USER),
        Err(KinoBotError::NotAuthorized { .. })
    );
}

#[tokio::test]
async fn test_check_channels_reflects_joins_after_denial() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.settings.add_channel("@a").await.unwrap();
    ctx.services.settings.add_channel("@b").await.unwrap();

    let gate = &ctx.services.access_gate;
    assert_eq!(gate.check_channels(USER).await.unwrap(), vec!["@a".to_string(), "@b".to_string()]);

    ctx.membership.join("@a", USER);
    ctx.membership.join("@b", USER);
    assert!(gate.check_channels(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_check_channels_without_force_subscribe() {
    let ctx = TestContext::new().await;
    ctx.user(USER).await;
    ctx.services.settings.add_channel("@a").await.unwrap();
    ctx.services.settings.set_force_subscribe(false).await.unwrap();

    assert!(ctx.services.access_gate.check_channels(USER).await.unwrap().is_empty());
    assert!(ctx.membership.calls().is_empty());
}
