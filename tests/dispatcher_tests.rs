//! Tests for the pause/resume state machine.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use pretty_assertions::assert_eq;

use common::{flaky_hook, shipping_dispatcher, EventLog, FailingResolveStore, SideEffects};
use gatehouse::action::{ApprovalMode, ImageGeneration, ShippingOrder};
use gatehouse::dispatcher::{DispatchEventKind, ResumeDispatcher};
use gatehouse::error::GateError;
use gatehouse::gate::ApprovalGate;
use gatehouse::store::{InMemoryPendingStore, PendingRecord, PendingStore, RecordPhase};
use gatehouse::types::{Confirmation, Outcome, Request, RequestToken, ResultStatus, ToolCall};
use gatehouse::util::retry::RetryPolicy;

#[tokio::test]
async fn small_order_is_auto_approved() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let result = dispatcher
        .dispatch(ToolCall::new(3, "Rotterdam").with_token("t3"))
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Approved);
    assert_eq!(result.outcome, Outcome::AutoApproved);
    assert_eq!(result.result_id.as_deref(), Some("ORD-3-AUTO"));
    assert_eq!(result.message, "Order auto-approved: 3 containers to Rotterdam");
    assert_eq!(effects.modes(), vec![ApprovalMode::Auto]);
}

#[tokio::test]
async fn threshold_itself_is_auto_approved() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let result = dispatcher.dispatch(ToolCall::new(5, "Oslo")).await.unwrap();
    assert_eq!(result.result_id.as_deref(), Some("ORD-5-AUTO"));
}

#[tokio::test]
async fn large_order_pauses_then_approves() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let paused = dispatcher
        .dispatch(ToolCall::new(7, "Rotterdam").with_token("t7"))
        .await
        .unwrap();
    assert!(paused.is_pending());
    assert_eq!(paused.token, "t7");
    assert_eq!(paused.message, "Order for 7 containers requires approval");
    assert_eq!(
        paused.hint.as_deref(),
        Some("Large order: 7 containers to Rotterdam. Do you want to approve?")
    );
    assert_eq!(effects.count(), 0);
    assert_eq!(
        dispatcher.status("t7").await.unwrap(),
        RecordPhase::AwaitingConfirmation
    );

    let approved = dispatcher
        .dispatch(
            ToolCall::new(7, "Rotterdam")
                .with_token("t7")
                .with_decision(Confirmation::approve()),
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ResultStatus::Approved);
    assert_eq!(approved.outcome, Outcome::Approved);
    assert_eq!(approved.result_id.as_deref(), Some("ORD-7-HUMAN"));
    assert_eq!(approved.message, "Order approved: 7 containers to Rotterdam");
    assert_eq!(effects.modes(), vec![ApprovalMode::Human]);
    assert_eq!(dispatcher.status("t7").await.unwrap(), RecordPhase::Resolved);
}

#[tokio::test]
async fn rejection_never_runs_the_action() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let paused = dispatcher.dispatch(ToolCall::new(9, "Lagos")).await.unwrap();
    let rejected = dispatcher
        .resume(&paused.token, Confirmation::reject().with_note("too many"))
        .await
        .unwrap();

    assert_eq!(rejected.status, ResultStatus::Rejected);
    assert_eq!(rejected.result_id, None);
    assert_eq!(rejected.message, "Order rejected: 9 containers to Lagos");
    assert_eq!(effects.count(), 0);
}

#[tokio::test]
async fn resolved_tokens_replay_without_side_effects() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    dispatcher
        .dispatch(ToolCall::new(7, "Rotterdam").with_token("approve-me"))
        .await
        .unwrap();
    let first = dispatcher
        .resume("approve-me", Confirmation::approve())
        .await
        .unwrap();
    // A later contradicting decision replays the original outcome.
    let again = dispatcher
        .resume("approve-me", Confirmation::reject())
        .await
        .unwrap();
    let resubmitted = dispatcher
        .dispatch(ToolCall::new(7, "Rotterdam").with_token("approve-me"))
        .await
        .unwrap();

    assert_eq!(again, first);
    assert_eq!(resubmitted, first);
    assert_eq!(effects.count(), 1);

    dispatcher
        .dispatch(ToolCall::new(8, "Rotterdam").with_token("reject-me"))
        .await
        .unwrap();
    let rejected = dispatcher
        .resume("reject-me", Confirmation::reject())
        .await
        .unwrap();
    let replayed = dispatcher
        .resume("reject-me", Confirmation::approve())
        .await
        .unwrap();
    assert_eq!(replayed, rejected);
    assert_eq!(effects.count(), 1);
}

#[tokio::test]
async fn auto_approved_token_replays() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let call = ToolCall::new(2, "Hamburg").with_token("small");
    let first = dispatcher.dispatch(call.clone()).await.unwrap();
    let second = dispatcher.dispatch(call).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(effects.count(), 1);
}

#[tokio::test]
async fn repolling_a_paused_token_stays_pending() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let call = ToolCall::new(7, "Rotterdam").with_token("poll");
    let first = dispatcher.dispatch(call.clone()).await.unwrap();
    let second = dispatcher.dispatch(call).await.unwrap();

    assert!(second.is_pending());
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let err = dispatcher
        .resume("ghost", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound { ref token } if token == "ghost"));

    let err = dispatcher
        .dispatch(
            ToolCall::new(7, "Rotterdam")
                .with_token("ghost")
                .with_decision(Confirmation::approve()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound { .. }));
    assert_eq!(effects.count(), 0);
}

#[tokio::test]
async fn decision_without_token_is_invalid() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    let err = dispatcher
        .dispatch(ToolCall::new(7, "Rotterdam").with_decision(Confirmation::approve()))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::InvalidInput(_)));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected_before_any_state_change() {
    let effects = SideEffects::new();
    let (dispatcher, store) = shipping_dispatcher(&effects);

    for quantity in [0, -3] {
        let err = dispatcher
            .dispatch(ToolCall::new(quantity, "Rotterdam").with_token("bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidQuantity(q) if q == quantity));
    }
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(effects.count(), 0);
}

#[tokio::test]
async fn differing_payload_under_a_live_token_conflicts() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);

    dispatcher
        .dispatch(ToolCall::new(7, "Rotterdam").with_token("t"))
        .await
        .unwrap();

    let err = dispatcher
        .dispatch(ToolCall::new(70, "Rotterdam").with_token("t"))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Conflict { .. }));

    let err = dispatcher
        .dispatch(
            ToolCall::new(7, "Antwerp")
                .with_token("t")
                .with_decision(Confirmation::approve()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Conflict { .. }));
    assert_eq!(effects.count(), 0);
}

#[tokio::test]
async fn token_from_another_action_conflicts() {
    let effects = SideEffects::new();
    let (shipping, store) = shipping_dispatcher(&effects);
    let images = ResumeDispatcher::new(
        Arc::new(ImageGeneration::new()),
        store as Arc<dyn PendingStore>,
        ApprovalGate::new(1),
    );

    shipping
        .dispatch(ToolCall::new(7, "Rotterdam").with_token("shared"))
        .await
        .unwrap();
    let err = images
        .resume("shared", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Conflict { .. }));
}

#[tokio::test]
async fn concurrent_approvals_run_the_action_once() {
    let effects = SideEffects::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);
    let dispatcher = Arc::new(dispatcher);

    dispatcher
        .dispatch(ToolCall::new(12, "Singapore").with_token("race"))
        .await
        .unwrap();

    let tasks = (0..8).map(|_| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.resume("race", Confirmation::approve()).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(effects.count(), 1);
    for result in &results {
        assert_eq!(result.result_id.as_deref(), Some("ORD-12-HUMAN"));
    }
}

#[tokio::test]
async fn expired_requests_are_reclaimed() {
    let effects = SideEffects::new();
    let (dispatcher, store) = shipping_dispatcher(&effects);
    let dispatcher = dispatcher.with_expiry(Some(Duration::from_secs(60)));

    let mut stale = Request::new(
        RequestToken::new("stale").unwrap(),
        ShippingOrder::NAME,
        7,
        "Rotterdam",
    );
    stale.created_at = Utc::now() - chrono::Duration::minutes(5);
    store
        .put(PendingRecord::awaiting(stale, "Order for 7 containers requires approval", None))
        .await
        .unwrap();
    dispatcher
        .dispatch(ToolCall::new(8, "Rotterdam").with_token("fresh"))
        .await
        .unwrap();

    assert_eq!(dispatcher.status("stale").await.unwrap(), RecordPhase::New);
    assert_eq!(dispatcher.reclaim_expired().await.unwrap(), 1);
    assert_eq!(
        dispatcher.status("fresh").await.unwrap(),
        RecordPhase::AwaitingConfirmation
    );

    let err = dispatcher
        .resume("stale", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound { .. }));
    assert_eq!(effects.count(), 0);
}

#[tokio::test]
async fn resuming_an_expired_token_is_not_found() {
    let effects = SideEffects::new();
    let (dispatcher, store) = shipping_dispatcher(&effects);
    let dispatcher = dispatcher.with_expiry(Some(Duration::from_secs(1)));

    let mut stale = Request::new(RequestToken::new("late").unwrap(), ShippingOrder::NAME, 7, "Rotterdam");
    stale.created_at = Utc::now() - chrono::Duration::seconds(30);
    store
        .put(PendingRecord::awaiting(stale, "pending", None))
        .await
        .unwrap();

    let err = dispatcher
        .resume("late", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound { .. }));
    assert!(store.get(&RequestToken::new("late").unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn events_follow_transitions() {
    let effects = SideEffects::new();
    let log = EventLog::new();
    let (dispatcher, _) = shipping_dispatcher(&effects);
    let dispatcher = dispatcher.with_event_sink(Some(log.sink()));

    dispatcher
        .dispatch(ToolCall::new(1, "Oslo").with_token("a"))
        .await
        .unwrap();
    dispatcher
        .dispatch(ToolCall::new(7, "Oslo").with_token("b"))
        .await
        .unwrap();
    dispatcher.resume("b", Confirmation::approve()).await.unwrap();
    dispatcher.resume("b", Confirmation::approve()).await.unwrap();

    let kinds: Vec<_> = log.events().into_iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DispatchEventKind::AutoApproved {
                result_id: "ORD-1-AUTO".into()
            },
            DispatchEventKind::Paused {
                hint: "Large order: 7 containers to Oslo. Do you want to approve?".into()
            },
            DispatchEventKind::Resolved {
                outcome: Outcome::Approved,
                result_id: Some("ORD-7-HUMAN".into())
            },
            DispatchEventKind::Replayed {
                outcome: Outcome::Approved
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn transient_action_failures_are_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let action = Arc::new(ShippingOrder::new().with_hook(flaky_hook(2, Arc::clone(&attempts))));
    let dispatcher = ResumeDispatcher::new(
        action,
        Arc::new(InMemoryPendingStore::new()),
        ApprovalGate::new(5),
    )
    .with_retry(RetryPolicy {
        max_attempts: 4,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(100),
        multiplier: 2.0,
    });

    let result = dispatcher.dispatch(ToolCall::new(2, "Oslo")).await.unwrap();

    assert_eq!(result.result_id.as_deref(), Some("ORD-2-AUTO"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_approval_leaves_the_request_awaiting() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let action = Arc::new(ShippingOrder::new().with_hook(flaky_hook(1, Arc::clone(&attempts))));
    let dispatcher = ResumeDispatcher::new(
        action,
        Arc::new(InMemoryPendingStore::new()),
        ApprovalGate::new(5),
    );

    dispatcher
        .dispatch(ToolCall::new(7, "Oslo").with_token("retry-later"))
        .await
        .unwrap();
    let err = dispatcher
        .resume("retry-later", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        dispatcher.status("retry-later").await.unwrap(),
        RecordPhase::AwaitingConfirmation
    );

    let approved = dispatcher
        .resume("retry-later", Confirmation::approve())
        .await
        .unwrap();
    assert_eq!(approved.result_id.as_deref(), Some("ORD-7-HUMAN"));
}

fn dispatcher_over(store: &Arc<FailingResolveStore>, effects: &SideEffects) -> ResumeDispatcher {
    ResumeDispatcher::new(
        Arc::new(ShippingOrder::new().with_hook(effects.hook())),
        Arc::clone(store) as Arc<dyn PendingStore>,
        ApprovalGate::new(5),
    )
}

#[tokio::test]
async fn approval_whose_outcome_was_not_recorded_never_reruns() {
    let effects = SideEffects::new();
    let store = Arc::new(FailingResolveStore::new());
    let dispatcher = dispatcher_over(&store, &effects);

    dispatcher
        .dispatch(ToolCall::new(7, "Oslo").with_token("t7"))
        .await
        .unwrap();
    store.fail_resolve(true);
    let err = dispatcher
        .resume("t7", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Storage(_)));
    assert_eq!(effects.count(), 1);
    assert_eq!(dispatcher.status("t7").await.unwrap(), RecordPhase::Executing);

    store.fail_resolve(false);
    let err = dispatcher
        .resume("t7", Confirmation::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Interrupted { .. }));
    assert!(!err.is_retryable());

    let err = dispatcher
        .dispatch(ToolCall::new(7, "Oslo").with_token("t7"))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Interrupted { .. }));
    assert_eq!(effects.count(), 1);
}

#[tokio::test]
async fn auto_approval_whose_outcome_was_not_recorded_never_reruns() {
    let effects = SideEffects::new();
    let store = Arc::new(FailingResolveStore::new());
    let dispatcher = dispatcher_over(&store, &effects);

    store.fail_resolve(true);
    let err = dispatcher
        .dispatch(ToolCall::new(3, "Oslo").with_token("t3"))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Storage(_)));
    assert_eq!(effects.count(), 1);

    store.fail_resolve(false);
    let err = dispatcher
        .dispatch(ToolCall::new(3, "Oslo").with_token("t3"))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Interrupted { .. }));
    assert_eq!(effects.count(), 1);
}

#[tokio::test]
async fn failed_auto_approval_can_be_submitted_again() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let action = Arc::new(ShippingOrder::new().with_hook(flaky_hook(1, Arc::clone(&attempts))));
    let dispatcher = ResumeDispatcher::new(
        action,
        Arc::new(InMemoryPendingStore::new()),
        ApprovalGate::new(5),
    );

    let err = dispatcher
        .dispatch(ToolCall::new(2, "Oslo").with_token("t2"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(dispatcher.status("t2").await.unwrap(), RecordPhase::New);

    let approved = dispatcher
        .dispatch(ToolCall::new(2, "Oslo").with_token("t2"))
        .await
        .unwrap();
    assert_eq!(approved.result_id.as_deref(), Some("ORD-2-AUTO"));
}

#[tokio::test]
async fn image_generation_pauses_above_one() {
    let dispatcher = ResumeDispatcher::new(
        Arc::new(ImageGeneration::new()),
        Arc::new(InMemoryPendingStore::new()),
        ApprovalGate::new(1),
    );

    let single = dispatcher
        .dispatch(ToolCall::new(1, "a lighthouse at dusk"))
        .await
        .unwrap();
    assert_eq!(single.result_id.as_deref(), Some("IMG-1-AUTO"));

    let several = dispatcher
        .dispatch(ToolCall::new(4, "a lighthouse at dusk"))
        .await
        .unwrap();
    assert!(several.is_pending());
}
