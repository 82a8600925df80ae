use super::*;


#[test]
fn test_remote_insert_adds_active_order() {
    let mut reconciler = create_test_reconciler();
    let outcome = reconciler.apply_remote_event(&ChangeEvent::insert(takeaway_order("R1")));
    assert_eq!(outcome, RemoteOutcome::Inserted("R1".to_string()));
    assert_eq!(status_of(&reconciler, "R1"), Some(OrderStatus::Pending));
}


#[test]
fn test_local_creation_then_remote_insert_dedupes() {
    let mut reconciler = create_test_reconciler();
    let order = takeaway_order("R2");
    assert!(reconciler.adopt(order.clone()).unwrap());

    let outcome = reconciler.apply_remote_event(&ChangeEvent::insert(order));
    assert_eq!(outcome, RemoteOutcome::Ignored);
    assert_eq!(reconciler.store().len(), 1);
}


#[test]
fn test_remote_insert_of_finalized_order_is_not_tracked() {
    let mut reconciler = create_test_reconciler();
    let done = with_status(takeaway_order("R3"), OrderStatus::Cancelled);
    assert_eq!(
        reconciler.apply_remote_event(&ChangeEvent::insert(done)),
        RemoteOutcome::Ignored
    );
    assert!(reconciler.store().is_empty());
    // and a stale active insert afterwards cannot resurrect it
    reconciler.apply_remote_event(&ChangeEvent::insert(takeaway_order("R3")));
    assert!(reconciler.store().is_empty());
}


#[test]
fn test_remote_update_merges_fields() {
    let mut reconciler = reconciler_with(vec![takeaway_order("U1")]);
    let mut remote = with_status(takeaway_order("U1"), OrderStatus::Preparing);
    remote.attendant_name = Some("Ana".to_string());
    remote.paid = true;

    let outcome = reconciler.apply_remote_event(&ChangeEvent::update(None, remote));
    assert_eq!(outcome, RemoteOutcome::Merged("U1".to_string()));

    let entry = reconciler.store().get("U1").unwrap();
    assert_eq!(entry.order.status, OrderStatus::Preparing);
    assert_eq!(entry.order.attendant_name.as_deref(), Some("Ana"));
    assert!(entry.order.paid);
}


#[test]
fn test_stale_active_update_never_moves_status_back() {
    let mut reconciler = reconciler_with(vec![takeaway_order("U2")]);
    transition_ok(&mut reconciler, "U2", OrderStatus::Preparing, T0);
    transition_ok(&mut reconciler, "U2", OrderStatus::Ready, T0);

    let stale = takeaway_order("U2");
    reconciler.apply_remote_event(&ChangeEvent::update(None, stale));
    assert_eq!(status_of(&reconciler, "U2"), Some(OrderStatus::Ready));
}


#[test]
fn test_update_for_untracked_order_is_a_gap() {
    let mut reconciler = create_test_reconciler();
    let remote = with_status(takeaway_order("U3"), OrderStatus::Ready);
    let outcome = reconciler.apply_remote_event(&ChangeEvent::update(None, remote));
    assert_eq!(outcome, RemoteOutcome::Gap("U3".to_string()));
    assert!(reconciler.store().is_empty());
}


#[test]
fn test_remote_finalization_removes_order() {
    let mut reconciler = reconciler_with(vec![table_order("F1", "T3")]);
    let mut remote = with_status(table_order("F1", "T3"), OrderStatus::Delivered);
    remote.finalized_at = Some(T0 + 90_000);
    remote.elapsed_seconds = Some(90);

    match reconciler.apply_remote_event(&ChangeEvent::update(None, remote)) {
        RemoteOutcome::Finalized(order) => {
            assert_eq!(order.status, OrderStatus::Delivered);
            assert_eq!(order.table_ref(), Some("T3"));
        }
        other => panic!("expected Finalized, got {:?}", other),
    }
    assert!(reconciler.store().is_empty());

    let tombstone = reconciler.finalized("F1").unwrap();
    assert_eq!(tombstone.status, Some(OrderStatus::Delivered));
    assert_eq!(tombstone.finalized_at, Some(T0 + 90_000));
}


#[test]
fn test_repeated_terminal_event_is_a_noop() {
    let mut reconciler = reconciler_with(vec![takeaway_order("F2")]);
    let remote = with_status(takeaway_order("F2"), OrderStatus::Voided);
    let event = ChangeEvent::update(None, remote);

    assert!(matches!(
        reconciler.apply_remote_event(&event),
        RemoteOutcome::Finalized(_)
    ));
    assert_eq!(reconciler.apply_remote_event(&event), RemoteOutcome::Ignored);
    assert_eq!(reconciler.apply_remote_event(&event), RemoteOutcome::Ignored);
    assert!(reconciler.store().is_empty());
}


#[test]
fn test_stale_pending_event_after_removal_is_ignored() {
    let mut reconciler = reconciler_with(vec![takeaway_order("F3")]);
    transition_ok(&mut reconciler, "F3", OrderStatus::Preparing, T0);
    transition_ok(&mut reconciler, "F3", OrderStatus::Ready, T0);
    transition_ok(&mut reconciler, "F3", OrderStatus::Delivered, T0 + 1_000);

    let stale = takeaway_order("F3");
    assert_eq!(
        reconciler.apply_remote_event(&ChangeEvent::update(None, stale.clone())),
        RemoteOutcome::Ignored
    );
    assert_eq!(
        reconciler.apply_remote_event(&ChangeEvent::insert(stale)),
        RemoteOutcome::Ignored
    );
    assert!(reconciler.store().is_empty());
}


#[test]
fn test_racing_finalizations_keep_first_timing() {
    // local finalization first, remote echo with different timing second
    let mut reconciler = reconciler_with(vec![takeaway_order("W1")]);
    let local_now = T0 + 300_000;
    let req = reconciler
        .request_transition("W1", OrderStatus::Cancelled, local_now)
        .unwrap();

    let mut remote = with_status(takeaway_order("W1"), OrderStatus::Voided);
    remote.finalized_at = Some(T0 + 999_000);
    remote.elapsed_seconds = Some(999);
    reconciler.apply_remote_event(&ChangeEvent::update(None, remote.clone()));

    let tombstone = reconciler.finalized("W1").unwrap().clone();
    assert_eq!(tombstone.finalized_at, Some(local_now));
    assert_eq!(tombstone.elapsed_seconds, Some(300));

    // the ack still produces exactly one finalization
    assert!(matches!(
        reconciler.complete_write("W1", req.write_id, Ok(())),
        WriteOutcome::Finalized(_)
    ));
    reconciler.apply_remote_event(&ChangeEvent::update(None, remote));
    assert_eq!(reconciler.finalized("W1"), Some(&tombstone));
    assert!(matches!(
        reconciler.complete_write("W1", req.write_id, Ok(())),
        WriteOutcome::Superseded { .. }
    ));
}


#[test]
fn test_remote_terminal_wins_over_pending_local_write() {
    let mut reconciler = reconciler_with(vec![takeaway_order("W2")]);
    transition_ok(&mut reconciler, "W2", OrderStatus::Preparing, T0);
    let req = reconciler
        .request_transition("W2", OrderStatus::Ready, T0)
        .unwrap();

    let remote = with_status(takeaway_order("W2"), OrderStatus::Cancelled);
    assert!(matches!(
        reconciler.apply_remote_event(&ChangeEvent::update(None, remote)),
        RemoteOutcome::Finalized(order) if order.status == OrderStatus::Cancelled
    ));

    // failed ack cannot bring it back
    let outcome = reconciler.complete_write("W2", req.write_id, Err(anyhow::anyhow!("conflict")));
    assert!(matches!(outcome, WriteOutcome::Superseded { error: Some(_), .. }));
    assert!(reconciler.store().is_empty());

    // later local action is rejected
    assert_eq!(
        reconciler
            .request_transition("W2", OrderStatus::Delivered, T0)
            .unwrap_err(),
        TransitionError::OrderFinalized("W2".to_string())
    );
}


#[test]
fn test_remote_finalization_during_local_finalization_failure() {
    let mut reconciler = reconciler_with(vec![takeaway_order("W3")]);
    let req = reconciler
        .request_transition("W3", OrderStatus::Voided, T0)
        .unwrap();
    let remote = with_status(takeaway_order("W3"), OrderStatus::Cancelled);
    reconciler.apply_remote_event(&ChangeEvent::update(None, remote));

    // the order still left the board through a finalization
    let outcome = reconciler.complete_write("W3", req.write_id, Err(anyhow::anyhow!("conflict")));
    assert!(matches!(outcome, WriteOutcome::Finalized(_)));
    assert!(!reconciler.store().contains("W3"));

    assert!(matches!(
        reconciler.complete_write("W3", req.write_id, Ok(())),
        WriteOutcome::Superseded { .. }
    ));
}


#[test]
fn test_remote_delete_during_local_finalization_failure() {
    let mut reconciler = reconciler_with(vec![table_order("W4", "T6")]);
    let req = reconciler
        .request_transition("W4", OrderStatus::Delivered, T0)
        .unwrap();
    reconciler.apply_remote_event(&ChangeEvent::delete(table_order("W4", "T6")));

    let outcome = reconciler.complete_write("W4", req.write_id, Err(anyhow::anyhow!("gone")));
    assert!(matches!(outcome, WriteOutcome::Superseded { error: Some(_), .. }));
    assert!(!reconciler.store().contains("W4"));
}


#[test]
fn test_remote_update_during_pending_write_keeps_optimistic_status() {
    let mut reconciler = reconciler_with(vec![takeaway_order("P1")]);
    let req = reconciler
        .request_transition("P1", OrderStatus::Preparing, T0)
        .unwrap();

    // unrelated field change arrives before our ack
    let mut remote = takeaway_order("P1");
    remote.attendant_name = Some("Joan".to_string());
    reconciler.apply_remote_event(&ChangeEvent::update(None, remote));

    let entry = reconciler.store().get("P1").unwrap();
    assert_eq!(entry.order.status, OrderStatus::Preparing);
    assert_eq!(entry.order.attendant_name.as_deref(), Some("Joan"));
    assert!(entry.sync.is_pending());

    // on failure the fresher remote data is kept, the speculative status is not
    reconciler.complete_write("P1", req.write_id, Err(anyhow::anyhow!("timeout")));
    let entry = reconciler.store().get("P1").unwrap();
    assert_eq!(entry.order.status, OrderStatus::Pending);
    assert_eq!(entry.order.attendant_name.as_deref(), Some("Joan"));
}


#[test]
fn test_remote_delete_is_unconditional_and_idempotent() {
    let mut reconciler = reconciler_with(vec![takeaway_order("X1")]);
    transition_ok(&mut reconciler, "X1", OrderStatus::Preparing, T0);

    let event = ChangeEvent::delete(takeaway_order("X1"));
    assert_eq!(
        reconciler.apply_remote_event(&event),
        RemoteOutcome::Removed("X1".to_string())
    );
    assert_eq!(reconciler.apply_remote_event(&event), RemoteOutcome::Ignored);
    assert_eq!(reconciler.finalized("X1").unwrap().status, None);

    assert_eq!(
        reconciler.apply_remote_event(&ChangeEvent::insert(takeaway_order("X1"))),
        RemoteOutcome::Ignored
    );
}


#[test]
fn test_event_without_snapshot_is_ignored() {
    let mut reconciler = create_test_reconciler();
    let event = ChangeEvent {
        kind: ChangeKind::Update,
        before: None,
        after: None,
    };
    assert_eq!(reconciler.apply_remote_event(&event), RemoteOutcome::Ignored);
}
