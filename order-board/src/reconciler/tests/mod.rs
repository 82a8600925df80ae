use super::*;
use crate::store::SyncState;
use shared::order::OrderChannel;

mod test_remote;

const T0: i64 = 1_700_000_000_000;

fn create_test_reconciler() -> Reconciler {
    Reconciler::new(64)
}

fn table_order(id: &str, table_id: &str) -> OrderSnapshot {
    OrderSnapshot::new(id, format!("#{}", id), OrderChannel::TableService, T0).at_table(table_id)
}

fn takeaway_order(id: &str) -> OrderSnapshot {
    OrderSnapshot::new(id, format!("#{}", id), OrderChannel::Takeaway, T0)
}

fn with_status(mut order: OrderSnapshot, status: OrderStatus) -> OrderSnapshot {
    order.status = status;
    order
}

/// Reconciler tracking the given orders as confirmed
fn reconciler_with(orders: Vec<OrderSnapshot>) -> Reconciler {
    let mut reconciler = create_test_reconciler();
    for order in orders {
        assert!(reconciler.adopt(order).unwrap());
    }
    reconciler
}

/// Request + successful ack
fn transition_ok(reconciler: &mut Reconciler, id: &str, target: OrderStatus, now: i64) -> WriteOutcome {
    let req = reconciler.request_transition(id, target, now).unwrap();
    reconciler.complete_write(id, req.write_id, Ok(()))
}

fn status_of(reconciler: &Reconciler, id: &str) -> Option<OrderStatus> {
    reconciler.store().get(id).map(|e| e.order.status)
}
