//! Read-only board projection for the UI

use crate::elapsed::{self, ElapsedTime};
use crate::store::OrderStore;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::order::{OrderChannel, OrderStatus};

/// One active order as the board shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCard {
    pub order_id: String,
    pub display_number: String,
    pub status: OrderStatus,
    pub channel: OrderChannel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendant_name: Option<String>,
    pub created_at: i64,
    pub paid: bool,
    pub item_count: i32,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<ElapsedTime>,
    /// "MM:SS", or "60:00+" past the cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_display: Option<String>,
    /// An optimistic write for this order is unconfirmed
    pub syncing: bool,
}

impl OrderCard {
    fn set_elapsed(&mut self, elapsed: Option<ElapsedTime>) {
        self.elapsed_display = elapsed.map(|e| e.to_string());
        self.elapsed = elapsed;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardView {
    /// Time the elapsed values were computed at (Unix millis)
    pub now: i64,
    pub orders: Vec<OrderCard>,
}

impl BoardView {
    /// Project the store at `now`, oldest order first
    pub fn render(store: &OrderStore, now: i64) -> Self {
        let syncing = store.pending_ids();
        let orders = store
            .snapshot()
            .into_iter()
            .map(|order| {
                let mut card = OrderCard {
                    syncing: syncing.contains(&order.order_id),
                    item_count: order.items.iter().map(|i| i.quantity).sum(),
                    total: order.totals.total,
                    elapsed: None,
                    elapsed_display: None,
                    order_id: order.order_id.clone(),
                    display_number: order.display_number.clone(),
                    status: order.status,
                    channel: order.channel,
                    table_id: order.table_ref().map(str::to_string),
                    attendant_name: order.attendant_name.clone(),
                    created_at: order.created_at,
                    paid: order.paid,
                };
                card.set_elapsed(elapsed::for_order(&order, now));
                card
            })
            .collect();

        Self { now, orders }
    }

    /// Recompute elapsed time only; order data is unchanged
    pub fn retick(&mut self, now: i64) {
        self.now = now;
        for card in &mut self.orders {
            card.set_elapsed(elapsed::elapsed_time(Some(card.created_at), None, card.status, now));
        }
    }

    pub fn get(&self, order_id: &str) -> Option<&OrderCard> {
        self.orders.iter().find(|c| c.order_id == order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elapsed::UrgencyTier;
    use crate::reconciler::Reconciler;
    use shared::order::{LineItem, OrderSnapshot};

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_render_marks_syncing_and_elapsed() {
        let mut reconciler = Reconciler::new(16);
        let mut early = OrderSnapshot::new("a", "#1", OrderChannel::TableService, T0).at_table("T1");
        early.items.push(LineItem::new("Paella", 2, Decimal::new(1450, 2)));
        early.totals.total = Decimal::new(2900, 2);
        reconciler.adopt(early).unwrap();
        reconciler
            .adopt(OrderSnapshot::new("b", "#2", OrderChannel::Takeaway, T0 + 60_000))
            .unwrap();
        reconciler
            .request_transition("b", OrderStatus::Preparing, T0)
            .unwrap();

        let view = BoardView::render(reconciler.store(), T0 + 21 * 60 * 1000);
        assert_eq!(view.len(), 2);
        assert_eq!(view.orders[0].order_id, "a");

        let a = view.get("a").unwrap();
        assert!(!a.syncing);
        assert_eq!(a.item_count, 2);
        assert_eq!(a.total, Decimal::new(2900, 2));
        assert_eq!(a.table_id.as_deref(), Some("T1"));
        assert_eq!(a.elapsed.unwrap().urgency, UrgencyTier::Warning);
        assert_eq!(a.elapsed_display.as_deref(), Some("21:00"));

        let b = view.get("b").unwrap();
        assert!(b.syncing);
        assert_eq!(b.status, OrderStatus::Preparing);
        assert_eq!(b.elapsed_display.as_deref(), Some("20:00"));
    }

    #[test]
    fn test_retick_moves_elapsed_only() {
        let mut reconciler = Reconciler::new(16);
        reconciler
            .adopt(OrderSnapshot::new("a", "#1", OrderChannel::Delivery, T0))
            .unwrap();

        let mut view = BoardView::render(reconciler.store(), T0);
        assert_eq!(view.orders[0].elapsed_display.as_deref(), Some("00:00"));

        view.retick(T0 + 2 * 60 * 60 * 1000);
        assert_eq!(view.orders[0].elapsed_display.as_deref(), Some("60:00+"));
        assert_eq!(view.orders[0].elapsed.unwrap().urgency, UrgencyTier::Critical);
        assert_eq!(view.orders[0].status, OrderStatus::Pending);
    }

    #[test]
    fn test_serializes_for_ui() {
        let mut reconciler = Reconciler::new(16);
        reconciler
            .adopt(OrderSnapshot::new("a", "#7", OrderChannel::Takeaway, T0))
            .unwrap();
        let view = BoardView::render(reconciler.store(), T0 + 125_000);

        let json = serde_json::to_value(&view).unwrap();
        let card = &json["orders"][0];
        assert_eq!(card["status"], "PENDING");
        assert_eq!(card["elapsed_display"], "02:05");
        assert_eq!(card["elapsed"]["urgency"], "nominal");
        assert!(card.get("table_id").is_none());
    }
}
