//! Order snapshot - the order as the persistence layer reports it
//!
//! Snapshots are what `fetchActiveOrders` returns and what the change feed
//! carries in `before`/`after`. The board keeps them in memory and mutates
//! only `status`, `paid`, `finalized_at` and `elapsed_seconds`.

use super::types::{LineItem, OrderChannel, OrderTotals};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
///
/// ```text
/// Pending ─► Preparing ─► Ready ─► Delivered
///    │           │          │
///    └───────────┴──────────┴──► Cancelled | Voided
/// ```
///
/// Steps along the top row may be skipped but never reversed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    Voided,
}

impl OrderStatus {
    /// Terminal states; an order in one of these leaves the active set
    pub const FINALIZED: [OrderStatus; 3] = [
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Voided,
    ];

    pub fn is_finalized(&self) -> bool {
        Self::FINALIZED.contains(self)
    }

    pub fn is_active(&self) -> bool {
        !self.is_finalized()
    }

    /// Position along the lifecycle. Finalized states share the top rank.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Voided => 3,
        }
    }

    /// Whether `target` is reachable from `self`
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, target) {
            (Pending | Preparing | Ready, Cancelled | Voided) => true,
            (Pending | Preparing | Ready, Preparing | Ready | Delivered) => {
                target.rank() > self.rank()
            }
            _ => false,
        }
    }

    /// The further-along of two statuses (never moves a finalized status back)
    pub fn furthest(self, other: OrderStatus) -> OrderStatus {
        if other.rank() > self.rank() { other } else { self }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Voided => "VOIDED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Order ID (assigned by the persistence layer)
    pub order_id: String,
    /// Human-facing order number
    pub display_number: String,
    pub status: OrderStatus,
    pub channel: OrderChannel,
    /// Table reference, only for table-service orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    /// Attendant name snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendant_name: Option<String>,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Set once, when the order first reaches a finalized status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<i64>,
    /// Frozen preparation time in seconds, set together with `finalized_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub totals: OrderTotals,
    /// Last update timestamp (Unix millis)
    #[serde(default)]
    pub updated_at: i64,
}

impl OrderSnapshot {
    /// Create a new pending order
    pub fn new(
        order_id: impl Into<String>,
        display_number: impl Into<String>,
        channel: OrderChannel,
        created_at: i64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            display_number: display_number.into(),
            status: OrderStatus::Pending,
            channel,
            table_id: None,
            attendant_name: None,
            created_at,
            finalized_at: None,
            elapsed_seconds: None,
            paid: false,
            items: Vec::new(),
            totals: OrderTotals::default(),
            updated_at: created_at,
        }
    }

    /// Attach a table (ignored unless the channel is table service)
    pub fn at_table(mut self, table_id: impl Into<String>) -> Self {
        if self.channel == OrderChannel::TableService {
            self.table_id = Some(table_id.into());
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_finalized(&self) -> bool {
        self.status.is_finalized()
    }

    /// Table to release when this order is finalized
    pub fn table_ref(&self) -> Option<&str> {
        match self.channel {
            OrderChannel::TableService => self.table_id.as_deref(),
            _ => None,
        }
    }

    /// Merge a newer remote snapshot into this one.
    ///
    /// Remote data wins for every field except the write-once timing fields,
    /// which keep the first value seen, and `status`, which never moves back.
    pub fn merge_remote(&mut self, remote: &OrderSnapshot) {
        let status = self.status.furthest(remote.status);
        let finalized_at = self.finalized_at.or(remote.finalized_at);
        let elapsed_seconds = self.elapsed_seconds.or(remote.elapsed_seconds);
        *self = remote.clone();
        self.status = status;
        self.finalized_at = finalized_at;
        self.elapsed_seconds = elapsed_seconds;
    }
}

/// Partial-field write handed to the persistence layer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn paid(paid: bool) -> Self {
        Self {
            paid: Some(paid),
            ..Default::default()
        }
    }

    /// Apply to a snapshot. Timing fields are only written if still unset.
    pub fn apply_to(&self, order: &mut OrderSnapshot) {
        if let Some(status) = self.status {
            order.status = order.status.furthest(status);
        }
        if let Some(paid) = self.paid {
            order.paid = paid;
        }
        if order.finalized_at.is_none() {
            order.finalized_at = self.finalized_at;
        }
        if order.elapsed_seconds.is_none() {
            order.elapsed_seconds = self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_graph() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Voided));
        assert!(Ready.can_transition_to(Cancelled));
        // forward skips are allowed
        assert!(Pending.can_transition_to(Ready));
        assert!(Preparing.can_transition_to(Delivered));

        assert!(!Ready.can_transition_to(Preparing));
        assert!(!Preparing.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Ready.can_transition_to(Ready));
        for finalized in OrderStatus::FINALIZED {
            for target in [Pending, Preparing, Ready, Delivered, Cancelled, Voided] {
                assert!(!finalized.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"PREPARING\"");
        let status: OrderStatus = serde_json::from_str("\"VOIDED\"").unwrap();
        assert_eq!(status, OrderStatus::Voided);
    }

    #[test]
    fn test_table_ref_only_for_table_service() {
        let order = OrderSnapshot::new("o1", "12", OrderChannel::TableService, 0).at_table("T7");
        assert_eq!(order.table_ref(), Some("T7"));

        let mut takeaway = OrderSnapshot::new("o2", "13", OrderChannel::Takeaway, 0).at_table("T7");
        assert_eq!(takeaway.table_id, None);
        takeaway.table_id = Some("T7".to_string());
        assert_eq!(takeaway.table_ref(), None);
    }

    #[test]
    fn test_merge_remote_keeps_status_and_timing() {
        let mut local = OrderSnapshot::new("o1", "12", OrderChannel::Takeaway, 0);
        local.status = OrderStatus::Ready;
        local.finalized_at = Some(10);

        let mut remote = local.clone();
        remote.status = OrderStatus::Preparing;
        remote.finalized_at = Some(99);
        remote.attendant_name = Some("Marta".to_string());
        remote.paid = true;

        local.merge_remote(&remote);
        assert_eq!(local.status, OrderStatus::Ready);
        assert_eq!(local.finalized_at, Some(10));
        assert_eq!(local.attendant_name.as_deref(), Some("Marta"));
        assert!(local.paid);
    }

    #[test]
    fn test_patch_timing_is_write_once() {
        let mut order = OrderSnapshot::new("o1", "12", OrderChannel::Delivery, 0);
        order.finalized_at = Some(5);
        order.elapsed_seconds = Some(5);

        let patch = OrderPatch {
            status: Some(OrderStatus::Delivered),
            finalized_at: Some(50),
            elapsed_seconds: Some(50),
            ..Default::default()
        };
        patch.apply_to(&mut order);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.finalized_at, Some(5));
        assert_eq!(order.elapsed_seconds, Some(5));
    }
}
