//! Change feed events - notifications pushed by the backing store

use super::snapshot::OrderSnapshot;
use serde::{Deserialize, Serialize};

/// Operation that produced a change event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Update => write!(f, "UPDATE"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Change event on the order collection
///
/// Inserts and updates carry `after`; deletes usually only carry `before`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<OrderSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<OrderSnapshot>,
}

impl ChangeEvent {
    pub fn insert(after: OrderSnapshot) -> Self {
        Self {
            kind: ChangeKind::Insert,
            before: None,
            after: Some(after),
        }
    }

    pub fn update(before: Option<OrderSnapshot>, after: OrderSnapshot) -> Self {
        Self {
            kind: ChangeKind::Update,
            before,
            after: Some(after),
        }
    }

    pub fn delete(before: OrderSnapshot) -> Self {
        Self {
            kind: ChangeKind::Delete,
            before: Some(before),
            after: None,
        }
    }

    /// The snapshot this event is about
    pub fn subject(&self) -> Option<&OrderSnapshot> {
        self.after.as_ref().or(self.before.as_ref())
    }

    pub fn order_id(&self) -> Option<&str> {
        self.subject().map(|s| s.order_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderChannel;

    #[test]
    fn test_subject_prefers_after() {
        let before = OrderSnapshot::new("o1", "1", OrderChannel::Takeaway, 0);
        let mut after = before.clone();
        after.paid = true;

        let event = ChangeEvent::update(Some(before.clone()), after);
        assert!(event.subject().unwrap().paid);

        let event = ChangeEvent::delete(before);
        assert_eq!(event.order_id(), Some("o1"));
        assert!(event.after.is_none());
    }

    #[test]
    fn test_deserialize_delete_without_after() {
        let json = r#"{"kind":"DELETE","before":{"order_id":"o9","display_number":"9","status":"PENDING","channel":"DELIVERY","created_at":0}}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.order_id(), Some("o9"));
    }
}
