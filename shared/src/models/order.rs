//! Farmer/dealer product orders

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Party;
use crate::error::DomainError;

/// A product order between a farmer and a dealer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub dealer_id: Uuid,
    /// Dealer inventory item being ordered
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub rate_per_unit: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub initiated_by: Party,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
}

impl Order {
    /// Whether `user_id` is the farmer or the dealer on this order
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.farmer_id == user_id || self.dealer_id == user_id
    }

    /// The party allowed to approve or reject: whoever did not place the order
    pub fn responder_id(&self) -> Uuid {
        match self.initiated_by {
            Party::Farmer => self.dealer_id,
            Party::Dealer => self.farmer_id,
        }
    }
}

/// Order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Validate a status change. Only `pending -> approved|rejected` is allowed,
    /// so a second approval of the same order is refused.
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Approved)
            | (OrderStatus::Pending, OrderStatus::Rejected) => Ok(next),
            _ => Err(DomainError::InvalidTransition {
                entity: "order",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order value: quantity × rate per unit
pub fn total_amount(quantity: Decimal, rate_per_unit: Decimal) -> Decimal {
    quantity * rate_per_unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_order(initiated_by: Party) -> Order {
        Order {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            dealer_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Broiler Starter Feed".to_string(),
            quantity: Decimal::from(10),
            rate_per_unit: Decimal::from(1450),
            total_amount: Decimal::from(14500),
            status: OrderStatus::Pending,
            initiated_by,
            notes: None,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        }
    }

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Approved),
            Ok(OrderStatus::Approved)
        );
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Rejected),
            Ok(OrderStatus::Rejected)
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [OrderStatus::Approved, OrderStatus::Rejected] {
            for to in [
                OrderStatus::Pending,
                OrderStatus::Approved,
                OrderStatus::Rejected,
            ] {
                assert!(from.transition(to).is_err());
            }
        }
    }

    #[test]
    fn test_double_approval_is_invalid() {
        let err = OrderStatus::Approved
            .transition(OrderStatus::Approved)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "order",
                from: "approved".to_string(),
                to: "approved".to_string(),
            }
        );
    }

    #[test]
    fn test_pending_to_pending_is_invalid() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_total_amount() {
        let total = total_amount(
            Decimal::from_str("12.5").unwrap(),
            Decimal::from_str("48.20").unwrap(),
        );
        assert_eq!(total, Decimal::from_str("602.5").unwrap());
    }

    #[test]
    fn test_responder_is_non_initiator() {
        let order = sample_order(Party::Farmer);
        assert_eq!(order.responder_id(), order.dealer_id);

        let order = sample_order(Party::Dealer);
        assert_eq!(order.responder_id(), order.farmer_id);
    }

    #[test]
    fn test_involves() {
        let order = sample_order(Party::Farmer);
        assert!(order.involves(order.farmer_id));
        assert!(order.involves(order.dealer_id));
        assert!(!order.involves(Uuid::new_v4()));
    }
}
