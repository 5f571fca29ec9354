//! Farmer/dealer connections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Party;
use crate::error::DomainError;

/// A relationship request between a farmer and a dealer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Connection {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub dealer_id: Uuid,
    pub status: ConnectionStatus,
    pub requested_by: Party,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.farmer_id == user_id || self.dealer_id == user_id
    }

    /// The party that must accept or decline the request
    pub fn responder_id(&self) -> Uuid {
        match self.requested_by {
            Party::Farmer => self.dealer_id,
            Party::Dealer => self.farmer_id,
        }
    }
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "connection_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Approved => "approved",
            ConnectionStatus::Rejected => "rejected",
        }
    }

    /// A connection is decided exactly once
    pub fn transition(self, next: ConnectionStatus) -> Result<ConnectionStatus, DomainError> {
        match (self, next) {
            (ConnectionStatus::Pending, ConnectionStatus::Approved)
            | (ConnectionStatus::Pending, ConnectionStatus::Rejected) => Ok(next),
            _ => Err(DomainError::InvalidTransition {
                entity: "connection",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

/// Both sides of an approved link agree: the farmer lists the dealer iff the
/// dealer lists the farmer.
pub fn is_symmetric_link(
    farmer_id: Uuid,
    farmer_connected_dealers: &[Uuid],
    dealer_id: Uuid,
    dealer_connected_farmers: &[Uuid],
) -> bool {
    farmer_connected_dealers.contains(&dealer_id) == dealer_connected_farmers.contains(&farmer_id)
}
