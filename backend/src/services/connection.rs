//! Connection service: farmer/dealer relationship requests

use serde::Deserialize;
use shared::{is_symmetric_link, Connection, ConnectionStatus, Party, UserRole};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Connection service for requesting and deciding connections
#[derive(Clone)]
pub struct ConnectionService {
    db: PgPool,
}

/// Input for requesting a connection by the counterparty's code
#[derive(Debug, Deserialize, Validate)]
pub struct RequestConnectionInput {
    #[validate(custom = "crate::validators::user_code")]
    pub code: String,
}

/// Input for approving or rejecting a connection
#[derive(Debug, Deserialize)]
pub struct UpdateConnectionStatusInput {
    pub status: ConnectionStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionFilter {
    pub status: Option<ConnectionStatus>,
}

#[derive(Debug, FromRow)]
struct Counterparty {
    id: Uuid,
    role: UserRole,
}

#[derive(Debug, FromRow)]
struct LinkArrays {
    farmer_dealers: Vec<Uuid>,
    dealer_farmers: Vec<Uuid>,
}

const CONNECTION_COLUMNS: &str =
    "id, farmer_id, dealer_id, status, requested_by, created_at, decided_at";

fn party_of(user: &AuthUser) -> AppResult<Party> {
    Party::from_role(user.role).ok_or_else(|| {
        AppError::Forbidden("Only farmers and dealers can connect".to_string())
    })
}

impl ConnectionService {
    /// Create a new ConnectionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Ask the user behind `code` to connect
    pub async fn request_connection(
        &self,
        initiator: &AuthUser,
        code: &str,
    ) -> AppResult<Connection> {
        let party = party_of(initiator)?;

        let counterparty = sqlx::query_as::<_, Counterparty>(
            "SELECT id, role FROM users WHERE unique_code = $1 AND deleted_at IS NULL",
        )
        .bind(code.trim().to_uppercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User with this code".to_string()))?;

        if Party::from_role(counterparty.role) != Some(party.counterpart()) {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: format!("A {} can only connect with a {}", party, party.counterpart()),
            });
        }

        let (farmer_id, dealer_id) = match party {
            Party::Farmer => (initiator.user_id, counterparty.id),
            Party::Dealer => (counterparty.id, initiator.user_id),
        };

        let connection = sqlx::query_as::<_, Connection>(&format!(
            r#"
            INSERT INTO connections (farmer_id, dealer_id, status, requested_by)
            VALUES ($1, $2, 'pending', $3)
            RETURNING {CONNECTION_COLUMNS}
            "#
        ))
        .bind(farmer_id)
        .bind(dealer_id)
        .bind(party)
        .fetch_one(&self.db)
        .await
        .map_err(super::conflict_on_unique(
            "connection",
            "A connection with this user already exists or is pending",
        ))?;

        tracing::info!(
            connection_id = %connection.id,
            farmer_id = %farmer_id,
            dealer_id = %dealer_id,
            requested_by = %party,
            "Connection requested"
        );

        Ok(connection)
    }

    /// Approve or reject a pending request. Only the party that did not
    /// request it may decide.
    pub async fn update_connection_status(
        &self,
        connection_id: Uuid,
        new_status: ConnectionStatus,
        actor: &AuthUser,
    ) -> AppResult<Connection> {
        let mut tx = self.db.begin().await?;

        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1 FOR UPDATE"
        ))
        .bind(connection_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|c| c.involves(actor.user_id))
        .ok_or_else(|| AppError::NotFound("Connection".to_string()))?;

        if connection.responder_id() != actor.user_id {
            return Err(AppError::Forbidden(
                "Only the invited party can respond to this request".to_string(),
            ));
        }

        let next = connection.status.transition(new_status)?;

        let updated = sqlx::query_as::<_, Connection>(&format!(
            r#"
            UPDATE connections SET status = $2, decided_at = NOW()
            WHERE id = $1
            RETURNING {CONNECTION_COLUMNS}
            "#
        ))
        .bind(connection_id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        if next == ConnectionStatus::Approved {
            Self::link_in_tx(&mut tx, updated.farmer_id, updated.dealer_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            connection_id = %connection_id,
            status = next.as_str(),
            "Connection decided"
        );

        Ok(updated)
    }

    /// Add each party to the other's connected list, skipping ids already present
    pub(crate) async fn link_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        farmer_id: Uuid,
        dealer_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET connected_dealers = array_append(connected_dealers, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(connected_dealers))
            "#,
        )
        .bind(farmer_id)
        .bind(dealer_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET connected_farmers = array_append(connected_farmers, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(connected_farmers))
            "#,
        )
        .bind(dealer_id)
        .bind(farmer_id)
        .execute(&mut **tx)
        .await?;

        let links = sqlx::query_as::<_, LinkArrays>(
            r#"
            SELECT f.connected_dealers AS farmer_dealers, d.connected_farmers AS dealer_farmers
            FROM users f, users d
            WHERE f.id = $1 AND d.id = $2
            "#,
        )
        .bind(farmer_id)
        .bind(dealer_id)
        .fetch_one(&mut **tx)
        .await?;

        if !is_symmetric_link(farmer_id, &links.farmer_dealers, dealer_id, &links.dealer_farmers) {
            return Err(AppError::Internal(
                "Connection lists diverged between farmer and dealer".to_string(),
            ));
        }

        Ok(())
    }

    /// Connections the actor is part of, newest first
    pub async fn list_connections(
        &self,
        actor: &AuthUser,
        status: Option<ConnectionStatus>,
    ) -> AppResult<Vec<Connection>> {
        let connections = sqlx::query_as::<_, Connection>(&format!(
            r#"
            SELECT {CONNECTION_COLUMNS}
            FROM connections
            WHERE (farmer_id = $1 OR dealer_id = $1)
              AND ($2::connection_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(actor.user_id)
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(connections)
    }

    /// Whether the pair has an approved connection
    pub async fn is_connected(&self, farmer_id: Uuid, dealer_id: Uuid) -> AppResult<bool> {
        let connected = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM connections c
                JOIN users f ON f.id = c.farmer_id AND f.deleted_at IS NULL
                JOIN users d ON d.id = c.dealer_id AND d.deleted_at IS NULL
                WHERE c.farmer_id = $1 AND c.dealer_id = $2 AND c.status = 'approved'
            )
            "#,
        )
        .bind(farmer_id)
        .bind(dealer_id)
        .fetch_one(&self.db)
        .await?;

        Ok(connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cannot_connect() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        assert!(matches!(party_of(&admin), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_request_input_requires_valid_code() {
        assert!(RequestConnectionInput { code: "PM-3F9A1C".into() }.validate().is_ok());
        assert!(RequestConnectionInput { code: "hello".into() }.validate().is_err());
    }
}
