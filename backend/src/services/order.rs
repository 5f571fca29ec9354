//! Order service: farmer/dealer product orders and their approval
//!
//! Approval is the only transition with side effects. The dealer's stock is
//! decremented and a credit is added to the dealer's ledger in the same
//! transaction that flips the status, so either all three writes land or none.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{total_amount, EntrySource, EntryType, Order, OrderStatus, Party, UserRole};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::ledger::{AddEntryInput, LedgerService};
use super::{ConnectionService, InventoryService};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Order service for creating and deciding orders
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for placing an order.
///
/// `counterparty_id` is the dealer when a farmer orders, and the farmer when a
/// dealer raises the order.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub counterparty_id: Uuid,
    /// Item in the dealer's inventory
    pub product_id: Uuid,
    #[validate(custom = "crate::validators::positive_quantity")]
    pub quantity: Decimal,
    /// Defaults to the item's current rate
    #[validate(custom = "crate::validators::rate")]
    pub rate_per_unit: Option<Decimal>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for approving or rejecting an order
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    product_name: String,
    rate_per_unit: Decimal,
}

const ORDER_COLUMNS: &str = "id, farmer_id, dealer_id, product_id, product_name, quantity, \
                             rate_per_unit, total_amount, status, initiated_by, notes, \
                             created_at, decided_at, decided_by";

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Place a pending order. The pair must have an approved connection.
    pub async fn create_order(&self, actor: &AuthUser, input: CreateOrderInput) -> AppResult<Order> {
        let party = Party::from_role(actor.role).ok_or_else(|| {
            AppError::Forbidden("Only farmers and dealers can place orders".to_string())
        })?;

        let (farmer_id, dealer_id) = match party {
            Party::Farmer => (actor.user_id, input.counterparty_id),
            Party::Dealer => (input.counterparty_id, actor.user_id),
        };

        if !ConnectionService::new(self.db.clone())
            .is_connected(farmer_id, dealer_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "An approved connection is required before ordering".to_string(),
            ));
        }

        let product = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT product_name, rate_per_unit
            FROM inventory_items
            WHERE id = $1 AND owner_id = $2 AND side = 'dealer'
            "#,
        )
        .bind(input.product_id)
        .bind(dealer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product in dealer inventory".to_string()))?;

        let rate_per_unit = input.rate_per_unit.unwrap_or(product.rate_per_unit);
        let total = total_amount(input.quantity, rate_per_unit).round_dp(2);

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (
                farmer_id, dealer_id, product_id, product_name, quantity,
                rate_per_unit, total_amount, status, initiated_by, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(farmer_id)
        .bind(dealer_id)
        .bind(input.product_id)
        .bind(&product.product_name)
        .bind(input.quantity)
        .bind(rate_per_unit)
        .bind(total)
        .bind(party)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            order_id = %order.id,
            farmer_id = %farmer_id,
            dealer_id = %dealer_id,
            total = %total,
            "Order placed"
        );

        Ok(order)
    }

    /// Approve or reject a pending order.
    ///
    /// The order row stays locked until commit, so two concurrent approvals
    /// cannot both see `pending`; the second fails with an invalid transition
    /// and applies nothing.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &AuthUser,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|o| o.involves(actor.user_id))
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if order.responder_id() != actor.user_id {
            return Err(AppError::Forbidden(format!(
                "Only the {} can respond to this order",
                order.initiated_by.counterpart()
            )));
        }

        let next = order.status.transition(new_status)?;

        if next == OrderStatus::Approved {
            InventoryService::adjust_stock_in_tx(
                &mut tx,
                order.dealer_id,
                order.product_id,
                -order.quantity,
            )
            .await?;

            // zero-value orders move stock but have nothing to credit. The order
            // row lock makes this run once; client references stay with manual entries.
            if order.total_amount > Decimal::ZERO {
                let entry = AddEntryInput {
                    description: format!("Order {}: {} x {}", order.id, order.product_name, order.quantity),
                    amount: order.total_amount,
                    entry_type: EntryType::Credit,
                    entry_date: None,
                    client_reference: None,
                };
                LedgerService::add_entry_in_tx(&mut tx, order.dealer_id, &entry, EntrySource::Order)
                    .await?;
            }
        }

        let updated = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2, decided_at = NOW(), decided_by = $3
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(next)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, status = next.as_str(), "Order decided");

        Ok(updated)
    }

    /// Fetch one order; only its two parties and admins may see it
    pub async fn get_order(&self, actor: &AuthUser, order_id: Uuid) -> AppResult<Order> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .filter(|o| actor.role == UserRole::Admin || o.involves(actor.user_id))
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    /// Orders where the actor is either party, newest first
    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE (farmer_id = $1 OR dealer_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(actor.user_id)
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_input(quantity: i64) -> CreateOrderInput {
        CreateOrderInput {
            counterparty_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: Decimal::from(quantity),
            rate_per_unit: None,
            notes: None,
        }
    }

    #[test]
    fn test_order_input_validation() {
        assert!(order_input(10).validate().is_ok());
        assert!(order_input(0).validate().is_err());
        assert!(order_input(-3).validate().is_err());

        let mut input = order_input(5);
        input.rate_per_unit = Some(Decimal::from(-1));
        assert!(input.validate().is_err());
    }
}
