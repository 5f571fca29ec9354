//! Inventory service for farmer and dealer stock records

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_stock_delta, purchase_cost, EntrySource, EntryType, InventoryItem, InventorySide,
    ItemCategory, ItemUnit, LedgerEntry, UserRole,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use super::ledger::{AddEntryInput, LedgerService};
use super::ConnectionService;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Inventory service for managing stock records
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for creating an inventory item
#[derive(Debug, Deserialize, Validate)]
pub struct AddItemInput {
    #[validate(length(min = 1, max = 120))]
    pub product_name: String,
    pub category: ItemCategory,
    pub unit: ItemUnit,
    #[validate(custom = "crate::validators::non_negative")]
    pub stock_quantity: Decimal,
    #[validate(custom = "crate::validators::rate")]
    pub rate_per_unit: Decimal,
    #[validate(custom = "crate::validators::rate")]
    pub purchase_rate_per_unit: Option<Decimal>,
    #[validate(custom = "crate::validators::non_negative")]
    pub low_stock_threshold: Option<Decimal>,
}

/// Input for overwriting fields of an item
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 120))]
    pub product_name: Option<String>,
    pub stock_quantity: Option<Decimal>,
    #[validate(custom = "crate::validators::rate")]
    pub rate_per_unit: Option<Decimal>,
    #[validate(custom = "crate::validators::rate")]
    pub purchase_rate_per_unit: Option<Decimal>,
    #[validate(custom = "crate::validators::non_negative")]
    pub low_stock_threshold: Option<Decimal>,
}

/// Input for recording a stock purchase.
///
/// Either `item_id` names an existing item, or `product_name`, `category` and
/// `unit` describe the item to create (or top up if one already matches).
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPurchaseInput {
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub product_name: Option<String>,
    pub category: Option<ItemCategory>,
    pub unit: Option<ItemUnit>,
    #[validate(custom = "crate::validators::positive_quantity")]
    pub quantity: Decimal,
    #[validate(custom = "crate::validators::rate")]
    pub purchase_rate_per_unit: Decimal,
    /// Dealers set their selling rate here; farmers' rate is the purchase rate
    #[validate(custom = "crate::validators::rate")]
    pub selling_rate_per_unit: Option<Decimal>,
    #[validate(custom = "crate::validators::non_negative")]
    pub low_stock_threshold: Option<Decimal>,
    /// Debit the purchase cost to the ledger (default true)
    pub record_expense: Option<bool>,
    #[validate(length(min = 1, max = 200))]
    pub description: Option<String>,
    /// Retry key; a second purchase with the same key is refused
    #[validate(length(min = 1, max = 64))]
    pub client_reference: Option<String>,
}

/// Outcome of a purchase: the updated item and the expense entry, if any
#[derive(Debug, Serialize)]
pub struct PurchaseReceipt {
    pub item: InventoryItem,
    pub ledger_entry: Option<LedgerEntry>,
}

/// A dealer's item as shown to connected farmers
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogItem {
    pub id: Uuid,
    pub product_name: String,
    pub category: ItemCategory,
    pub unit: ItemUnit,
    pub stock_quantity: Decimal,
    pub rate_per_unit: Decimal,
}

const ITEM_COLUMNS: &str = "id, owner_id, side, product_name, category, unit, stock_quantity, \
                            rate_per_unit, purchase_rate_per_unit, low_stock_threshold, \
                            created_at, updated_at";

/// Which inventory a role keeps
pub fn side_for(role: UserRole) -> AppResult<InventorySide> {
    match role {
        UserRole::Farmer => Ok(InventorySide::Farmer),
        UserRole::Dealer => Ok(InventorySide::Dealer),
        UserRole::Admin => Err(AppError::Forbidden(
            "Administrators do not keep inventory".to_string(),
        )),
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an item with an opening stock
    pub async fn add_item(
        &self,
        owner_id: Uuid,
        side: InventorySide,
        input: AddItemInput,
    ) -> AppResult<InventoryItem> {
        let purchase_rate = match side {
            InventorySide::Dealer => input.purchase_rate_per_unit,
            InventorySide::Farmer => None,
        };

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory_items (
                owner_id, side, product_name, category, unit, stock_quantity,
                rate_per_unit, purchase_rate_per_unit, low_stock_threshold
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(side)
        .bind(input.product_name.trim())
        .bind(input.category)
        .bind(input.unit)
        .bind(input.stock_quantity)
        .bind(input.rate_per_unit)
        .bind(purchase_rate)
        .bind(input.low_stock_threshold.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await
        .map_err(super::conflict_on_unique(
            "product_name",
            "An item with this name and unit already exists",
        ))?;

        tracing::info!(owner_id = %owner_id, item_id = %item.id, "Inventory item created");

        Ok(item)
    }

    /// Record a purchase: raise stock and optionally debit the cost to the
    /// ledger, both in one transaction.
    pub async fn record_purchase(
        &self,
        owner_id: Uuid,
        side: InventorySide,
        input: RecordPurchaseInput,
    ) -> AppResult<PurchaseReceipt> {
        let mut tx = self.db.begin().await?;

        let cost = purchase_cost(input.quantity, input.purchase_rate_per_unit).round_dp(2);
        let record_expense = input.record_expense.unwrap_or(true) && cost > Decimal::ZERO;

        // Claim the reference before any stock moves; a concurrent retry blocks
        // on the unique index and then conflicts
        let purchase_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchases (owner_id, quantity, purchase_rate_per_unit, cost, client_reference)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(input.quantity)
        .bind(input.purchase_rate_per_unit)
        .bind(cost)
        .bind(&input.client_reference)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => AppError::Conflict {
                resource: "client_reference".to_string(),
                message: "This purchase has already been recorded".to_string(),
            },
            Some(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("User".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        // Item row before ledger head, as order approval locks them
        let item = match input.item_id {
            Some(item_id) => {
                let item = Self::adjust_stock_in_tx(&mut tx, owner_id, item_id, input.quantity).await?;
                Self::update_purchase_rates(&mut tx, &item, side, &input).await?
            }
            None => Self::upsert_purchased_item(&mut tx, owner_id, side, &input).await?,
        };

        let ledger_entry = if record_expense {
            let description = input
                .description
                .clone()
                .unwrap_or_else(|| format!("Purchase: {} x {}", item.product_name, input.quantity));
            let entry_input = AddEntryInput {
                description,
                amount: cost,
                entry_type: EntryType::Debit,
                entry_date: None,
                client_reference: None,
            };
            Some(
                LedgerService::add_entry_in_tx(&mut tx, owner_id, &entry_input, EntrySource::Purchase)
                    .await?,
            )
        } else {
            None
        };

        sqlx::query("UPDATE purchases SET item_id = $2, ledger_entry_id = $3 WHERE id = $1")
            .bind(purchase_id)
            .bind(item.id)
            .bind(ledger_entry.as_ref().map(|entry| entry.id))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            owner_id = %owner_id,
            item_id = %item.id,
            quantity = %input.quantity,
            cost = %cost,
            "Purchase recorded"
        );

        Ok(PurchaseReceipt { item, ledger_entry })
    }

    /// Overwrite quantity, rates or threshold. No history is kept.
    pub async fn update_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> AppResult<InventoryItem> {
        if let Some(quantity) = input.stock_quantity {
            if quantity < Decimal::ZERO {
                return Err(shared::DomainError::NegativeQuantity.into());
            }
        }

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory_items
            SET product_name = COALESCE($3, product_name),
                stock_quantity = COALESCE($4, stock_quantity),
                rate_per_unit = COALESCE($5, rate_per_unit),
                purchase_rate_per_unit = CASE WHEN side = 'dealer'
                    THEN COALESCE($6, purchase_rate_per_unit)
                    ELSE purchase_rate_per_unit END,
                low_stock_threshold = COALESCE($7, low_stock_threshold),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(owner_id)
        .bind(input.product_name.as_deref().map(str::trim))
        .bind(input.stock_quantity)
        .bind(input.rate_per_unit)
        .bind(input.purchase_rate_per_unit)
        .bind(input.low_stock_threshold)
        .fetch_optional(&self.db)
        .await
        .map_err(super::conflict_on_unique(
            "product_name",
            "An item with this name and unit already exists",
        ))?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        Ok(item)
    }

    /// Change an item's stock by `delta` inside a caller-managed transaction.
    ///
    /// The row is locked for the rest of the transaction. A change that would
    /// leave the stock below zero fails with `InsufficientStock`.
    pub async fn adjust_stock_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        item_id: Uuid,
        delta: Decimal,
    ) -> AppResult<InventoryItem> {
        let current = sqlx::query_scalar::<_, Decimal>(
            "SELECT stock_quantity FROM inventory_items WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(item_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        let next = apply_stock_delta(current, delta)?;

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory_items
            SET stock_quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(next)
        .fetch_one(&mut **tx)
        .await?;

        if item.is_low_stock() {
            tracing::info!(
                owner_id = %owner_id,
                item_id = %item_id,
                stock = %item.stock_quantity,
                "Item is at or below its low-stock threshold"
            );
        }

        Ok(item)
    }

    /// List an owner's items, optionally filtered by category
    pub async fn list_items(
        &self,
        owner_id: Uuid,
        category: Option<ItemCategory>,
    ) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM inventory_items
            WHERE owner_id = $1 AND ($2::item_category IS NULL OR category = $2)
            ORDER BY product_name
            "#
        ))
        .bind(owner_id)
        .bind(category)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn get_item(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 AND owner_id = $2"
        ))
        .bind(item_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// Items at or below their alert threshold
    pub async fn list_low_stock(&self, owner_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM inventory_items
            WHERE owner_id = $1 AND stock_quantity <= low_stock_threshold
            ORDER BY stock_quantity - low_stock_threshold, product_name
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1 AND owner_id = $2")
            .bind(item_id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_foreign_key_violation() => AppError::Conflict {
                    resource: "inventory_item".to_string(),
                    message: "Item is referenced by existing orders".to_string(),
                },
                _ => AppError::DatabaseError(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }

        Ok(())
    }

    /// A dealer's sellable items, visible to the dealer, admins and
    /// farmers with an approved connection
    pub async fn list_dealer_catalog(
        &self,
        viewer: &AuthUser,
        dealer_id: Uuid,
    ) -> AppResult<Vec<CatalogItem>> {
        let allowed = match viewer.role {
            UserRole::Admin => true,
            UserRole::Dealer => viewer.user_id == dealer_id,
            UserRole::Farmer => {
                ConnectionService::new(self.db.clone())
                    .is_connected(viewer.user_id, dealer_id)
                    .await?
            }
        };
        if !allowed {
            return Err(AppError::Forbidden(
                "Connect with this dealer to view their catalog".to_string(),
            ));
        }

        let items = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, product_name, category, unit, stock_quantity, rate_per_unit
            FROM inventory_items
            WHERE owner_id = $1 AND side = 'dealer'
            ORDER BY category, product_name
            "#,
        )
        .bind(dealer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn update_purchase_rates(
        tx: &mut Transaction<'_, Postgres>,
        item: &InventoryItem,
        side: InventorySide,
        input: &RecordPurchaseInput,
    ) -> AppResult<InventoryItem> {
        let (rate, purchase_rate) = match side {
            InventorySide::Farmer => (Some(input.purchase_rate_per_unit), None),
            InventorySide::Dealer => (input.selling_rate_per_unit, Some(input.purchase_rate_per_unit)),
        };

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory_items
            SET rate_per_unit = COALESCE($2, rate_per_unit),
                purchase_rate_per_unit = COALESCE($3, purchase_rate_per_unit),
                low_stock_threshold = COALESCE($4, low_stock_threshold),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.id)
        .bind(rate)
        .bind(purchase_rate)
        .bind(input.low_stock_threshold)
        .fetch_one(&mut **tx)
        .await?;

        Ok(item)
    }

    async fn upsert_purchased_item(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        side: InventorySide,
        input: &RecordPurchaseInput,
    ) -> AppResult<InventoryItem> {
        let (Some(product_name), Some(category), Some(unit)) =
            (input.product_name.as_deref(), input.category, input.unit)
        else {
            return Err(AppError::Validation {
                field: "item_id".to_string(),
                message: "Give an item_id, or product_name, category and unit for a new item"
                    .to_string(),
            });
        };

        let (rate, purchase_rate) = match side {
            InventorySide::Farmer => (input.purchase_rate_per_unit, None),
            InventorySide::Dealer => (
                input.selling_rate_per_unit.unwrap_or(input.purchase_rate_per_unit),
                Some(input.purchase_rate_per_unit),
            ),
        };

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory_items (
                owner_id, side, product_name, category, unit, stock_quantity,
                rate_per_unit, purchase_rate_per_unit, low_stock_threshold
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 0))
            ON CONFLICT (owner_id, product_name, unit) DO UPDATE
            SET stock_quantity = inventory_items.stock_quantity + EXCLUDED.stock_quantity,
                rate_per_unit = EXCLUDED.rate_per_unit,
                purchase_rate_per_unit = COALESCE(EXCLUDED.purchase_rate_per_unit, inventory_items.purchase_rate_per_unit),
                low_stock_threshold = COALESCE($9, inventory_items.low_stock_threshold),
                updated_at = NOW()
            WHERE inventory_items.category = EXCLUDED.category
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(side)
        .bind(product_name.trim())
        .bind(category)
        .bind(unit)
        .bind(input.quantity)
        .bind(rate)
        .bind(purchase_rate)
        .bind(input.low_stock_threshold)
        .fetch_optional(&mut **tx)
        .await?
        // no row: the name and unit matched an item filed under another category
        .ok_or_else(|| AppError::Validation {
            field: "category".to_string(),
            message: format!(
                "{} is already stocked under a different category",
                product_name.trim()
            ),
        })?;

        Ok(item)
    }
}
