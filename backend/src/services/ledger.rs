//! Ledger service: append-only income/expense entries with a running balance
//!
//! Each owner has a `ledger_accounts` head row holding the current balance and
//! entry count. Appends lock that row, so concurrent writers for one owner are
//! serialised and every stored `balance_after` extends the chain correctly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    audit_chain, next_balance, ChainReport, EntrySource, EntryType, LedgerEntry, LedgerSummary,
    PaginatedResponse, Pagination, UserRole,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Ledger service for appending and reading entries
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Input for adding a ledger entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddEntryInput {
    #[validate(length(min = 1, max = 200, message = "Description must be 1-200 characters"))]
    pub description: String,
    #[validate(custom = "crate::validators::money_amount")]
    pub amount: Decimal,
    pub entry_type: EntryType,
    /// Informational date; defaults to now and never affects ordering
    pub entry_date: Option<DateTime<Utc>>,
    /// Retry key; a second call with the same key returns the first entry
    #[validate(length(min = 1, max = 64))]
    pub client_reference: Option<String>,
}

/// Per-owner totals for the admin back-office
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerOverviewRow {
    pub owner_id: Uuid,
    pub owner_name: String,
    pub role: UserRole,
    pub balance: Decimal,
    pub entry_count: i64,
    pub total_credit: Decimal,
    pub total_debit: Decimal,
}

/// Ledger head row
#[derive(Debug, FromRow)]
struct AccountHead {
    balance: Decimal,
    entry_count: i64,
}

const ENTRY_COLUMNS: &str = "id, owner_id, sequence, description, amount, entry_type, entry_date, \
                             balance_after, source, client_reference, created_at";

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a manual entry in its own transaction
    pub async fn add_entry(&self, owner_id: Uuid, input: AddEntryInput) -> AppResult<LedgerEntry> {
        let mut tx = self.db.begin().await?;
        let entry = Self::add_entry_in_tx(&mut tx, owner_id, &input, EntrySource::Manual).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Append an entry inside a caller-managed transaction.
    ///
    /// Used by purchase recording and order approval so the ledger write lands
    /// together with the inventory change or not at all. A repeated
    /// `client_reference` returns the entry recorded the first time.
    pub async fn add_entry_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        input: &AddEntryInput,
        source: EntrySource,
    ) -> AppResult<LedgerEntry> {
        shared::validate_currency_scale(input.amount).map_err(|m| AppError::Validation {
            field: "amount".to_string(),
            message: m.to_string(),
        })?;

        sqlx::query(
            "INSERT INTO ledger_accounts (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("User".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        let head = sqlx::query_as::<_, AccountHead>(
            "SELECT balance, entry_count FROM ledger_accounts WHERE owner_id = $1 FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await?;

        // The head lock makes this check race-free
        if let Some(reference) = &input.client_reference {
            let existing = sqlx::query_as::<_, LedgerEntry>(&format!(
                "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE owner_id = $1 AND client_reference = $2"
            ))
            .bind(owner_id)
            .bind(reference)
            .fetch_optional(&mut **tx)
            .await?;

            if let Some(entry) = existing {
                tracing::info!(owner_id = %owner_id, client_reference = %reference, "Ledger entry already recorded");
                return Ok(entry);
            }
        }

        let balance_after = next_balance(head.balance, input.amount, input.entry_type)?;
        let sequence = head.entry_count + 1;

        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            INSERT INTO ledger_entries (
                owner_id, sequence, description, amount, entry_type, entry_date,
                balance_after, source, client_reference
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()), $7, $8, $9)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(sequence)
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.entry_type)
        .bind(input.entry_date)
        .bind(balance_after)
        .bind(source)
        .bind(&input.client_reference)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE ledger_accounts
            SET balance = $2, entry_count = $3, updated_at = NOW()
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .bind(balance_after)
        .bind(sequence)
        .execute(&mut **tx)
        .await?;

        tracing::debug!(
            owner_id = %owner_id,
            sequence,
            entry_type = %input.entry_type,
            amount = %input.amount,
            balance_after = %balance_after,
            "Ledger entry appended"
        );

        Ok(entry)
    }

    /// List entries newest first (by insertion sequence)
    pub async fn list_entries(
        &self,
        owner_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE owner_id = $1
            ORDER BY sequence DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = self.entry_count(owner_id).await?;

        Ok(PaginatedResponse::new(entries, pagination, total as u64))
    }

    /// Balance after the newest entry, or zero for an empty ledger
    pub async fn current_balance(&self, owner_id: Uuid) -> AppResult<Decimal> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM ledger_accounts WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    /// Credit/debit totals and the current balance
    pub async fn summary(&self, owner_id: Uuid) -> AppResult<LedgerSummary> {
        let entries = self.load_chain(owner_id, "DESC").await?;
        Ok(LedgerSummary::from_entries(&entries))
    }

    /// Re-check every stored balance against the chain rule
    pub async fn verify_chain(&self, owner_id: Uuid) -> AppResult<ChainReport> {
        let entries = self.load_chain(owner_id, "ASC").await?;
        let report = audit_chain(&entries);

        if let Some(chain_break) = &report.first_break {
            tracing::error!(
                owner_id = %owner_id,
                index = chain_break.index,
                expected = %chain_break.expected,
                found = %chain_break.found,
                "Ledger balance chain is broken"
            );
        }

        Ok(report)
    }

    /// Export all entries, oldest first, as CSV
    pub async fn export_csv(&self, owner_id: Uuid) -> AppResult<String> {
        let entries = self.load_chain(owner_id, "ASC").await?;
        super::export_to_csv(&entries)
    }

    /// Balances and totals for every owner with a ledger
    pub async fn admin_overview(&self) -> AppResult<Vec<LedgerOverviewRow>> {
        let rows = sqlx::query_as::<_, LedgerOverviewRow>(
            r#"
            SELECT a.owner_id, u.name AS owner_name, u.role, a.balance, a.entry_count,
                   COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'credit'), 0) AS total_credit,
                   COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'debit'), 0) AS total_debit
            FROM ledger_accounts a
            JOIN users u ON u.id = a.owner_id
            LEFT JOIN ledger_entries e ON e.owner_id = a.owner_id
            GROUP BY a.owner_id, u.name, u.role, a.balance, a.entry_count
            ORDER BY u.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn entry_count(&self, owner_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT entry_count FROM ledger_accounts WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(count.unwrap_or(0))
    }

    async fn load_chain(&self, owner_id: Uuid, order: &'static str) -> AppResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE owner_id = $1 ORDER BY sequence {order}"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}


#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::services::test_support::{active_user, dec};

    fn entry(amount: &str, entry_type: EntryType, reference: Option<&str>) -> AddEntryInput {
        AddEntryInput {
            description: "Feed bill".to_string(),
            amount: dec(amount),
            entry_type,
            entry_date: None,
            client_reference: reference.map(str::to_string),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_debit_after_existing_entry(pool: PgPool) {
        let farmer = active_user(&pool, UserRole::Farmer).await;
        let ledger = LedgerService::new(pool);

        ledger.add_entry(farmer.user_id, entry("500", EntryType::Credit, None)).await.unwrap();
        let debit = ledger
            .add_entry(farmer.user_id, entry("200", EntryType::Debit, None))
            .await
            .unwrap();

        assert_eq!(debit.balance_after, dec("300"));
        assert_eq!(debit.sequence, 2);
        assert_eq!(debit.source, EntrySource::Manual);
        assert_eq!(ledger.current_balance(farmer.user_id).await.unwrap(), dec("300"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_first_credit_for_fresh_owner(pool: PgPool) {
        let dealer = active_user(&pool, UserRole::Dealer).await;
        let ledger = LedgerService::new(pool);

        assert_eq!(ledger.current_balance(dealer.user_id).await.unwrap(), Decimal::ZERO);

        let credit = ledger
            .add_entry(dealer.user_id, entry("1000", EntryType::Credit, None))
            .await
            .unwrap();
        assert_eq!(credit.balance_after, dec("1000"));
        assert_eq!(credit.sequence, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_repeated_reference_returns_first_entry(pool: PgPool) {
        let farmer = active_user(&pool, UserRole::Farmer).await;
        let ledger = LedgerService::new(pool);

        let first = ledger
            .add_entry(farmer.user_id, entry("75", EntryType::Debit, Some("vaccine-0412")))
            .await
            .unwrap();
        let again = ledger
            .add_entry(farmer.user_id, entry("75", EntryType::Debit, Some("vaccine-0412")))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(ledger.summary(farmer.user_id).await.unwrap().entry_count, 1);
        assert_eq!(ledger.current_balance(farmer.user_id).await.unwrap(), dec("-75"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_owner_not_found(pool: PgPool) {
        let ledger = LedgerService::new(pool);
        let result = ledger
            .add_entry(Uuid::new_v4(), entry("10", EntryType::Credit, None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    /// Twenty writers for one owner at once: no lost update, no broken link
    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_appends_keep_chain_valid(pool: PgPool) {
        let dealer = active_user(&pool, UserRole::Dealer).await;
        let owner_id = dealer.user_id;
        let ledger = LedgerService::new(pool);

        let handles: Vec<_> = (1..=20i64)
            .map(|i| {
                let ledger = ledger.clone();
                let entry_type = if i % 3 == 0 { EntryType::Debit } else { EntryType::Credit };
                tokio::spawn(async move {
                    ledger
                        .add_entry(owner_id, entry(&(i * 10).to_string(), entry_type, None))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let expected: Decimal = (1..=20i64)
            .map(|i| {
                let amount = Decimal::from(i * 10);
                if i % 3 == 0 { -amount } else { amount }
            })
            .sum();

        let report = ledger.verify_chain(owner_id).await.unwrap();
        assert!(report.valid);
        assert_eq!(report.entries_checked, 20);
        assert_eq!(report.final_balance, Some(expected));
        assert_eq!(ledger.current_balance(owner_id).await.unwrap(), expected);
    }
}
