//! Ledger models and running-balance rules
//!
//! Every entry stores the balance of its owner's ledger immediately after the
//! entry was applied. The chain is ordered by insertion (`sequence`), never by
//! the user-supplied entry date.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "entry_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Money in: adds to the balance
    Credit,
    /// Money out: subtracts from the balance
    Debit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Credit => "credit",
            EntryType::Debit => "debit",
        }
    }

    /// Signed effect of `amount` on the balance
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            EntryType::Credit => amount,
            EntryType::Debit => -amount,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Credit => write!(f, "Credit"),
            EntryType::Debit => write!(f, "Debit"),
        }
    }
}

/// What produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "entry_source", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Income or expense typed in by the owner
    Manual,
    /// Stock purchase recorded through inventory
    Purchase,
    /// Approved order
    Order,
}

/// A single append-only ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Position in the owner's chain, starting at 1
    pub sequence: i64,
    pub description: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub entry_date: DateTime<Utc>,
    pub balance_after: Decimal,
    pub source: EntrySource,
    /// Caller-supplied key used to make retries safe
    pub client_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Anything that can be checked as one link of a balance chain
pub trait ChainLink {
    fn amount(&self) -> Decimal;
    fn entry_type(&self) -> EntryType;
    fn balance_after(&self) -> Decimal;
}

impl ChainLink for LedgerEntry {
    fn amount(&self) -> Decimal {
        self.amount
    }

    fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    fn balance_after(&self) -> Decimal {
        self.balance_after
    }
}

/// Balance after applying one entry on top of `previous`
pub fn next_balance(
    previous: Decimal,
    amount: Decimal,
    entry_type: EntryType,
) -> Result<Decimal, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::NonPositiveAmount);
    }
    Ok(previous + entry_type.signed(amount))
}

/// Current balance from entries ordered newest first
pub fn current_balance<L: ChainLink>(newest_first: &[L]) -> Decimal {
    newest_first
        .first()
        .map(|entry| entry.balance_after())
        .unwrap_or(Decimal::ZERO)
}

/// Check the chain invariant over entries ordered oldest first.
///
/// Returns the final balance when every `balance_after` equals the previous
/// balance plus the signed amount, starting from zero.
pub fn verify_chain<L: ChainLink>(oldest_first: &[L]) -> Result<Decimal, DomainError> {
    let mut balance = Decimal::ZERO;
    for (index, entry) in oldest_first.iter().enumerate() {
        let expected = balance + entry.entry_type().signed(entry.amount());
        if entry.balance_after() != expected {
            return Err(DomainError::BrokenChain {
                index,
                expected,
                found: entry.balance_after(),
            });
        }
        balance = expected;
    }
    Ok(balance)
}

/// Totals over an owner's ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_credit: Decimal,
    pub total_debit: Decimal,
    pub entry_count: i64,
    pub balance: Decimal,
}

impl LedgerSummary {
    pub fn from_entries<L: ChainLink>(newest_first: &[L]) -> Self {
        let (total_credit, total_debit) =
            newest_first
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(cr, dr), e| {
                    match e.entry_type() {
                        EntryType::Credit => (cr + e.amount(), dr),
                        EntryType::Debit => (cr, dr + e.amount()),
                    }
                });

        Self {
            total_credit,
            total_debit,
            entry_count: newest_first.len() as i64,
            balance: current_balance(newest_first),
        }
    }
}

/// Outcome of auditing a stored chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    pub valid: bool,
    pub entries_checked: usize,
    pub final_balance: Option<Decimal>,
    pub first_break: Option<ChainBreak>,
}

/// Location of the first entry whose stored balance is wrong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub index: usize,
    pub expected: Decimal,
    pub found: Decimal,
}

/// Audit a chain ordered oldest first
pub fn audit_chain<L: ChainLink>(oldest_first: &[L]) -> ChainReport {
    match verify_chain(oldest_first) {
        Ok(balance) => ChainReport {
            valid: true,
            entries_checked: oldest_first.len(),
            final_balance: Some(balance),
            first_break: None,
        },
        Err(DomainError::BrokenChain {
            index,
            expected,
            found,
        }) => ChainReport {
            valid: false,
            entries_checked: index + 1,
            final_balance: None,
            first_break: Some(ChainBreak {
                index,
                expected,
                found,
            }),
        },
        Err(_) => ChainReport {
            valid: false,
            entries_checked: 0,
            final_balance: None,
            first_break: None,
        },
    }
}
