//! Credit ledger models.

use atelier_core::types::{Credits, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger transaction kinds stored in `credit_transactions.kind`.
pub const KIND_GRANT: &str = "grant";
pub const KIND_RESERVE: &str = "reserve";
pub const KIND_REFUND: &str = "refund";

/// A row from the `credit_accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditAccount {
    pub owner_id: DbId,
    pub balance: Credits,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `credit_reservations` table.
///
/// Reserving deducts immediately; there is no separate capture step.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditReservation {
    pub reservation_id: Uuid,
    pub owner_id: DbId,
    pub amount: Credits,
    pub refunded_amount: Credits,
    pub reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `credit_transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: DbId,
    pub owner_id: DbId,
    pub reservation_id: Option<Uuid>,
    pub kind: String,
    pub amount: Credits,
    pub balance_after: Credits,
    pub created_at: Timestamp,
}

/// Outcome of a reservation attempt. Insufficient balance is not an error.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(CreditReservation),
    Insufficient { balance: Credits, requested: Credits },
}

/// Outcome of a refund attempt.
#[derive(Debug, Clone)]
pub enum RefundOutcome {
    Refunded { balance_after: Credits },
    ReservationNotFound,
    Rejected(String),
}
