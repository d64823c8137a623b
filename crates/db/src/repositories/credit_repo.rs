//! Repository for the credit ledger tables.

use atelier_core::credits;
use atelier_core::types::{Credits, DbId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::credit::{
    CreditAccount, CreditReservation, CreditTransaction, RefundOutcome, ReserveOutcome,
    KIND_GRANT, KIND_REFUND, KIND_RESERVE,
};

/// Column list for credit_reservations queries.
const RESERVATION_COLUMNS: &str =
    "reservation_id, owner_id, amount, refunded_amount, reason, created_at, updated_at";

/// Column list for credit_transactions queries.
const TRANSACTION_COLUMNS: &str =
    "id, owner_id, reservation_id, kind, amount, balance_after, created_at";

/// Reserve, refund and grant operations on owner balances.
///
/// Every balance change happens inside a transaction that locks the owner's
/// account row and appends a `credit_transactions` entry.
pub struct CreditRepo;

impl CreditRepo {
    /// Add credits to an owner's balance, creating the account if needed.
    pub async fn grant(
        pool: &PgPool,
        owner_id: DbId,
        amount: Credits,
    ) -> Result<CreditAccount, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let account = sqlx::query_as::<_, CreditAccount>(
            "INSERT INTO credit_accounts (owner_id, balance) VALUES ($1, $2)
             ON CONFLICT (owner_id)
             DO UPDATE SET balance = credit_accounts.balance + EXCLUDED.balance, updated_at = NOW()
             RETURNING owner_id, balance, created_at, updated_at",
        )
        .bind(owner_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO credit_transactions (owner_id, kind, amount, balance_after)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(owner_id)
        .bind(KIND_GRANT)
        .bind(amount)
        .bind(account.balance)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(account)
    }

    /// Current balance, or `None` if the owner has no account.
    pub async fn balance(pool: &PgPool, owner_id: DbId) -> Result<Option<Credits>, sqlx::Error> {
        sqlx::query_scalar("SELECT balance FROM credit_accounts WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Deduct `amount` from the owner's balance and record a reservation.
    ///
    /// Returns [`ReserveOutcome::Insufficient`] without changing anything when
    /// the balance (or the account) is missing.
    pub async fn reserve(
        pool: &PgPool,
        owner_id: DbId,
        amount: Credits,
        reason: &str,
    ) -> Result<ReserveOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let balance: Option<Credits> = sqlx::query_scalar(
            "SELECT balance FROM credit_accounts WHERE owner_id = $1 FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let balance = balance.unwrap_or(0);
        if balance < amount {
            tx.rollback().await?;
            return Ok(ReserveOutcome::Insufficient {
                balance,
                requested: amount,
            });
        }

        let balance_after: Credits = sqlx::query_scalar(
            "UPDATE credit_accounts SET balance = balance - $2, updated_at = NOW()
             WHERE owner_id = $1
             RETURNING balance",
        )
        .bind(owner_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO credit_reservations (reservation_id, owner_id, amount, reason)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESERVATION_COLUMNS}"
        );
        let reservation = sqlx::query_as::<_, CreditReservation>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(amount)
            .bind(reason)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO credit_transactions (owner_id, reservation_id, kind, amount, balance_after)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(owner_id)
        .bind(reservation.reservation_id)
        .bind(KIND_RESERVE)
        .bind(-amount)
        .bind(balance_after)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReserveOutcome::Reserved(reservation))
    }

    /// Return `amount` credits against a reservation.
    ///
    /// The refund must belong to `owner_id` and must not exceed what is still
    /// outstanding on the reservation.
    pub async fn refund(
        pool: &PgPool,
        owner_id: DbId,
        reservation_id: Uuid,
        amount: Credits,
    ) -> Result<RefundOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM credit_reservations
             WHERE reservation_id = $1 AND owner_id = $2
             FOR UPDATE"
        );
        let reservation = sqlx::query_as::<_, CreditReservation>(&query)
            .bind(reservation_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(reservation) = reservation else {
            tx.rollback().await?;
            return Ok(RefundOutcome::ReservationNotFound);
        };

        if let Err(e) =
            credits::validate_refund(amount, reservation.amount, reservation.refunded_amount)
        {
            tx.rollback().await?;
            return Ok(RefundOutcome::Rejected(e.to_string()));
        }

        sqlx::query(
            "UPDATE credit_reservations SET refunded_amount = refunded_amount + $2, updated_at = NOW()
             WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        let balance_after: Credits = sqlx::query_scalar(
            "UPDATE credit_accounts SET balance = balance + $2, updated_at = NOW()
             WHERE owner_id = $1
             RETURNING balance",
        )
        .bind(owner_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO credit_transactions (owner_id, reservation_id, kind, amount, balance_after)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(owner_id)
        .bind(reservation_id)
        .bind(KIND_REFUND)
        .bind(amount)
        .bind(balance_after)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RefundOutcome::Refunded { balance_after })
    }

    /// Find a reservation by id.
    pub async fn find_reservation(
        pool: &PgPool,
        reservation_id: Uuid,
    ) -> Result<Option<CreditReservation>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM credit_reservations WHERE reservation_id = $1"
        );
        sqlx::query_as::<_, CreditReservation>(&query)
            .bind(reservation_id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's ledger entries, newest first.
    pub async fn list_transactions(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<CreditTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM credit_transactions
             WHERE owner_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }
}
