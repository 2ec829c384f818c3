//! Wallet manager implementation backed by PostgreSQL.
//!
//! All balance movements run inside a database transaction with either an
//! atomic conditional `UPDATE` (balance checks) or a `FOR UPDATE` row lock
//! (transaction settlement), so concurrent settlement of the same
//! transaction id leaves exactly one winner.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repository::WalletLedger;

use super::{
    errors::{WalletError, WalletResult},
    models::{ApprovalOutcome, TransactionStatus, Wallet, WalletTransaction},
};

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    pool: Arc<PgPool>,
}

impl WalletManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn wallet_row_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> WalletResult<(Uuid, i64)> {
        let row = sqlx::query("SELECT id, balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))?;
        Ok((row.get("id"), row.get("balance")))
    }

    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        wallet_id: Uuid,
        user_id: Uuid,
        amount: i64,
        status: TransactionStatus,
        reference: Option<&str>,
    ) -> WalletResult<WalletTransaction> {
        let row = sqlx::query(
            "INSERT INTO wallet_transactions (id, wallet_id, user_id, amount, status, reference) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, wallet_id, user_id, amount, status, reference, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(wallet_id)
        .bind(user_id)
        .bind(amount)
        .bind(status.to_string())
        .bind(reference)
        .fetch_one(&mut **tx)
        .await?;
        transaction_from_parts(&row)
    }
}

fn transaction_from_parts(row: &sqlx::postgres::PgRow) -> WalletResult<WalletTransaction> {
    Ok(WalletTransaction {
        id: row.get("id"),
        wallet_id: row.get("wallet_id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        status: row.get::<String, _>("status").parse()?,
        reference: row.get("reference"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl WalletLedger for WalletManager {
    async fn wallet_for_user(&self, user_id: Uuid) -> WalletResult<Wallet> {
        let row = sqlx::query(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::WalletNotFound(user_id))?;

        Ok(Wallet {
            id: row.get("id"),
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn debit_for_booking(
        &self,
        user_id: Uuid,
        amount: i64,
        booking_id: Uuid,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;

        // Atomic debit with balance check; checking and updating in one
        // statement closes the race between two concurrent debits.
        let updated = sqlx::query(
            "UPDATE wallets \
             SET balance = balance - $1, updated_at = NOW() \
             WHERE user_id = $2 AND balance >= $1 \
             RETURNING id, balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (wallet_id, new_balance): (Uuid, i64) = match updated {
            Some(row) => (row.get("id"), row.get("balance")),
            None => {
                // Either the wallet is missing or the balance is short.
                let check = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return match check {
                    Some(row) => Err(WalletError::InsufficientBalance {
                        available: row.get("balance"),
                        required: amount,
                    }),
                    None => Err(WalletError::WalletNotFound(user_id)),
                };
            }
        };

        Self::insert_entry(
            &mut tx,
            wallet_id,
            user_id,
            -amount,
            TransactionStatus::Approved,
            Some(&booking_id.to_string()),
        )
        .await?;

        tx.commit().await?;
        log::info!("debited {amount} from user {user_id} for booking {booking_id}");
        Ok(new_balance)
    }

    async fn credit_for_refund(
        &self,
        user_id: Uuid,
        amount: i64,
        booking_id: Uuid,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() \
             WHERE user_id = $2 \
             RETURNING id, balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WalletError::WalletNotFound(user_id))?;

        let wallet_id: Uuid = row.get("id");
        let new_balance: i64 = row.get("balance");

        Self::insert_entry(
            &mut tx,
            wallet_id,
            user_id,
            amount,
            TransactionStatus::Approved,
            Some(&booking_id.to_string()),
        )
        .await?;

        tx.commit().await?;
        log::info!("credited {amount} back to user {user_id} for booking {booking_id}");
        Ok(new_balance)
    }

    async fn create_pending_topup(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> WalletResult<WalletTransaction> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;
        let (wallet_id, _) = Self::wallet_row_for_update(&mut tx, user_id).await?;
        let entry = Self::insert_entry(
            &mut tx,
            wallet_id,
            user_id,
            amount,
            TransactionStatus::Pending,
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn create_pending_withdrawal(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> WalletResult<WalletTransaction> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;
        let (wallet_id, balance) = Self::wallet_row_for_update(&mut tx, user_id).await?;

        // Pending debits reserve funds before they settle.
        let reserved: i64 = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0) AS reserved FROM wallet_transactions \
             WHERE wallet_id = $1 AND status = 'PENDING' AND amount < 0",
        )
        .bind(wallet_id)
        .fetch_one(&mut *tx)
        .await?
        .get("reserved");

        let available = balance + reserved;
        if available < amount {
            return Err(WalletError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let entry = Self::insert_entry(
            &mut tx,
            wallet_id,
            user_id,
            -amount,
            TransactionStatus::Pending,
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn approve_pending(
        &self,
        tx_id: Uuid,
        expected_amount: Option<i64>,
    ) -> WalletResult<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, wallet_id, user_id, amount, status, reference, created_at, updated_at \
             FROM wallet_transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(tx_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WalletError::TransactionNotFound(tx_id))?;

        let entry = transaction_from_parts(&row)?;
        match entry.status {
            TransactionStatus::Approved => {
                // Gateway re-delivery: already settled, nothing to do.
                Ok(ApprovalOutcome::AlreadyApproved)
            }
            TransactionStatus::Cancelled => Err(WalletError::AlreadySettled(tx_id)),
            TransactionStatus::Pending => {
                if let Some(expected) = expected_amount {
                    if expected != entry.amount {
                        return Err(WalletError::AmountMismatch {
                            declared: entry.amount,
                            reported: expected,
                        });
                    }
                }

                sqlx::query(
                    "UPDATE wallet_transactions SET status = 'APPROVED', updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(tx_id)
                .execute(&mut *tx)
                .await?;

                let new_balance: i64 = sqlx::query(
                    "UPDATE wallets SET balance = balance + $1, updated_at = NOW() \
                     WHERE id = $2 RETURNING balance",
                )
                .bind(entry.amount)
                .bind(entry.wallet_id)
                .fetch_one(&mut *tx)
                .await?
                .get("balance");

                tx.commit().await?;
                log::info!(
                    "transaction {tx_id} approved, wallet {} balance now {new_balance}",
                    entry.wallet_id
                );
                Ok(ApprovalOutcome::Applied { new_balance })
            }
        }
    }

    async fn cancel_pending(&self, tx_id: Uuid, caller: Option<Uuid>) -> WalletResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT user_id, status FROM wallet_transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(tx_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WalletError::TransactionNotFound(tx_id))?;

        if let Some(caller) = caller {
            let owner: Uuid = row.get("user_id");
            if owner != caller {
                return Err(WalletError::NotOwner(tx_id));
            }
        }

        let status: TransactionStatus = row.get::<String, _>("status").parse()?;
        if status != TransactionStatus::Pending {
            return Err(WalletError::AlreadySettled(tx_id));
        }

        sqlx::query(
            "UPDATE wallet_transactions SET status = 'CANCELLED', updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(tx_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn transaction_by_id(&self, tx_id: Uuid) -> WalletResult<Option<WalletTransaction>> {
        let row = sqlx::query(
            "SELECT id, wallet_id, user_id, amount, status, reference, created_at, updated_at \
             FROM wallet_transactions WHERE id = $1",
        )
        .bind(tx_id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.map(|r| transaction_from_parts(&r)).transpose()
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> WalletResult<Vec<WalletTransaction>> {
        let rows = sqlx::query(
            "SELECT id, wallet_id, user_id, amount, status, reference, created_at, updated_at \
             FROM wallet_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.iter().map(transaction_from_parts).collect()
    }
}
