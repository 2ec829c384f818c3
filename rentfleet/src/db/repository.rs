//! Repository trait definitions for testability and dependency injection.
//!
//! The booking engine, settlement coordinator, and cleanup scheduler are
//! written against these traits. PostgreSQL implementations live here and
//! in [`crate::wallet::manager`]; an in-memory implementation backs the
//! unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::booking::{
    Booking, BookingResult, BookingStatus, OperatingHours, PenaltyConfig, VehicleSnapshot,
};
use crate::contract::{Contract, FinalContract};
use crate::slots::TimeSlot;
use crate::wallet::{ApprovalOutcome, Wallet, WalletResult, WalletTransaction};

/// Persistence for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> BookingResult<()>;

    async fn by_id(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    /// Lookup by the gateway transaction reference.
    async fn by_transaction_ref(&self, reference: &str) -> BookingResult<Option<Booking>>;

    async fn list_by_renter(
        &self,
        renter_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<Booking>>;

    async fn list_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>>;

    /// Compare-and-swap status transition. Returns false when the stored
    /// status is not `from`; the caller reports the state conflict.
    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> BookingResult<bool>;

    /// Compare-and-swap cancellation from any of `from`, recording the
    /// applied penalty and an optional reason.
    async fn cancel(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        penalty: i64,
        reason: Option<&str>,
    ) -> BookingResult<bool>;

    /// Whether the renter already holds a non-terminal booking for the
    /// identical vehicle and window.
    async fn has_active_duplicate(
        &self,
        renter_id: Uuid,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<bool>;

    /// `PENDING` bookings created at or before `cutoff`.
    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Booking>>;
}

/// Persistence for committed reservation intervals.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn insert(&self, slot: &TimeSlot) -> BookingResult<()>;

    /// Active slots for the vehicle overlapping the half-open window.
    async fn overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<TimeSlot>>;

    /// Remove every slot held by a booking. Returns the number removed.
    async fn release_for_booking(&self, booking_id: Uuid) -> BookingResult<u64>;

    async fn upcoming_for_vehicle(
        &self,
        vehicle_id: Uuid,
        after: DateTime<Utc>,
    ) -> BookingResult<Vec<TimeSlot>>;
}

/// Read access to the vehicle/owner attributes snapshotted at booking
/// creation.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn snapshot(&self, vehicle_id: Uuid) -> BookingResult<Option<VehicleSnapshot>>;
}

/// Persistence for contract and final-contract records.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert(&self, contract: &Contract) -> BookingResult<()>;

    async fn by_booking(&self, booking_id: Uuid) -> BookingResult<Option<Contract>>;

    /// CAS `PROCESSING → FINISHED`, revising the settled cost. Returns the
    /// finished contract, or `None` when no `PROCESSING` contract exists
    /// for the booking.
    async fn finish(&self, booking_id: Uuid, cost_settlement: i64)
    -> BookingResult<Option<Contract>>;

    async fn insert_final(&self, record: &FinalContract) -> BookingResult<()>;

    async fn final_by_booking(&self, booking_id: Uuid) -> BookingResult<Option<FinalContract>>;
}

/// Wallet ledger operations. Every mutation is atomic per wallet or per
/// transaction id; concurrent settlement of the same transaction leaves
/// exactly one winner.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    async fn wallet_for_user(&self, user_id: Uuid) -> WalletResult<Wallet>;

    /// Debit the full booking cost, atomically checking the balance.
    /// Creates an `APPROVED` debit entry referencing the booking and
    /// returns the new balance.
    async fn debit_for_booking(
        &self,
        user_id: Uuid,
        amount: i64,
        booking_id: Uuid,
    ) -> WalletResult<i64>;

    /// Credit back a booking debit (compensation path). Creates an
    /// `APPROVED` credit entry referencing the booking.
    async fn credit_for_refund(
        &self,
        user_id: Uuid,
        amount: i64,
        booking_id: Uuid,
    ) -> WalletResult<i64>;

    /// Create a `PENDING` credit awaiting gateway confirmation.
    async fn create_pending_topup(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> WalletResult<WalletTransaction>;

    /// Create a `PENDING` debit if the available balance (balance minus
    /// other pending debits) covers it.
    async fn create_pending_withdrawal(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> WalletResult<WalletTransaction>;

    /// Settle a `PENDING` transaction to `APPROVED`, moving the balance by
    /// the signed amount. When `expected_amount` is given it must match the
    /// stored amount. Approving an already-`APPROVED` transaction is a
    /// no-op.
    async fn approve_pending(
        &self,
        tx_id: Uuid,
        expected_amount: Option<i64>,
    ) -> WalletResult<ApprovalOutcome>;

    /// Settle a `PENDING` transaction to `CANCELLED`. When `caller` is
    /// given the transaction must belong to them.
    async fn cancel_pending(&self, tx_id: Uuid, caller: Option<Uuid>) -> WalletResult<()>;

    async fn transaction_by_id(&self, tx_id: Uuid) -> WalletResult<Option<WalletTransaction>>;

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> WalletResult<Vec<WalletTransaction>>;
}

fn booking_from_row(row: &PgRow) -> BookingResult<Booking> {
    Ok(Booking {
        id: row.get("id"),
        renter_id: row.get("renter_id"),
        vehicle_id: row.get("vehicle_id"),
        owner_id: row.get("owner_id"),
        time_start: row.get("time_start"),
        time_end: row.get("time_end"),
        address: row.get("address"),
        phone_number: row.get("phone_number"),
        total_cost: row.get("total_cost"),
        penalty: PenaltyConfig {
            kind: row.get::<String, _>("penalty_kind").parse()?,
            value: row.get("penalty_value"),
            min_cancel_hours: row.get("min_cancel_hours"),
        },
        transaction_ref: row.get("transaction_ref"),
        status: row.get::<String, _>("status").parse()?,
        cancel_penalty: row.get("cancel_penalty"),
        cancel_reason: row.get("cancel_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const BOOKING_COLUMNS: &str = "id, renter_id, vehicle_id, owner_id, time_start, time_end, \
     address, phone_number, total_cost, penalty_kind, penalty_value, min_cancel_hours, \
     transaction_ref, status, cancel_penalty, cancel_reason, created_at, updated_at";

/// Default PostgreSQL implementation of [`BookingStore`].
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO bookings (id, renter_id, vehicle_id, owner_id, time_start, time_end, \
             address, phone_number, total_cost, penalty_kind, penalty_value, min_cancel_hours, \
             transaction_ref, status, cancel_penalty, cancel_reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(booking.id)
        .bind(booking.renter_id)
        .bind(booking.vehicle_id)
        .bind(booking.owner_id)
        .bind(booking.time_start)
        .bind(booking.time_end)
        .bind(&booking.address)
        .bind(&booking.phone_number)
        .bind(booking.total_cost)
        .bind(booking.penalty.kind.to_string())
        .bind(booking.penalty.value)
        .bind(booking.penalty.min_cancel_hours)
        .bind(&booking.transaction_ref)
        .bind(booking.status.to_string())
        .bind(booking.cancel_penalty)
        .bind(booking.cancel_reason.as_deref())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| booking_from_row(&r)).transpose()
    }

    async fn by_transaction_ref(&self, reference: &str) -> BookingResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE transaction_ref = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| booking_from_row(&r)).transpose()
    }

    async fn list_by_renter(
        &self,
        renter_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<Booking>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings \
                     WHERE renter_id = $1 AND status = $2 ORDER BY created_at DESC"
                ))
                .bind(renter_id)
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings \
                     WHERE renter_id = $1 ORDER BY created_at DESC"
                ))
                .bind(renter_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(booking_from_row).collect()
    }

    async fn list_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> BookingResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.to_string())
        .bind(to.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn cancel(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        penalty: i64,
        reason: Option<&str>,
    ) -> BookingResult<bool> {
        let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED', cancel_penalty = $2, \
             cancel_reason = $3, updated_at = NOW() \
             WHERE id = $1 AND status = ANY($4)",
        )
        .bind(id)
        .bind(penalty)
        .bind(reason)
        .bind(&from)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn has_active_duplicate(
        &self,
        renter_id: Uuid,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM bookings \
             WHERE renter_id = $1 AND vehicle_id = $2 \
             AND time_start = $3 AND time_end = $4 \
             AND status NOT IN ('COMPLETED', 'CANCELLED')) AS found",
        )
        .bind(renter_id)
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("found"))
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE status = 'PENDING' AND created_at <= $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }
}

fn slot_from_row(row: &PgRow) -> TimeSlot {
    TimeSlot {
        id: row.get("id"),
        vehicle_id: row.get("vehicle_id"),
        booking_id: row.get("booking_id"),
        time_from: row.get("time_from"),
        time_to: row.get("time_to"),
        created_at: row.get("created_at"),
    }
}

/// Default PostgreSQL implementation of [`SlotStore`].
pub struct PgSlotStore {
    pool: PgPool,
}

impl PgSlotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotStore for PgSlotStore {
    async fn insert(&self, slot: &TimeSlot) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO time_slots (id, vehicle_id, booking_id, time_from, time_to, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(slot.id)
        .bind(slot.vehicle_id)
        .bind(slot.booking_id)
        .bind(slot.time_from)
        .bind(slot.time_to)
        .bind(slot.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<Vec<TimeSlot>> {
        // half-open intervals: touching boundaries do not conflict
        let rows = sqlx::query(
            "SELECT id, vehicle_id, booking_id, time_from, time_to, created_at \
             FROM time_slots \
             WHERE vehicle_id = $1 AND time_from < $3 AND time_to > $2",
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(slot_from_row).collect())
    }

    async fn release_for_booking(&self, booking_id: Uuid) -> BookingResult<u64> {
        let result = sqlx::query("DELETE FROM time_slots WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn upcoming_for_vehicle(
        &self,
        vehicle_id: Uuid,
        after: DateTime<Utc>,
    ) -> BookingResult<Vec<TimeSlot>> {
        let rows = sqlx::query(
            "SELECT id, vehicle_id, booking_id, time_from, time_to, created_at \
             FROM time_slots \
             WHERE vehicle_id = $1 AND time_to > $2 \
             ORDER BY time_from ASC",
        )
        .bind(vehicle_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(slot_from_row).collect())
    }
}

/// Default PostgreSQL implementation of [`VehicleStore`].
pub struct PgVehicleStore {
    pool: PgPool,
}

impl PgVehicleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleStore for PgVehicleStore {
    async fn snapshot(&self, vehicle_id: Uuid) -> BookingResult<Option<VehicleSnapshot>> {
        let row = sqlx::query(
            "SELECT v.id, v.owner_id, v.cost_per_day, v.penalty_kind, v.penalty_value, \
             v.min_cancel_hours, u.open_time, u.close_time \
             FROM vehicles v JOIN users u ON u.id = v.owner_id \
             WHERE v.id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let open: Option<chrono::NaiveTime> = row.get("open_time");
        let close: Option<chrono::NaiveTime> = row.get("close_time");
        let operating_hours = match (open, close) {
            (Some(open), Some(close)) => Some(OperatingHours { open, close }),
            _ => None,
        };

        Ok(Some(VehicleSnapshot {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            cost_per_day: row.get("cost_per_day"),
            penalty: PenaltyConfig {
                kind: row.get::<String, _>("penalty_kind").parse()?,
                value: row.get("penalty_value"),
                min_cancel_hours: row.get("min_cancel_hours"),
            },
            operating_hours,
        }))
    }
}

fn contract_from_row(row: &PgRow) -> BookingResult<Contract> {
    Ok(Contract {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        renter_id: row.get("renter_id"),
        owner_id: row.get("owner_id"),
        status: row.get::<String, _>("status").parse()?,
        cost_settlement: row.get("cost_settlement"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Default PostgreSQL implementation of [`ContractStore`].
pub struct PgContractStore {
    pool: PgPool,
}

impl PgContractStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContractStore for PgContractStore {
    async fn insert(&self, contract: &Contract) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO contracts (id, booking_id, renter_id, owner_id, status, \
             cost_settlement, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(contract.id)
        .bind(contract.booking_id)
        .bind(contract.renter_id)
        .bind(contract.owner_id)
        .bind(contract.status.to_string())
        .bind(contract.cost_settlement)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_booking(&self, booking_id: Uuid) -> BookingResult<Option<Contract>> {
        let row = sqlx::query(
            "SELECT id, booking_id, renter_id, owner_id, status, cost_settlement, \
             created_at, updated_at FROM contracts WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| contract_from_row(&r)).transpose()
    }

    async fn finish(
        &self,
        booking_id: Uuid,
        cost_settlement: i64,
    ) -> BookingResult<Option<Contract>> {
        let row = sqlx::query(
            "UPDATE contracts SET status = 'FINISHED', cost_settlement = $2, updated_at = NOW() \
             WHERE booking_id = $1 AND status = 'PROCESSING' \
             RETURNING id, booking_id, renter_id, owner_id, status, cost_settlement, \
             created_at, updated_at",
        )
        .bind(booking_id)
        .bind(cost_settlement)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| contract_from_row(&r)).transpose()
    }

    async fn insert_final(&self, record: &FinalContract) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO final_contracts (id, contract_id, booking_id, cost_settlement, \
             time_finish, note, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(record.contract_id)
        .bind(record.booking_id)
        .bind(record.cost_settlement)
        .bind(record.time_finish)
        .bind(record.note.as_deref())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn final_by_booking(&self, booking_id: Uuid) -> BookingResult<Option<FinalContract>> {
        let row = sqlx::query(
            "SELECT id, contract_id, booking_id, cost_settlement, time_finish, note, created_at \
             FROM final_contracts WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| FinalContract {
            id: r.get("id"),
            contract_id: r.get("contract_id"),
            booking_id: r.get("booking_id"),
            cost_settlement: r.get("cost_settlement"),
            time_finish: r.get("time_finish"),
            note: r.get("note"),
            created_at: r.get("created_at"),
        }))
    }
}

/// In-memory implementation for unit tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::contract::ContractStatus;
    use crate::wallet::{TransactionStatus, WalletError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        bookings: HashMap<Uuid, Booking>,
        slots: Vec<TimeSlot>,
        vehicles: HashMap<Uuid, VehicleSnapshot>,
        contracts: HashMap<Uuid, Contract>,
        final_contracts: Vec<FinalContract>,
        wallets: HashMap<Uuid, Wallet>,
        transactions: HashMap<Uuid, WalletTransaction>,
    }

    /// One shared in-memory store implementing every repository trait.
    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_vehicle(&self, snapshot: VehicleSnapshot) {
            self.inner
                .lock()
                .unwrap()
                .vehicles
                .insert(snapshot.id, snapshot);
        }

        pub fn open_wallet(&self, user_id: Uuid, balance: i64) -> Wallet {
            let now = Utc::now();
            let wallet = Wallet {
                id: Uuid::new_v4(),
                user_id,
                balance,
                created_at: now,
                updated_at: now,
            };
            self.inner
                .lock()
                .unwrap()
                .wallets
                .insert(user_id, wallet.clone());
            wallet
        }

        pub fn booking_status(&self, id: Uuid) -> Option<BookingStatus> {
            self.inner
                .lock()
                .unwrap()
                .bookings
                .get(&id)
                .map(|b| b.status)
        }

        pub fn slot_count(&self) -> usize {
            self.inner.lock().unwrap().slots.len()
        }

        fn record_entry(
            inner: &mut Inner,
            wallet_id: Uuid,
            user_id: Uuid,
            amount: i64,
            status: TransactionStatus,
            reference: Option<String>,
        ) -> WalletTransaction {
            let now = Utc::now();
            let tx = WalletTransaction {
                id: Uuid::new_v4(),
                wallet_id,
                user_id,
                amount,
                status,
                reference,
                created_at: now,
                updated_at: now,
            };
            inner.transactions.insert(tx.id, tx.clone());
            tx
        }
    }

    #[async_trait]
    impl BookingStore for MemoryStore {
        async fn insert(&self, booking: &Booking) -> BookingResult<()> {
            self.inner
                .lock()
                .unwrap()
                .bookings
                .insert(booking.id, booking.clone());
            Ok(())
        }

        async fn by_id(&self, id: Uuid) -> BookingResult<Option<Booking>> {
            Ok(self.inner.lock().unwrap().bookings.get(&id).cloned())
        }

        async fn by_transaction_ref(&self, reference: &str) -> BookingResult<Option<Booking>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .bookings
                .values()
                .find(|b| b.transaction_ref == reference)
                .cloned())
        }

        async fn list_by_renter(
            &self,
            renter_id: Uuid,
            status: Option<BookingStatus>,
        ) -> BookingResult<Vec<Booking>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .bookings
                .values()
                .filter(|b| b.renter_id == renter_id)
                .filter(|b| status.is_none_or(|s| b.status == s))
                .cloned()
                .collect())
        }

        async fn list_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .bookings
                .values()
                .filter(|b| b.status == status)
                .cloned()
                .collect())
        }

        async fn transition(
            &self,
            id: Uuid,
            from: BookingStatus,
            to: BookingStatus,
        ) -> BookingResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            match inner.bookings.get_mut(&id) {
                Some(b) if b.status == from => {
                    b.status = to;
                    b.updated_at = Utc::now();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn cancel(
            &self,
            id: Uuid,
            from: &[BookingStatus],
            penalty: i64,
            reason: Option<&str>,
        ) -> BookingResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            match inner.bookings.get_mut(&id) {
                Some(b) if from.contains(&b.status) => {
                    b.status = BookingStatus::Cancelled;
                    b.cancel_penalty = Some(penalty);
                    b.cancel_reason = reason.map(str::to_string);
                    b.updated_at = Utc::now();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn has_active_duplicate(
            &self,
            renter_id: Uuid,
            vehicle_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> BookingResult<bool> {
            Ok(self.inner.lock().unwrap().bookings.values().any(|b| {
                b.renter_id == renter_id
                    && b.vehicle_id == vehicle_id
                    && b.time_start == start
                    && b.time_end == end
                    && !b.status.is_terminal()
            }))
        }

        async fn stale_pending(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .bookings
                .values()
                .filter(|b| b.status == BookingStatus::Pending && b.created_at <= cutoff)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl SlotStore for MemoryStore {
        async fn insert(&self, slot: &TimeSlot) -> BookingResult<()> {
            self.inner.lock().unwrap().slots.push(slot.clone());
            Ok(())
        }

        async fn overlapping(
            &self,
            vehicle_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> BookingResult<Vec<TimeSlot>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .slots
                .iter()
                .filter(|s| s.vehicle_id == vehicle_id && s.overlaps(start, end))
                .cloned()
                .collect())
        }

        async fn release_for_booking(&self, booking_id: Uuid) -> BookingResult<u64> {
            let mut inner = self.inner.lock().unwrap();
            let before = inner.slots.len();
            inner.slots.retain(|s| s.booking_id != booking_id);
            Ok((before - inner.slots.len()) as u64)
        }

        async fn upcoming_for_vehicle(
            &self,
            vehicle_id: Uuid,
            after: DateTime<Utc>,
        ) -> BookingResult<Vec<TimeSlot>> {
            let mut slots: Vec<TimeSlot> = self
                .inner
                .lock()
                .unwrap()
                .slots
                .iter()
                .filter(|s| s.vehicle_id == vehicle_id && s.time_to > after)
                .cloned()
                .collect();
            slots.sort_by_key(|s| s.time_from);
            Ok(slots)
        }
    }

    #[async_trait]
    impl VehicleStore for MemoryStore {
        async fn snapshot(&self, vehicle_id: Uuid) -> BookingResult<Option<VehicleSnapshot>> {
            Ok(self.inner.lock().unwrap().vehicles.get(&vehicle_id).cloned())
        }
    }

    #[async_trait]
    impl ContractStore for MemoryStore {
        async fn insert(&self, contract: &Contract) -> BookingResult<()> {
            self.inner
                .lock()
                .unwrap()
                .contracts
                .insert(contract.id, contract.clone());
            Ok(())
        }

        async fn by_booking(&self, booking_id: Uuid) -> BookingResult<Option<Contract>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .contracts
                .values()
                .find(|c| c.booking_id == booking_id)
                .cloned())
        }

        async fn finish(
            &self,
            booking_id: Uuid,
            cost_settlement: i64,
        ) -> BookingResult<Option<Contract>> {
            let mut inner = self.inner.lock().unwrap();
            let contract = inner
                .contracts
                .values_mut()
                .find(|c| c.booking_id == booking_id && c.status == ContractStatus::Processing);
            Ok(contract.map(|c| {
                c.status = ContractStatus::Finished;
                c.cost_settlement = cost_settlement;
                c.updated_at = Utc::now();
                c.clone()
            }))
        }

        async fn insert_final(&self, record: &FinalContract) -> BookingResult<()> {
            self.inner
                .lock()
                .unwrap()
                .final_contracts
                .push(record.clone());
            Ok(())
        }

        async fn final_by_booking(&self, booking_id: Uuid) -> BookingResult<Option<FinalContract>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .final_contracts
                .iter()
                .find(|f| f.booking_id == booking_id)
                .cloned())
        }
    }

    #[async_trait]
    impl WalletLedger for MemoryStore {
        async fn wallet_for_user(&self, user_id: Uuid) -> WalletResult<Wallet> {
            self.inner
                .lock()
                .unwrap()
                .wallets
                .get(&user_id)
                .cloned()
                .ok_or(WalletError::WalletNotFound(user_id))
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
            let mut inner = self.inner.lock().unwrap();
            let wallet = inner
                .wallets
                .get_mut(&user_id)
                .ok_or(WalletError::WalletNotFound(user_id))?;
            if wallet.balance < amount {
                return Err(WalletError::InsufficientBalance {
                    available: wallet.balance,
                    required: amount,
                });
            }
            wallet.balance -= amount;
            let new_balance = wallet.balance;
            let wallet_id = wallet.id;
            MemoryStore::record_entry(
                &mut inner,
                wallet_id,
                user_id,
                -amount,
                TransactionStatus::Approved,
                Some(booking_id.to_string()),
            );
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
            let mut inner = self.inner.lock().unwrap();
            let wallet = inner
                .wallets
                .get_mut(&user_id)
                .ok_or(WalletError::WalletNotFound(user_id))?;
            wallet.balance += amount;
            let new_balance = wallet.balance;
            let wallet_id = wallet.id;
            MemoryStore::record_entry(
                &mut inner,
                wallet_id,
                user_id,
                amount,
                TransactionStatus::Approved,
                Some(booking_id.to_string()),
            );
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
            let mut inner = self.inner.lock().unwrap();
            let wallet_id = inner
                .wallets
                .get(&user_id)
                .ok_or(WalletError::WalletNotFound(user_id))?
                .id;
            Ok(MemoryStore::record_entry(
                &mut inner,
                wallet_id,
                user_id,
                amount,
                TransactionStatus::Pending,
                None,
            ))
        }

        async fn create_pending_withdrawal(
            &self,
            user_id: Uuid,
            amount: i64,
        ) -> WalletResult<WalletTransaction> {
            if amount <= 0 {
                return Err(WalletError::InvalidAmount(amount));
            }
            let mut inner = self.inner.lock().unwrap();
            let wallet = inner
                .wallets
                .get(&user_id)
                .ok_or(WalletError::WalletNotFound(user_id))?;
            let wallet_id = wallet.id;
            let pending_debits: i64 = inner
                .transactions
                .values()
                .filter(|t| {
                    t.wallet_id == wallet_id
                        && t.status == TransactionStatus::Pending
                        && t.amount < 0
                })
                .map(|t| t.amount)
                .sum();
            let available = wallet.balance + pending_debits;
            if available < amount {
                return Err(WalletError::InsufficientBalance {
                    available,
                    required: amount,
                });
            }
            Ok(MemoryStore::record_entry(
                &mut inner,
                wallet_id,
                user_id,
                -amount,
                TransactionStatus::Pending,
                None,
            ))
        }

        async fn approve_pending(
            &self,
            tx_id: Uuid,
            expected_amount: Option<i64>,
        ) -> WalletResult<ApprovalOutcome> {
            let mut inner = self.inner.lock().unwrap();
            let tx = inner
                .transactions
                .get(&tx_id)
                .cloned()
                .ok_or(WalletError::TransactionNotFound(tx_id))?;
            match tx.status {
                TransactionStatus::Approved => Ok(ApprovalOutcome::AlreadyApproved),
                TransactionStatus::Cancelled => Err(WalletError::AlreadySettled(tx_id)),
                TransactionStatus::Pending => {
                    if let Some(expected) = expected_amount {
                        if expected != tx.amount {
                            return Err(WalletError::AmountMismatch {
                                declared: tx.amount,
                                reported: expected,
                            });
                        }
                    }
                    let wallet = inner
                        .wallets
                        .get_mut(&tx.user_id)
                        .ok_or(WalletError::WalletNotFound(tx.user_id))?;
                    wallet.balance += tx.amount;
                    let new_balance = wallet.balance;
                    let entry = inner.transactions.get_mut(&tx_id).unwrap();
                    entry.status = TransactionStatus::Approved;
                    entry.updated_at = Utc::now();
                    Ok(ApprovalOutcome::Applied { new_balance })
                }
            }
        }

        async fn cancel_pending(&self, tx_id: Uuid, caller: Option<Uuid>) -> WalletResult<()> {
            let mut inner = self.inner.lock().unwrap();
            let tx = inner
                .transactions
                .get_mut(&tx_id)
                .ok_or(WalletError::TransactionNotFound(tx_id))?;
            if let Some(caller) = caller {
                if tx.user_id != caller {
                    return Err(WalletError::NotOwner(tx_id));
                }
            }
            if tx.status != TransactionStatus::Pending {
                return Err(WalletError::AlreadySettled(tx_id));
            }
            tx.status = TransactionStatus::Cancelled;
            tx.updated_at = Utc::now();
            Ok(())
        }

        async fn transaction_by_id(&self, tx_id: Uuid) -> WalletResult<Option<WalletTransaction>> {
            Ok(self.inner.lock().unwrap().transactions.get(&tx_id).cloned())
        }

        async fn transactions_for_user(
            &self,
            user_id: Uuid,
            limit: i64,
        ) -> WalletResult<Vec<WalletTransaction>> {
            let mut txs: Vec<WalletTransaction> = self
                .inner
                .lock()
                .unwrap()
                .transactions
                .values()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect();
            txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            txs.truncate(limit.max(0) as usize);
            Ok(txs)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::wallet::TransactionStatus;

        #[tokio::test]
        async fn pending_debits_reserve_available_balance() {
            let store = MemoryStore::new();
            let user = Uuid::new_v4();
            store.open_wallet(user, 1_000);

            store.create_pending_withdrawal(user, 800).await.unwrap();
            let err = store.create_pending_withdrawal(user, 300).await.unwrap_err();
            assert!(matches!(
                err,
                WalletError::InsufficientBalance {
                    available: 200,
                    required: 300
                }
            ));
            // balance itself is untouched until approval
            assert_eq!(store.wallet_for_user(user).await.unwrap().balance, 1_000);
        }

        #[tokio::test]
        async fn approve_moves_balance_once() {
            let store = MemoryStore::new();
            let user = Uuid::new_v4();
            store.open_wallet(user, 0);

            let tx = store.create_pending_topup(user, 250).await.unwrap();
            assert_eq!(tx.status, TransactionStatus::Pending);

            let outcome = store.approve_pending(tx.id, Some(250)).await.unwrap();
            assert_eq!(outcome, ApprovalOutcome::Applied { new_balance: 250 });

            let outcome = store.approve_pending(tx.id, Some(250)).await.unwrap();
            assert_eq!(outcome, ApprovalOutcome::AlreadyApproved);
            assert_eq!(store.wallet_for_user(user).await.unwrap().balance, 250);
        }
    }
}
