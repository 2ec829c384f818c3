//! Fire-and-forget notification hook.
//!
//! The notification collaborator is external; the engine only emits events
//! keyed by user id and never awaits delivery. Failures here must not
//! affect booking or wallet correctness.

use uuid::Uuid;

/// Events the engine reports to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    BookingCreated {
        booking_id: Uuid,
    },
    BookingCancelled {
        booking_id: Uuid,
        penalty: i64,
        no_show: bool,
    },
    PaymentConfirmed {
        booking_id: Uuid,
    },
    BookingCompleted {
        booking_id: Uuid,
        cost_settlement: i64,
    },
    TopUpCredited {
        amount: i64,
        new_balance: i64,
    },
    WithdrawalDecided {
        transaction_id: Uuid,
        approved: bool,
    },
}

/// Sink for user-facing events.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: Uuid, event: Notification);
}

/// Default notifier that only logs the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user_id: Uuid, event: Notification) {
        log::info!("notify user {user_id}: {event:?}");
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::sync::Mutex;

    /// Notifier that records every event for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<(Uuid, Notification)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, user_id: Uuid, event: Notification) {
            self.events.lock().unwrap().push((user_id, event));
        }
    }
}
