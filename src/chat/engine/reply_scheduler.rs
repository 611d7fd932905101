//! Cancellable delayed tasks keyed by conversation.
//!
//! Used for the simulated "typing" pause: the assistant reply is appended
//! only after the delay, and tearing down a conversation (or the whole
//! service) cancels the pending append.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::ConversationId;

#[derive(Debug)]
struct PendingReply {
    ticket: u64,
    cancel: Arc<Notify>,
}

/// A claimed slot for one conversation, not yet armed with a task.
///
/// Obtained from [`ReplyScheduler::reserve`]; must be passed to either
/// [`ReplyScheduler::arm`] or [`ReplyScheduler::release`].
#[derive(Debug)]
#[must_use = "a reservation blocks the conversation until armed or released"]
pub struct Reservation {
    id: ConversationId,
    ticket: u64,
    cancel: Arc<Notify>,
}

impl Reservation {
    /// Conversation the slot belongs to.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.id
    }
}

/// At most one pending task per conversation.
#[derive(Debug, Default)]
pub struct ReplyScheduler {
    pending: Arc<DashMap<ConversationId, PendingReply>>,
    next_ticket: AtomicU64,
}

impl ReplyScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `id` before doing the work the task depends on.
    ///
    /// # Errors
    /// Returns `ChatError::ReplyPending` if the slot is already taken.
    pub fn reserve(&self, id: ConversationId) -> ChatResult<Reservation> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(Notify::new());

        match self.pending.entry(id) {
            Entry::Occupied(_) => Err(ChatError::ReplyPending(id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingReply {
                    ticket,
                    cancel: Arc::clone(&cancel),
                });
                Ok(Reservation { id, ticket, cancel })
            }
        }
    }

    /// Give a reservation back without running anything.
    pub fn release(&self, reservation: Reservation) {
        let Reservation { id, ticket, .. } = reservation;
        self.pending.remove_if(&id, |_, p| p.ticket == ticket);
    }

    /// Run `task` on the blocking pool after `delay`, unless cancelled first.
    ///
    /// A reservation cancelled before arming stays cancelled. Must be called
    /// from within a tokio runtime.
    pub fn arm<F>(&self, reservation: Reservation, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Reservation { id, ticket, cancel } = reservation;
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    // Only the task still registered under its own ticket may run.
                    if pending.remove_if(&id, |_, p| p.ticket == ticket).is_none() {
                        debug!(%id, "Pending reply was cancelled before firing");
                        return;
                    }
                    if let Err(err) = tokio::task::spawn_blocking(task).await {
                        error!(%id, %err, "Reply task failed");
                    }
                }
                () = cancel.notified() => {
                    debug!(%id, "Pending reply cancelled");
                }
            }
        });
    }

    /// Reserve and arm in one step.
    ///
    /// # Errors
    /// Returns `ChatError::ReplyPending` if a task is already pending for `id`.
    pub fn schedule<F>(&self, id: ConversationId, delay: Duration, task: F) -> ChatResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let reservation = self.reserve(id)?;
        self.arm(reservation, delay, task);
        Ok(())
    }

    /// Cancel the pending task for `id`. Returns whether one was pending.
    #[must_use]
    pub fn cancel(&self, id: ConversationId) -> bool {
        match self.pending.remove(&id) {
            Some((_, reply)) => {
                reply.cancel.notify_one();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task. Returns how many were cancelled.
    #[must_use]
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<ConversationId> = self.pending.iter().map(|e| *e.key()).collect();
        let cancelled = ids.into_iter().filter(|id| self.cancel(*id)).count();
        if cancelled > 0 {
            info!(cancelled, "Cancelled pending replies");
        }
        cancelled
    }

    /// Whether a task is pending for `id`.
    #[must_use]
    pub fn is_pending(&self, id: ConversationId) -> bool {
        self.pending.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn test_task_fires_after_delay() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = ConversationId::new();

        scheduler
            .schedule(id, Duration::from_millis(10), move || {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert!(scheduler.is_pending(id));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_pending(id));
    }

    #[tokio::test]
    async fn test_cancelled_task_never_runs() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = ConversationId::new();

        scheduler
            .schedule(id, Duration::from_millis(30), move || {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_reservation_blocks_until_released() {
        let scheduler = ReplyScheduler::new();
        let id = ConversationId::new();

        let reservation = scheduler.reserve(id).unwrap();
        assert_eq!(reservation.conversation_id(), id);
        assert!(matches!(scheduler.reserve(id), Err(ChatError::ReplyPending(_))));

        scheduler.release(reservation);
        assert!(!scheduler.is_pending(id));
        scheduler.release(scheduler.reserve(id).unwrap());
    }

    #[tokio::test]
    async fn test_cancel_before_arm_wins() {
        let scheduler = ReplyScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = ConversationId::new();

        let reservation = scheduler.reserve(id).unwrap();
        assert!(scheduler.cancel(id));
        scheduler.arm(reservation, Duration::from_millis(10), move || {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_pending(id));
    }

    #[tokio::test]
    async fn test_second_schedule_rejected_while_pending() {
        let scheduler = ReplyScheduler::new();
        let id = ConversationId::new();

        scheduler.schedule(id, Duration::from_secs(5), || {}).unwrap();
        let second = scheduler.schedule(id, Duration::from_secs(5), || {});
        assert!(matches!(second, Err(ChatError::ReplyPending(_))));

        assert_eq!(scheduler.cancel_all(), 1);
        assert!(!scheduler.is_pending(id));
    }
}
