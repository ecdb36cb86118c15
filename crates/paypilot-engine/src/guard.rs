//! Outbound guard: per-chat in-flight send counter.
//!
//! The messaging channel reports the engine's own outbound messages back as
//! inbound events. While a chat's counter is above zero, inbound events for
//! that chat are treated as echoes and dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use paypilot_core::ChatKey;
use tracing::trace;

#[derive(Debug, Default)]
pub struct OutboundGuard {
    in_flight: Mutex<HashMap<ChatKey, usize>>,
}

impl OutboundGuard {
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds plain counters, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<ChatKey, usize>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark one more send as in flight for `chat`.
    pub fn acquire(&self, chat: &ChatKey) {
        let mut map = self.lock();
        *map.entry(chat.clone()).or_insert(0) += 1;
    }

    /// Undo one [`acquire`](Self::acquire). Entries that reach zero are removed.
    pub fn release(&self, chat: &ChatKey) {
        let mut map = self.lock();
        if let Some(count) = map.get_mut(chat) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                map.remove(chat);
            }
        }
    }

    pub fn in_flight(&self, chat: &ChatKey) -> usize {
        self.lock().get(chat).copied().unwrap_or(0)
    }

    pub fn is_guarded(&self, chat: &ChatKey) -> bool {
        self.in_flight(chat) > 0
    }

    /// Number of chats with a non-zero counter.
    pub fn tracked_chats(&self) -> usize {
        self.lock().len()
    }

    /// Acquire the guard for `chat`; the returned ticket releases it `grace`
    /// after being dropped.
    pub fn ticket(self: &Arc<Self>, chat: &ChatKey, grace: Duration) -> GuardTicket {
        self.acquire(chat);
        GuardTicket {
            guard: Arc::clone(self),
            chat: chat.clone(),
            grace,
        }
    }
}

/// Holds one unit of a chat's in-flight counter.
///
/// Dropping the ticket schedules the decrement after the grace delay, so the
/// counter is restored on success, failure and cancellation alike.
#[derive(Debug)]
pub struct GuardTicket {
    guard: Arc<OutboundGuard>,
    chat: ChatKey,
    grace: Duration,
}

impl Drop for GuardTicket {
    fn drop(&mut self) {
        let guard = Arc::clone(&self.guard);
        let chat = self.chat.clone();
        let grace = self.grace;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !grace.is_zero() => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    guard.release(&chat);
                    trace!(chat = %chat, "Outbound guard released");
                });
            }
            _ => guard.release(&chat),
        }
    }
}
