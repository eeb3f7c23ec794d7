use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Open/closed flag shared by the session, its workers and its owner.
///
/// The transition to closed happens at most once and is permanent.
#[derive(Debug, Default)]
pub struct SessionState {
    reason: Mutex<Option<String>>,
    changed: Condvar,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session closed. Returns false if it was already closed.
    pub fn close(&self, reason: impl Into<String>) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason.into());
        drop(slot);
        self.changed.notify_all();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_some()
    }

    /// Why the session closed, if it has.
    pub fn close_reason(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Block until the session closes and return the reason.
    pub fn wait_closed(&self) -> String {
        let mut slot = self.lock();
        loop {
            if let Some(reason) = slot.as_ref() {
                return reason.clone();
            }
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_closed`](SessionState::wait_closed), giving up after `timeout`.
    pub fn wait_closed_timeout(&self, timeout: Duration) -> Option<String> {
        let slot = self.lock();
        let (slot, _) = self
            .changed
            .wait_timeout_while(slot, timeout, |reason| reason.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn closes_once() {
        let state = SessionState::new();
        assert!(!state.is_closed());
        assert!(state.close("end of stream"));
        assert!(!state.close("again"));
        assert_eq!(state.close_reason().as_deref(), Some("end of stream"));
    }

    #[test]
    fn wait_closed_wakes_on_close() {
        let state = Arc::new(SessionState::new());
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_closed())
        };
        thread::sleep(Duration::from_millis(50));
        state.close("peer went away");
        assert_eq!(waiter.join().unwrap(), "peer went away");
    }

    #[test]
    fn wait_closed_timeout_expires_while_open() {
        let state = SessionState::new();
        assert!(state.wait_closed_timeout(Duration::from_millis(20)).is_none());
    }
}
