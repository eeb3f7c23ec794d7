use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cmlink_frame::Frame;
use tracing::{debug, trace};

use crate::error::{Result, SessionError};

/// Single-slot capture of "the first frame received after arming".
///
/// The receiver thread [`offer`](MarkerSlot::offer)s every decoded frame;
/// only an armed, still-empty slot keeps it. A caller [`arm`](MarkerSlot::arm)s
/// the slot before transmitting a request and then [`wait`](MarkerSlot::wait)s
/// for the captured frame. The frame stays in the slot until the next arm.
///
/// A [`wait_timeout`](MarkerSlot::wait_timeout) that gives up on an armed
/// slot leaves one response owed by the peer. The next frame offered is
/// taken to be that response and dropped, so it cannot be captured for a
/// later request.
#[derive(Debug, Default)]
pub struct MarkerSlot {
    state: Mutex<SlotState>,
    filled: Condvar,
}

#[derive(Debug, Default)]
struct SlotState {
    marker: Marker,
    stale: usize,
    closed: bool,
}

#[derive(Debug, Default)]
enum Marker {
    #[default]
    Unarmed,
    Armed,
    Filled(Frame),
}

impl MarkerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, discarding any previously captured frame.
    pub fn arm(&self) {
        let mut state = self.lock();
        if matches!(state.marker, Marker::Filled(_)) {
            trace!("discarding previous marker frame");
        }
        state.marker = Marker::Armed;
    }

    /// Offer a freshly received frame. Returns true if the slot captured it.
    pub fn offer(&self, frame: &Frame) -> bool {
        let mut state = self.lock();
        if state.stale > 0 {
            state.stale -= 1;
            debug!(
                size = frame.len(),
                still_owed = state.stale,
                "dropping late response to an abandoned wait"
            );
            return false;
        }
        if !matches!(state.marker, Marker::Armed) {
            return false;
        }
        state.marker = Marker::Filled(frame.clone());
        drop(state);
        self.filled.notify_all();
        true
    }

    /// Block until a frame is captured and return it.
    ///
    /// The slot keeps the frame, so waiting again returns it again until
    /// the next [`arm`](MarkerSlot::arm). Waiting on an unarmed slot blocks
    /// until a later arm is filled. Fails with [`SessionError::Closed`] once
    /// the slot is closed and holds nothing.
    pub fn wait(&self) -> Result<Frame> {
        let mut state = self.lock();
        loop {
            if let Marker::Filled(frame) = &state.marker {
                return Ok(frame.clone());
            }
            if state.closed {
                return Err(SessionError::Closed);
            }
            state = self
                .filled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// [`wait`](MarkerSlot::wait) with a deadline.
    ///
    /// On timeout an armed slot is disarmed and its response counted as
    /// owed; the next frame offered is dropped instead of captured.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Frame> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Marker::Filled(frame) = &state.marker {
                return Ok(frame.clone());
            }
            if state.closed {
                return Err(SessionError::Closed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                if matches!(state.marker, Marker::Armed) {
                    state.marker = Marker::Unarmed;
                    state.stale += 1;
                    debug!(owed = state.stale, "gave up waiting for marker frame");
                }
                return Err(SessionError::ResponseTimeout(timeout));
            }
            state = self
                .filled
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Give up on future frames; wakes every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.filled.notify_all();
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.lock().marker, Marker::Armed)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.lock().marker, Marker::Filled(_))
    }

    /// Responses still owed by the peer for waits that timed out.
    pub fn owed(&self) -> usize {
        self.lock().stale
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn frame(payload: &'static [u8]) -> Frame {
        Frame::from(payload)
    }

    #[test]
    fn unarmed_slot_ignores_frames() {
        let slot = MarkerSlot::new();
        assert!(!slot.offer(&frame(b"unsolicited")));
        assert!(!slot.is_filled());
    }

    #[test]
    fn first_frame_after_arm_wins() {
        let slot = MarkerSlot::new();
        slot.arm();

        assert!(slot.offer(&frame(b"first")));
        assert!(!slot.offer(&frame(b"second")));
        assert_eq!(slot.wait().unwrap(), frame(b"first"));
        assert!(slot.is_filled());
        assert_eq!(
            slot.wait_timeout(Duration::from_millis(20)).unwrap(),
            frame(b"first")
        );

        slot.arm();
        assert!(slot.is_armed());
    }

    #[test]
    fn rearm_discards_stale_frame() {
        let slot = Arc::new(MarkerSlot::new());
        slot.arm();
        slot.offer(&frame(b"stale"));

        slot.arm();
        assert!(slot.is_armed());

        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.wait())
        };
        thread::sleep(Duration::from_millis(50));
        slot.offer(&frame(b"fresh"));

        assert_eq!(waiter.join().unwrap().unwrap(), frame(b"fresh"));
    }

    #[test]
    fn wait_blocks_until_frame_arrives() {
        let slot = Arc::new(MarkerSlot::new());
        slot.arm();

        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.wait())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        slot.offer(&frame(b"reply"));
        assert_eq!(waiter.join().unwrap().unwrap(), frame(b"reply"));
    }

    #[test]
    fn timed_out_wait_drops_the_late_response() {
        let slot = MarkerSlot::new();
        slot.arm();

        let err = slot.wait_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, SessionError::ResponseTimeout(_)));
        assert!(!slot.is_armed());
        assert_eq!(slot.owed(), 1);

        // The next exchange arms before the late answer shows up.
        slot.arm();
        assert!(!slot.offer(&frame(b"answer to the first request")));
        assert!(slot.is_armed());
        assert_eq!(slot.owed(), 0);

        assert!(slot.offer(&frame(b"answer to the second request")));
        assert_eq!(slot.wait().unwrap(), frame(b"answer to the second request"));
    }

    #[test]
    fn late_response_between_exchanges_is_dropped() {
        let slot = MarkerSlot::new();
        slot.arm();
        assert!(slot.wait_timeout(Duration::from_millis(20)).is_err());

        assert!(!slot.offer(&frame(b"late")));
        assert_eq!(slot.owed(), 0);

        slot.arm();
        assert!(slot.offer(&frame(b"fresh")));
        assert_eq!(slot.wait().unwrap(), frame(b"fresh"));
    }

    #[test]
    fn timeout_on_unarmed_slot_owes_nothing() {
        let slot = MarkerSlot::new();
        assert!(matches!(
            slot.wait_timeout(Duration::from_millis(20)),
            Err(SessionError::ResponseTimeout(_))
        ));
        assert_eq!(slot.owed(), 0);
    }

    #[test]
    fn close_wakes_waiter_without_frame() {
        let slot = Arc::new(MarkerSlot::new());
        slot.arm();

        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.wait())
        };
        thread::sleep(Duration::from_millis(50));
        slot.close();

        assert!(matches!(
            waiter.join().unwrap(),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn captured_frame_survives_close() {
        let slot = MarkerSlot::new();
        slot.arm();
        slot.offer(&frame(b"last words"));
        slot.close();

        assert_eq!(slot.wait().unwrap(), frame(b"last words"));
        assert_eq!(slot.wait().unwrap(), frame(b"last words"));
    }
}
