use std::sync::Arc;

use tracing::debug;

use crate::error::SessionError;
use crate::hooks::SessionObserver;
use crate::marker::MarkerSlot;
use crate::queue::FrameQueue;
use crate::state::SessionState;

/// Per-session state touched by both worker loops.
pub(crate) struct Shared {
    pub(crate) state: SessionState,
    pub(crate) marker: MarkerSlot,
    pub(crate) queue: FrameQueue,
    pub(crate) observer: Arc<dyn SessionObserver>,
}

impl Shared {
    pub(crate) fn new(queue_capacity: usize, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            state: SessionState::new(),
            marker: MarkerSlot::new(),
            queue: FrameQueue::new(queue_capacity),
            observer,
        }
    }

    /// Enter the terminal state because the channel is gone.
    ///
    /// The observer hears about it once, however many times this runs.
    pub(crate) fn terminate(&self, err: &SessionError) {
        if self.state.close(err.to_string()) {
            self.observer.on_closed(err);
        }
        self.release();
    }

    /// Enter the terminal state on request of the owner. The observer is not told.
    pub(crate) fn close_locally(&self) {
        if self.state.close("session shut down") {
            debug!("session shut down locally");
        }
        self.release();
    }

    fn release(&self) {
        self.marker.close();
        self.queue.close();
    }
}
