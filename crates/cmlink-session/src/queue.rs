use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use cmlink_frame::Frame;

use crate::error::{Result, SessionError};

/// Outbound queue depth used unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Bounded FIFO of frames awaiting the drain loop.
///
/// `push` blocks while the queue is full and `pop` blocks while it is empty.
/// Closing wakes everyone: producers fail with [`SessionError::Closed`],
/// the consumer drains what is left and then sees `None`.
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<Frame>,
    closed: bool,
}

impl FrameQueue {
    /// A queue holding at most `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Append a frame, waiting for room if the queue is full.
    pub fn push(&self, frame: Frame) -> Result<()> {
        let mut state = self.lock();
        while !state.closed && state.items.len() >= self.capacity {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return Err(SessionError::Closed);
        }
        state.items.push_back(frame);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the head frame, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<Frame> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop accepting frames. Already queued frames stay poppable.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn frame(n: usize) -> Frame {
        Frame::new(format!("frame-{n}").into_bytes())
    }

    #[test]
    fn pops_in_push_order() {
        let queue = FrameQueue::new(8);
        for n in 0..8 {
            queue.push(frame(n)).unwrap();
        }
        for n in 0..8 {
            assert_eq!(queue.pop().unwrap(), frame(n));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_blocks_producer_until_one_is_drained() {
        let queue = Arc::new(FrameQueue::default());
        for n in 0..DEFAULT_QUEUE_CAPACITY {
            queue.push(frame(n)).unwrap();
        }
        assert_eq!(queue.len(), 32);

        let pushed = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = Arc::clone(&queue);
            let pushed = Arc::clone(&pushed);
            thread::spawn(move || {
                queue.push(frame(32)).unwrap();
                pushed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!pushed.load(Ordering::SeqCst), "33rd push should block");
        assert_eq!(queue.len(), 32);

        assert_eq!(queue.pop().unwrap(), frame(0));
        producer.join().unwrap();
        assert!(pushed.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 32);
    }

    #[test]
    fn empty_queue_blocks_consumer() {
        let queue = Arc::new(FrameQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(50));
        queue.push(frame(7)).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(frame(7)));
    }

    #[test]
    fn close_drains_then_ends() {
        let queue = FrameQueue::new(4);
        queue.push(frame(1)).unwrap();
        queue.close();

        assert!(matches!(queue.push(frame(2)), Err(SessionError::Closed)));
        assert_eq!(queue.pop(), Some(frame(1)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn close_wakes_blocked_producer() {
        let queue = Arc::new(FrameQueue::new(1));
        queue.push(frame(0)).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(frame(1)))
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert!(matches!(
            producer.join().unwrap(),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(FrameQueue::new(0).capacity(), 1);
    }
}
