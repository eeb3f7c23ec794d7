use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use cmlink_frame::{Frame, FrameReader};
use tracing::{debug, trace};

use crate::error::{Result, SessionError};
use crate::hooks::{MessageHandler, Origin};
use crate::shared::Shared;

const READ_THREAD_NAME: &str = "cmlink-receiver";

/// Owner of the channel's read side.
///
/// A dedicated thread decodes frames in arrival order, offers each one to
/// the marker slot and then hands it to the message handler.
pub struct Receiver {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Receiver {
    pub(crate) fn spawn<R>(
        reader: FrameReader<R>,
        shared: Arc<Shared>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let handle = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(READ_THREAD_NAME.to_string())
                .spawn(move || read_loop(reader, &shared, handler.as_ref()))
                .map_err(|source| SessionError::Spawn {
                    name: READ_THREAD_NAME,
                    source,
                })?
        };

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Start capturing: the next frame received becomes the correlated one.
    ///
    /// Call this before transmitting the request, never after.
    pub fn arm(&self) {
        self.shared.marker.arm();
    }

    /// Block until the frame captured since the last [`arm`](Receiver::arm)
    /// is available. It stays available until the next arm.
    pub fn await_correlated(&self) -> Result<Frame> {
        self.shared.marker.wait()
    }

    /// [`await_correlated`](Receiver::await_correlated) with a deadline.
    ///
    /// After a timeout the next frame received is treated as the late
    /// response and is not captured.
    pub fn await_correlated_timeout(&self, timeout: Duration) -> Result<Frame> {
        self.shared.marker.wait_timeout(timeout)
    }

    /// Wait for the read loop to finish, which happens at end of stream.
    pub(crate) fn join(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn read_loop<R: Read>(mut reader: FrameReader<R>, shared: &Shared, handler: &dyn MessageHandler) {
    debug!("receiver read loop started");
    loop {
        match reader.read_frame() {
            Ok(frame) => {
                let captured = shared.marker.offer(&frame);
                trace!(size = frame.len(), captured, "frame received");
                if let Err(err) = handler.handle(&frame) {
                    shared
                        .observer
                        .on_error(Origin::Receiver, &SessionError::Handler(err));
                }
            }
            Err(err) if err.is_end_of_stream() => {
                shared.terminate(&err.into());
                break;
            }
            Err(err) => shared.observer.on_error(Origin::Receiver, &err.into()),
        }
    }
    debug!("receiver read loop stopped");
}
