use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use cmlink_frame::{Frame, FrameConfig, FrameWriter};
use tracing::{debug, trace};

use crate::error::{Result, SessionError};
use crate::hooks::Origin;
use crate::shared::Shared;

pub(crate) type BoxWrite = Box<dyn Write + Send>;

const DRAIN_THREAD_NAME: &str = "cmlink-sender";

/// Owner of the channel's write side.
///
/// Frames reach the wire either through the bounded queue and its drain
/// thread ([`enqueue`](Sender::enqueue)) or directly from the caller
/// ([`send_sync`](Sender::send_sync)). Both paths take the same writer lock
/// around encode + write, so frames never interleave on the wire; the two
/// paths are not ordered relative to each other.
pub struct Sender {
    inner: Arc<SenderInner>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

struct SenderInner {
    writer: Mutex<FrameWriter<BoxWrite>>,
    shared: Arc<Shared>,
}

impl SenderInner {
    fn write(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_frame(frame)?;
        trace!(size = frame.wire_size(), "frame sent");
        Ok(())
    }
}

impl Sender {
    pub(crate) fn spawn(writer: BoxWrite, config: FrameConfig, shared: Arc<Shared>) -> Result<Self> {
        let inner = Arc::new(SenderInner {
            writer: Mutex::new(FrameWriter::with_config(writer, config)),
            shared,
        });

        let drain = {
            let inner = Arc::clone(&inner);
            std::thread::Builder::new()
                .name(DRAIN_THREAD_NAME.to_string())
                .spawn(move || drain(&inner))
                .map_err(|source| SessionError::Spawn {
                    name: DRAIN_THREAD_NAME,
                    source,
                })?
        };

        Ok(Self {
            inner,
            drain: Mutex::new(Some(drain)),
        })
    }

    /// Queue a frame for the drain thread.
    ///
    /// Blocks only while the queue is full. Fails with
    /// [`SessionError::Closed`] once the session is closed.
    pub fn enqueue(&self, frame: impl Into<Frame>) -> Result<()> {
        self.inner.shared.queue.push(frame.into())
    }

    /// Write a frame now, bypassing the queue, and flush.
    ///
    /// Returns once the whole frame has been handed to the OS. Failures are
    /// returned and also reported to the observer.
    pub fn send_sync(&self, frame: impl Into<Frame>) -> Result<()> {
        if self.inner.shared.state.is_closed() {
            return Err(SessionError::Closed);
        }
        self.inner.write(&frame.into()).inspect_err(|err| {
            self.inner.shared.observer.on_error(Origin::Sender, err);
        })
    }

    /// Frames waiting in the queue.
    pub fn queued(&self) -> usize {
        self.inner.shared.queue.len()
    }

    /// Wait for the drain thread to write out the queue and exit.
    ///
    /// Only returns once the queue has been closed.
    pub(crate) fn join(&self) {
        let handle = self
            .drain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn drain(inner: &SenderInner) {
    debug!("sender drain loop started");
    while let Some(frame) = inner.shared.queue.pop() {
        if let Err(err) = inner.write(&frame) {
            inner.shared.observer.on_error(Origin::Sender, &err);
        }
    }
    debug!("sender drain loop stopped");
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::thread;

    use bytes::BytesMut;
    use cmlink_frame::{decode_frame, FrameReader};

    use super::*;
    use crate::test_support::{RecordingObserver, SharedSink};

    fn spawn_sender(
        writer: impl Write + Send + 'static,
        config: FrameConfig,
    ) -> (Sender, Arc<Shared>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let shared = Arc::new(Shared::new(32, observer.clone()));
        let sender = Sender::spawn(Box::new(writer), config, Arc::clone(&shared)).unwrap();
        (sender, shared, observer)
    }

    fn finish(sender: &Sender, shared: &Shared) {
        shared.queue.close();
        sender.join();
    }

    fn decode_all(bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut buf = BytesMut::from(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, usize::MAX).unwrap() {
            frames.push(frame.as_ref().to_vec());
        }
        assert!(buf.is_empty(), "trailing partial frame on the wire");
        frames
    }

    #[test]
    fn queued_frames_reach_the_wire_in_order() {
        let (left, right) = UnixStream::pair().unwrap();
        let (sender, shared, _observer) = spawn_sender(left, FrameConfig::default());

        let peer = thread::spawn(move || {
            let mut reader = FrameReader::new(right);
            (0..200)
                .map(|_| reader.read_frame().unwrap().as_ref().to_vec())
                .collect::<Vec<_>>()
        });

        for n in 0..200 {
            sender.enqueue(format!("msg-{n}").into_bytes()).unwrap();
        }

        let received = peer.join().unwrap();
        for (n, payload) in received.iter().enumerate() {
            assert_eq!(payload, format!("msg-{n}").as_bytes());
        }
        finish(&sender, &shared);
    }

    #[test]
    fn oversized_frame_is_reported_and_loop_continues() {
        let sink = SharedSink::default();
        let config = FrameConfig {
            send_limit: 1024,
            ..FrameConfig::default()
        };
        let (sender, shared, observer) = spawn_sender(sink.clone(), config);

        sender.enqueue(vec![0u8; 1021]).unwrap();
        sender.enqueue(&b"next"[..]).unwrap();
        finish(&sender, &shared);

        assert_eq!(decode_all(&sink.bytes()), vec![b"next".to_vec()]);
        let errors = observer.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, Origin::Sender);
        assert!(errors[0].1.contains("frame too large"), "{}", errors[0].1);
    }

    #[test]
    fn write_failure_is_reported_and_loop_continues() {
        let sink = SharedSink::failing(1);
        let (sender, shared, observer) = spawn_sender(sink.clone(), FrameConfig::default());

        sender.enqueue(&b"lost"[..]).unwrap();
        sender.enqueue(&b"kept"[..]).unwrap();
        finish(&sender, &shared);

        assert_eq!(decode_all(&sink.bytes()), vec![b"kept".to_vec()]);
        assert_eq!(observer.errors().len(), 1);
    }

    #[test]
    fn send_sync_rejects_oversize_without_writing() {
        let sink = SharedSink::default();
        let config = FrameConfig {
            send_limit: 1024,
            ..FrameConfig::default()
        };
        let (sender, shared, observer) = spawn_sender(sink.clone(), config);

        let err = sender.send_sync(vec![0u8; 1021]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(cmlink_frame::FrameError::FrameTooLarge {
                size: 1025,
                limit: 1024
            })
        ));
        assert!(sink.bytes().is_empty());
        assert_eq!(observer.errors().len(), 1);
        finish(&sender, &shared);
    }

    #[test]
    fn sync_and_queued_frames_never_interleave() {
        let (left, right) = UnixStream::pair().unwrap();
        let (sender, shared, _observer) = spawn_sender(left, FrameConfig::default());
        let sender = Arc::new(sender);

        const PER_PATH: usize = 50;
        const SIZE: usize = 32 * 1024;

        let peer = thread::spawn(move || {
            let mut reader = FrameReader::new(right);
            (0..PER_PATH * 2)
                .map(|_| reader.read_frame().unwrap())
                .collect::<Vec<_>>()
        });

        let sync_writer = {
            let sender = Arc::clone(&sender);
            thread::spawn(move || {
                for _ in 0..PER_PATH {
                    sender.send_sync(vec![b'S'; SIZE]).unwrap();
                }
            })
        };
        for _ in 0..PER_PATH {
            sender.enqueue(vec![b'Q'; SIZE]).unwrap();
        }
        sync_writer.join().unwrap();

        let frames = peer.join().unwrap();
        let mut sync_count = 0;
        for frame in &frames {
            assert_eq!(frame.len(), SIZE);
            let first = frame.as_ref()[0];
            assert!(frame.as_ref().iter().all(|b| *b == first), "torn frame");
            if first == b'S' {
                sync_count += 1;
            }
        }
        assert_eq!(sync_count, PER_PATH);
        finish(&sender, &shared);
    }

    #[test]
    fn closed_session_refuses_sends() {
        let (sender, shared, _observer) = spawn_sender(SharedSink::default(), FrameConfig::default());
        shared.close_locally();

        assert!(matches!(sender.send_sync(&b"x"[..]), Err(SessionError::Closed)));
        assert!(matches!(sender.enqueue(&b"x"[..]), Err(SessionError::Closed)));
        sender.join();
    }
}
