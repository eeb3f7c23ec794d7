use std::io::{Read, Write};
use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use cmlink_frame::{Frame, FrameConfig, FrameReader, DEFAULT_MAX_PAYLOAD, DEFAULT_SEND_LIMIT};
use cmlink_transport::IpcStream;
use tracing::debug;

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::hooks::{LoggingObserver, MessageHandler, NoopHandler, SessionObserver};
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::receiver::Receiver;
use crate::sender::{BoxWrite, Sender};
use crate::shared::Shared;

/// Session behavior configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest outbound frame, prefix included. Default: 1 MiB.
    pub send_limit: usize,
    /// Largest inbound payload. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Outbound queue depth. Default: 32.
    pub queue_capacity: usize,
    /// Deadline for correlated responses. Default: none (wait forever).
    pub response_timeout: Option<Duration>,
    /// Socket write timeout for sessions built from an [`IpcStream`].
    pub write_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_limit: DEFAULT_SEND_LIMIT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            response_timeout: None,
            write_timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            send_limit: self.send_limit,
            read_timeout: None,
            write_timeout: self.write_timeout,
        }
    }
}

/// One live control channel: sender, receiver and coordinator.
///
/// Dropping the session closes it without waiting for queued frames; call
/// [`shutdown`](Session::shutdown) to flush them first.
pub struct Session {
    shared: Arc<Shared>,
    sender: Sender,
    receiver: Receiver,
    coordinator: Coordinator,
    /// Handle used to tear the socket down, when we have one.
    control: Option<IpcStream>,
}

impl Session {
    /// Start a session over an already-open read half and write half.
    pub fn start<R, W>(
        reader: R,
        writer: W,
        config: SessionConfig,
        handler: Arc<dyn MessageHandler>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let reader = FrameReader::with_config(reader, config.frame_config());
        Self::start_inner(reader, Box::new(writer), config, handler, observer, None)
    }

    /// Start a session over a connected stream with the no-op handler and
    /// the logging observer.
    pub fn from_stream(stream: IpcStream, config: SessionConfig) -> Result<Self> {
        Self::from_stream_with(
            stream,
            config,
            Arc::new(NoopHandler),
            Arc::new(LoggingObserver),
        )
    }

    /// Start a session over a connected stream with explicit collaborators.
    pub fn from_stream_with(
        stream: IpcStream,
        config: SessionConfig,
        handler: Arc<dyn MessageHandler>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self> {
        let reader = FrameReader::with_config_ipc(stream.try_clone()?, config.frame_config())?;
        stream.set_write_timeout(config.write_timeout)?;
        let control = stream.try_clone()?;
        Self::start_inner(
            reader,
            Box::new(stream),
            config,
            handler,
            observer,
            Some(control),
        )
    }

    fn start_inner<R>(
        reader: FrameReader<R>,
        writer: BoxWrite,
        config: SessionConfig,
        handler: Arc<dyn MessageHandler>,
        observer: Arc<dyn SessionObserver>,
        control: Option<IpcStream>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared::new(config.queue_capacity, observer));
        let sender = Sender::spawn(writer, config.frame_config(), Arc::clone(&shared))?;
        let receiver = match Receiver::spawn(reader, Arc::clone(&shared), handler) {
            Ok(receiver) => receiver,
            Err(err) => {
                shared.close_locally();
                sender.join();
                return Err(err);
            }
        };

        debug!(
            send_limit = config.send_limit,
            queue_capacity = config.queue_capacity,
            response_timeout = ?config.response_timeout,
            "session started"
        );

        Ok(Self {
            shared,
            sender,
            receiver,
            coordinator: Coordinator::new(config.response_timeout),
            control,
        })
    }

    /// Fire-and-forget: queue a frame for the drain thread.
    pub fn post(&self, payload: impl Into<Frame>) -> Result<()> {
        self.sender.enqueue(payload)
    }

    /// Write a frame immediately, bypassing the queue.
    pub fn send_sync(&self, payload: impl Into<Frame>) -> Result<()> {
        self.sender.send_sync(payload)
    }

    /// Send a request and block for its correlated response.
    pub fn request(&self, payload: impl Into<Frame>) -> Result<Frame> {
        self.coordinator
            .exchange(&self.sender, &self.receiver, payload.into())
    }

    /// Arm the marker by hand; pair with [`send_sync`](Session::send_sync)
    /// and [`await_correlated`](Session::await_correlated).
    pub fn arm(&self) {
        self.receiver.arm();
    }

    pub fn await_correlated(&self) -> Result<Frame> {
        self.receiver.await_correlated()
    }

    pub fn await_correlated_timeout(&self, timeout: Duration) -> Result<Frame> {
        self.receiver.await_correlated_timeout(timeout)
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// True once the peer closed the channel or the session was shut down.
    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }

    pub fn close_reason(&self) -> Option<String> {
        self.shared.state.close_reason()
    }

    /// Block until the session reaches its terminal state.
    pub fn wait_closed(&self) -> String {
        self.shared.state.wait_closed()
    }

    pub fn wait_closed_timeout(&self, timeout: Duration) -> Option<String> {
        self.shared.state.wait_closed_timeout(timeout)
    }

    /// Stop accepting work, write out queued frames, then close the socket.
    pub fn shutdown(&self) {
        self.shared.close_locally();
        self.sender.join();
        if let Some(stream) = &self.control {
            let _ = stream.shutdown(Shutdown::Both);
            self.receiver.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.close_locally();
        if let Some(stream) = &self.control {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
