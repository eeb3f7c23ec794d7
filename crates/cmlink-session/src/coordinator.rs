use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cmlink_frame::Frame;
use tracing::debug;

use crate::error::Result;
use crate::receiver::Receiver;
use crate::sender::Sender;

/// Serializes synchronous request/response exchanges.
///
/// Correlation is positional: the response to a request is the first frame
/// received after the marker was armed for it. That only holds while the
/// peer answers in order and sends nothing unsolicited in between, which is
/// why at most one exchange may be in flight.
#[derive(Debug, Default)]
pub struct Coordinator {
    exchange: Mutex<()>,
    response_timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(response_timeout: Option<Duration>) -> Self {
        Self {
            exchange: Mutex::new(()),
            response_timeout,
        }
    }

    /// Arm, send synchronously, await the correlated frame.
    ///
    /// Concurrent callers queue up on the exchange lock; queued async frames
    /// keep flowing meanwhile. A failed send is returned straight away.
    pub fn exchange(&self, sender: &Sender, receiver: &Receiver, request: Frame) -> Result<Frame> {
        let _guard = self
            .exchange
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let request_size = request.len();
        receiver.arm();
        sender.send_sync(request)?;

        let response = match self.response_timeout {
            Some(timeout) => receiver.await_correlated_timeout(timeout)?,
            None => receiver.await_correlated()?,
        };
        debug!(
            request_size,
            response_size = response.len(),
            "exchange complete"
        );
        Ok(response)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }
}
