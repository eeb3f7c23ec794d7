//! Fakes shared by the unit tests of this crate.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;
use crate::hooks::{Origin, SessionObserver};

/// Observer that remembers everything it was told.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) errors: Mutex<Vec<(Origin, String)>>,
    pub(crate) closed: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub(crate) fn errors(&self) -> Vec<(Origin, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub(crate) fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_error(&self, origin: Origin, err: &SessionError) {
        self.errors.lock().unwrap().push((origin, err.to_string()));
    }

    fn on_closed(&self, err: &SessionError) {
        self.closed.lock().unwrap().push(err.to_string());
    }
}

/// In-memory sink whose first `failures` writes fail with `ErrorKind::Other`.
#[derive(Clone, Default)]
pub(crate) struct SharedSink {
    pub(crate) data: Arc<Mutex<Vec<u8>>>,
    pub(crate) failures: Arc<Mutex<usize>>,
}

impl SharedSink {
    pub(crate) fn failing(failures: usize) -> Self {
        Self {
            data: Arc::default(),
            failures: Arc::new(Mutex::new(failures)),
        }
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(std::io::Error::other("injected write failure"));
        }
        self.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
