use std::path::Path;
use std::sync::Arc;

use cmlink_transport::UnixDomainSocket;

use crate::error::Result;
use crate::hooks::{LoggingObserver, MessageHandler, NoopHandler, SessionObserver};
use crate::session::{Session, SessionConfig};

/// Connect to the daemon socket and start a session with default settings.
pub fn connect(path: impl AsRef<Path>) -> Result<Session> {
    connect_with_config(path, SessionConfig::default())
}

/// Connect with explicit session configuration.
pub fn connect_with_config(path: impl AsRef<Path>, config: SessionConfig) -> Result<Session> {
    connect_with(
        path,
        config,
        Arc::new(NoopHandler),
        Arc::new(LoggingObserver),
    )
}

/// Connect with explicit configuration, message handler and observer.
pub fn connect_with(
    path: impl AsRef<Path>,
    config: SessionConfig,
    handler: Arc<dyn MessageHandler>,
    observer: Arc<dyn SessionObserver>,
) -> Result<Session> {
    let stream = UnixDomainSocket::connect(path)?;
    Session::from_stream_with(stream, config, handler, observer)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use cmlink_frame::{FrameReader, FrameWriter};
    use cmlink_transport::TransportError;

    use super::*;
    use crate::error::SessionError;

    fn temp_socket_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("cmlink-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn connect_round_trip() {
        let path = temp_socket_path("connect.sock");
        let listener = UnixDomainSocket::bind(&path).unwrap();

        let daemon = thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut writer = FrameWriter::new(stream.try_clone().unwrap());
            let mut reader = FrameReader::new(stream);
            let request = reader.read_frame().unwrap();
            writer.send(&[request.as_ref(), b"-ack"].concat()).unwrap();
            // Keep the listener (and its socket file) alive until answered.
            drop(listener);
        });

        let session = connect(&path).unwrap();
        let response = session.request(&b"hello"[..]).unwrap();
        assert_eq!(response.as_ref(), b"hello-ack");

        daemon.join().unwrap();
        session.shutdown();
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let path = temp_socket_path("missing.sock");
        let err = match connect(&path) {
            Err(err) => err,
            Ok(_) => panic!("connect should fail without a listener"),
        };
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Connect { .. })
        ));
    }
}
