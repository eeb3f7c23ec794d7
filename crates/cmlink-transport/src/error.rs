use std::path::PathBuf;

/// Errors raised while establishing or inspecting a channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind a listening socket (test peers and the echo daemon).
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the daemon socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the stream itself.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path does not fit `sockaddr_un`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// The underlying I/O error, when there is one.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Bind { source, .. } | Self::Connect { source, .. } => Some(source),
            Self::Accept(source) | Self::Io(source) => Some(source),
            Self::PathTooLong { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
