use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Filesystem-path Unix domain socket.
///
/// Clients only ever call [`UnixDomainSocket::connect`]. The listening side
/// exists for the CLI echo peer and for tests standing in for the daemon.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixDomainSocket {
    /// Permission mode applied to bound socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 elsewhere.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Connect to the daemon's control socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();
        check_path_len(path, Self::MAX_PATH_LEN)?;

        debug!(?path, "connecting to control socket");
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        let stream = IpcStream::from(stream);

        match stream.peer_credentials() {
            Some(creds) => info!(
                ?path,
                peer_uid = creds.uid,
                peer_pid = creds.pid,
                "connected to control socket"
            ),
            None => info!(?path, "connected to control socket"),
        }
        Ok(stream)
    }

    /// Bind and listen on `path`, replacing a stale socket file if present.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path, Self::MAX_PATH_LEN)?;

        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(bind_err)?;

        info!(?path, "listening on unix domain socket");
        Ok(Self { listener, path })
    }

    /// Accept one incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(stream.into())
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let is_socket = std::fs::symlink_metadata(&self.path)
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false);
        if is_socket {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn check_path_len(path: &Path, max: usize) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= max {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cmlink-uds-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("accept");
        let sock_path = dir.join("control.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let client = std::thread::spawn(move || {
            let mut stream = UnixDomainSocket::connect(&path_clone).unwrap();
            stream.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        client.join().unwrap();

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_socket_is_setup_error() {
        let dir = temp_dir("missing");
        let err = UnixDomainSocket::connect(dir.join("absent.sock")).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(
            err.io_source().map(std::io::Error::kind),
            Some(std::io::ErrorKind::NotFound)
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long_is_rejected() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        assert!(matches!(
            UnixDomainSocket::connect(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
        assert!(matches!(
            UnixDomainSocket::bind(&long_path),
            Err(TransportError::PathTooLong { .. })
        ));
    }

    #[test]
    fn bind_hardens_permissions() {
        let dir = temp_dir("perms");
        let sock_path = dir.join("perm.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_refuses_to_replace_regular_file() {
        let dir = temp_dir("regular");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
