use cmlink_session::SessionError;

/// Errors returned by [`Communicator`](crate::Communicator) operations.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The underlying session failed or is closed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A payload could not be encoded, or the daemon sent something unparseable.
    #[error("invalid control payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The container key was rejected.
    #[error("wrong container password")]
    WrongPassword,

    /// Too many wrong keys; the token refuses further attempts until reboot.
    #[error("too many wrong password attempts; token locked until next reboot")]
    LockedTillReboot,

    /// The daemon could not lock or unlock the smartcard token.
    #[error("smartcard lock or unlock operation failed")]
    Smartcard,

    #[error("daemon response carried no container status")]
    MissingStatus,

    #[error("daemon response carried no container config")]
    MissingConfig,
}

impl ControlError {
    /// True for rejections caused by the supplied credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::WrongPassword | Self::LockedTillReboot)
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
