use std::io;
use thiserror::Error;

/// Every way an [`Endpoint`](crate::Endpoint) operation can fail.
///
/// Variants produced by an OS call keep the originating [`io::Error`] as their
/// source, so the OS error code is available through
/// [`EndpointError::raw_os_error`] without any shared "last error" state.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The transport is unset, or does not support the requested operation.
    #[error("unsupported transport for this operation")]
    UnsupportedTransport,

    /// `finalize` was called without a role.
    #[error("no socket role specified")]
    NoRoleSpecified,

    /// The textual IPv4 address could not be converted.
    #[error("invalid IPv4 address: {0:?}")]
    AddressConversionFailure(String),

    /// The endpoint role does not match the operation.
    #[error("operation not valid for this socket role")]
    WrongSocketType,

    /// The operation is not valid in the endpoint's current lifecycle state.
    #[error("invalid endpoint state: {0}")]
    InvalidState(&'static str),

    /// The OS refused to allocate a socket.
    #[error("failed to create socket")]
    CreateFailure(#[source] io::Error),

    /// Binding to the local port failed.
    #[error("failed to bind socket")]
    BindFailure(#[source] io::Error),

    /// Marking the socket as listening failed.
    #[error("failed to listen on socket")]
    ListenFailure(#[source] io::Error),

    /// Waiting for an inbound connection failed.
    #[error("failed to accept connection")]
    AcceptFailure(#[source] io::Error),

    /// Reading a socket option or address failed.
    #[error("failed to get socket option")]
    GetOptionFailure(#[source] io::Error),

    /// Applying a socket option failed.
    #[error("failed to set socket option")]
    SetOptionFailure(#[source] io::Error),

    /// Reading the descriptor flags failed.
    #[error("failed to get descriptor flags")]
    GetFlagsFailure(#[source] io::Error),

    /// Changing or restoring the descriptor flags failed.
    #[error("failed to set descriptor flags")]
    SetFlagsFailure(#[source] io::Error),

    /// The connection did not complete within the timeout.
    #[error("connection timed out")]
    ConnectionTimeout,

    /// The connect call or the readiness wait failed.
    #[error("connection failed")]
    ConnectionFailure(#[source] io::Error),

    /// The peer actively refused the connection.
    #[error("connection refused")]
    ConnectionRefused,

    /// No route to the peer.
    #[error("host unreachable")]
    HostUnreachable,

    /// The pending socket error was not one of the classified codes.
    #[error("unknown socket error (code {0})")]
    Unknown(i32),

    /// The receive primitive failed.
    #[error("read error")]
    ReadError(#[source] io::Error),

    /// The send primitive failed.
    #[error("write error")]
    WriteError(#[source] io::Error),

    /// No data arrived before the configured receive timeout.
    #[error("receive timed out")]
    ReceiveTimeout,
}

/// Result type alias for endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;

impl EndpointError {
    /// The OS error code behind this failure, when there is one.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::CreateFailure(e)
            | Self::BindFailure(e)
            | Self::ListenFailure(e)
            | Self::AcceptFailure(e)
            | Self::GetOptionFailure(e)
            | Self::SetOptionFailure(e)
            | Self::GetFlagsFailure(e)
            | Self::SetFlagsFailure(e)
            | Self::ConnectionFailure(e)
            | Self::ReadError(e)
            | Self::WriteError(e) => e.raw_os_error(),
            Self::Unknown(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the failure comes from caller misuse rather than the environment.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTransport | Self::WrongSocketType | Self::InvalidState(_)
        )
    }

    /// Whether a wait ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout | Self::ReceiveTimeout)
    }

    /// Classifies a failed receive: "nothing arrived yet" versus a broken socket.
    pub(crate) fn from_recv(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::ReceiveTimeout,
            _ => Self::ReadError(err),
        }
    }

    /// Classifies the pending error read back after a connect wait.
    pub(crate) fn from_pending(err: io::Error) -> Self {
        Self::classify_connect(err, |err| match err.raw_os_error() {
            Some(code) => Self::Unknown(code),
            None => Self::ConnectionFailure(err),
        })
    }

    /// Classifies a connect call that failed without entering the wait.
    pub(crate) fn from_rejected(err: io::Error) -> Self {
        Self::classify_connect(err, Self::ConnectionFailure)
    }

    fn classify_connect(err: io::Error, otherwise: impl FnOnce(io::Error) -> Self) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::HostUnreachable => Self::HostUnreachable,
            _ => otherwise(err),
        }
    }
}
