//! Descriptor flag handling on Windows. Winsock cannot report the blocking
//! mode of a socket, so the saved state is the default: blocking.

use std::io;

use socket2::Socket;

/// `true` when the socket is in non-blocking mode.
pub(crate) type Flags = bool;

pub(crate) fn get_flags(_socket: &Socket) -> io::Result<Flags> {
    Ok(false)
}

pub(crate) fn set_flags(socket: &Socket, flags: Flags) -> io::Result<()> {
    socket.set_nonblocking(flags)
}

pub(crate) fn with_nonblocking(_flags: Flags) -> Flags {
    true
}

pub(crate) fn connect_in_progress(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}
