//! Descriptor flag handling on Unix: the full `fcntl` flag word is saved and
//! restored around the non-blocking connect.

use std::io;
use std::os::fd::AsRawFd;

use socket2::Socket;

pub(crate) type Flags = libc::c_int;

pub(crate) fn get_flags(socket: &Socket) -> io::Result<Flags> {
    // SAFETY: the descriptor is owned by `socket` and stays open for the call.
    let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags)
}

pub(crate) fn set_flags(socket: &Socket, flags: Flags) -> io::Result<()> {
    // SAFETY: same as above, F_SETFL only reads the integer argument.
    if unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_SETFL, flags) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn with_nonblocking(flags: Flags) -> Flags {
    flags | libc::O_NONBLOCK
}

pub(crate) fn connect_in_progress(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINPROGRESS) || err.kind() == io::ErrorKind::WouldBlock
}
