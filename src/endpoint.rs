use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};

use crate::error::{EndpointError, Result};
use crate::options::EndpointOptions;
use crate::{ipv4, sys};

/// A listening endpoint holds at most one pending connection.
const LISTEN_BACKLOG: i32 = 1;
const CONNECT_KEY: usize = 0;

/// The transport an [`Endpoint`] is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// No socket has been created yet.
    #[default]
    Unset,
    /// Stream socket.
    Tcp,
    /// Datagram socket.
    Udp,
}

/// The side an [`Endpoint`] plays once finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Not finalized.
    #[default]
    Unset,
    /// Bound to a local port; Tcp servers also listen.
    Server,
    /// Targets a remote address.
    Client,
}

/// Lifecycle position of an [`Endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Constructed, no descriptor.
    #[default]
    Empty,
    /// Descriptor allocated by `create`.
    Created,
    /// Role, port and (for clients) target configured.
    Finalized,
    /// A Tcp client whose connect succeeded.
    Connected,
    /// A Tcp client whose connect attempt failed or timed out. Terminal.
    Failed,
}

/// The descriptor owned by an endpoint. Its variant is the transport.
#[derive(Debug)]
enum Handle {
    Stream(Socket),
    Datagram(UdpSocket),
}

impl Handle {
    fn transport(&self) -> Transport {
        match self {
            Handle::Stream(_) => Transport::Tcp,
            Handle::Datagram(_) => Transport::Udp,
        }
    }

    /// Borrowed view for option, bind and shutdown calls shared by both transports.
    fn sock(&self) -> SockRef<'_> {
        match self {
            Handle::Stream(socket) => SockRef::from(socket),
            Handle::Datagram(socket) => SockRef::from(socket),
        }
    }
}

/// A single TCP or UDP socket, used either as a server or as a client.
///
/// An `Endpoint` goes through a fixed lifecycle: it is constructed empty,
/// [`create`](Endpoint::create)d for one transport, [`finalize`](Endpoint::finalize)d
/// for one role, and then used for I/O until it is dropped. Every operation checks
/// that the transport and role match its shape before touching the OS, and
/// reports a typed [`EndpointError`] otherwise.
///
/// There is no internal locking or background work: all calls block the calling
/// thread. Running a server `accept` and a client `connect` at the same time is
/// done by calling them from separate threads.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use xsocket::{Endpoint, Role, Transport};
///
/// let mut client = Endpoint::new(true);
/// client.create(Transport::Tcp)?;
/// client.set_no_delay(true)?;
/// client.finalize(Role::Client, 20000, Some("127.0.0.1"))?;
/// client.connect(Duration::from_millis(1000))?;
///
/// let n = client.write(b"hello")?;
/// println!("sent {n} bytes");
/// # Ok::<(), xsocket::EndpointError>(())
/// ```
#[derive(Debug)]
pub struct Endpoint {
    socket: Option<Handle>,
    role: Role,
    state: State,
    remote: Option<SocketAddr>,
    verbose: bool,
}

impl Endpoint {
    /// Creates an empty endpoint. With `verbose` set, every failure is also logged.
    pub fn new(verbose: bool) -> Self {
        Self {
            socket: None,
            role: Role::Unset,
            state: State::Empty,
            remote: None,
            verbose,
        }
    }

    /// The transport chosen at creation.
    pub fn transport(&self) -> Transport {
        self.socket.as_ref().map_or(Transport::Unset, Handle::transport)
    }

    /// The role chosen at finalization.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Where the endpoint is in its lifecycle.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether failures are logged.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// The client target, or for a Udp client the sender of the last datagram received.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Allocates the OS socket for `transport`.
    ///
    /// An endpoint owns at most one descriptor: calling this twice fails with
    /// [`EndpointError::InvalidState`] and keeps the first one.
    pub fn create(&mut self, transport: Transport) -> Result<()> {
        if self.socket.is_some() {
            return Err(self.fail("create", EndpointError::InvalidState("socket already created")));
        }
        let (ty, protocol) = match transport {
            Transport::Tcp => (Type::STREAM, Protocol::TCP),
            Transport::Udp => (Type::DGRAM, Protocol::UDP),
            Transport::Unset => return Err(self.fail("create", EndpointError::UnsupportedTransport)),
        };
        let socket = Socket::new(Domain::IPV4, ty, Some(protocol))
            .map_err(|e| self.fail("create", EndpointError::CreateFailure(e)))?;
        log::debug!("Created {transport:?} socket");
        self.socket = Some(match transport {
            Transport::Udp => Handle::Datagram(socket.into()),
            _ => Handle::Stream(socket),
        });
        self.state = State::Created;
        Ok(())
    }

    /// Sets `TCP_NODELAY`, disabling send coalescing when `enable` is true. Tcp only.
    pub fn set_no_delay(&self, enable: bool) -> Result<()> {
        let socket = self.socket_for("set_no_delay", Some(Transport::Tcp))?;
        socket
            .set_nodelay(enable)
            .map_err(|e| self.fail("set_no_delay", EndpointError::SetOptionFailure(e)))
    }

    /// Sets `SO_REUSEADDR`. Must be called before `finalize` to affect the bind.
    pub fn set_reuse_address(&self, enable: bool) -> Result<()> {
        let socket = self.socket_for("set_reuse_address", None)?;
        socket
            .set_reuse_address(enable)
            .map_err(|e| self.fail("set_reuse_address", EndpointError::SetOptionFailure(e)))
    }

    /// Bounds subsequent blocking receives. `None` blocks until data arrives.
    ///
    /// A receive that runs out of time fails with [`EndpointError::ReceiveTimeout`].
    /// A zero duration is rejected.
    pub fn set_receive_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let socket = self.socket_for("set_receive_timeout", None)?;
        if timeout == Some(Duration::ZERO) {
            let e = io::Error::new(io::ErrorKind::InvalidInput, "zero receive timeout");
            return Err(self.fail("set_receive_timeout", EndpointError::SetOptionFailure(e)));
        }
        socket
            .set_read_timeout(timeout)
            .map_err(|e| self.fail("set_receive_timeout", EndpointError::SetOptionFailure(e)))
    }

    /// Applies every option set in `options`, stopping at the first failure.
    ///
    /// `connect_timeout` is not a socket option; it is read by
    /// [`connect_with`](Endpoint::connect_with).
    pub fn apply(&self, options: &EndpointOptions) -> Result<()> {
        if let Some(enable) = options.no_delay {
            self.set_no_delay(enable)?;
        }
        if let Some(enable) = options.reuse_address {
            self.set_reuse_address(enable)?;
        }
        if let Some(timeout) = options.receive_timeout {
            self.set_receive_timeout(Some(timeout))?;
        }
        Ok(())
    }

    /// Configures the endpoint for `role`.
    ///
    /// A server binds the wildcard address on `port` and, for Tcp, starts listening
    /// with room for a single pending connection. A client records
    /// `server_address:port` (dotted-quad IPv4) as its target.
    ///
    /// The role is only recorded on success, so a failed bind can be retried on
    /// another port. Once set, the role cannot change.
    pub fn finalize(&mut self, role: Role, port: u16, server_address: Option<&str>) -> Result<()> {
        let Some(handle) = self.socket.as_ref() else {
            return Err(self.fail("finalize", EndpointError::UnsupportedTransport));
        };
        if self.role != Role::Unset {
            return Err(self.fail("finalize", EndpointError::InvalidState("role already set")));
        }
        match role {
            Role::Unset => return Err(self.fail("finalize", EndpointError::NoRoleSpecified)),
            Role::Server => {
                let socket = handle.sock();
                let local = SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
                socket
                    .bind(&local)
                    .map_err(|e| self.fail("finalize", EndpointError::BindFailure(e)))?;
                if let Handle::Stream(_) = handle {
                    socket
                        .listen(LISTEN_BACKLOG)
                        .map_err(|e| self.fail("finalize", EndpointError::ListenFailure(e)))?;
                    log::debug!("Listening on port {port}");
                } else {
                    log::debug!("Bound to port {port}");
                }
            }
            Role::Client => {
                let ip = ipv4::parse(server_address.unwrap_or_default())
                    .map_err(|e| self.fail("finalize", e))?;
                let target = SocketAddr::V4(SocketAddrV4::new(ip, port));
                log::debug!("Client targets {target}");
                self.remote = Some(target);
            }
        }
        self.role = role;
        self.state = State::Finalized;
        Ok(())
    }

    /// Blocks until a client connects and returns the accepted connection.
    ///
    /// The listening socket stays usable for further accepts. Tcp server only.
    pub fn accept(&self) -> Result<Peer> {
        let socket = self.stream("accept", Role::Server)?;
        let (socket, addr) = socket
            .accept()
            .map_err(|e| self.fail("accept", EndpointError::AcceptFailure(e)))?;
        let addr = addr.as_socket().ok_or_else(|| {
            let e = io::Error::new(io::ErrorKind::InvalidData, "peer is not an IP address");
            self.fail("accept", EndpointError::AcceptFailure(e))
        })?;
        log::debug!("Accepted connection from: {addr}");
        Ok(Peer {
            socket,
            addr,
            verbose: self.verbose,
        })
    }

    /// Connects to the finalized target, waiting at most `timeout`.
    ///
    /// The descriptor is switched to non-blocking mode for the attempt and its
    /// original flags are restored before the outcome is classified, on every
    /// path. A zero `timeout` only checks whether the connection completed
    /// immediately.
    ///
    /// There is no reconnect: after one attempt the endpoint is either
    /// [`State::Connected`] or [`State::Failed`], and further calls fail with
    /// [`EndpointError::InvalidState`]. Tcp client only.
    pub fn connect(&mut self, timeout: Duration) -> Result<()> {
        let socket = self.stream("connect", Role::Client)?;
        if self.state != State::Finalized {
            return Err(self.fail("connect", EndpointError::InvalidState("connection already attempted")));
        }
        let Some(remote) = self.remote else {
            return Err(self.fail("connect", EndpointError::InvalidState("no target address")));
        };
        let outcome = connect_nonblocking(socket, &SockAddr::from(remote), timeout)
            .map_err(|e| self.fail("connect", e));
        match outcome {
            Ok(()) => {
                log::debug!("Connected to {remote}");
                self.state = State::Connected;
            }
            Err(_) => self.state = State::Failed,
        }
        outcome
    }

    /// Same as [`connect`](Endpoint::connect), bounded by `options.connect_timeout`.
    pub fn connect_with(&mut self, options: &EndpointOptions) -> Result<()> {
        self.connect(options.connect_timeout)
    }

    /// Receives from the connected server. Tcp client only.
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`;
    /// zero means the peer closed the connection. Fails with
    /// [`EndpointError::InvalidState`] unless `connect` succeeded.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut socket = self.connected("read")?;
        socket
            .read(buf)
            .map_err(|e| self.fail("read", EndpointError::from_recv(e)))
    }

    /// Sends to the connected server. Tcp client only.
    ///
    /// Returns the number of bytes written; a partial write is not retried.
    /// Fails with [`EndpointError::InvalidState`] unless `connect` succeeded.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut socket = self.connected("write")?;
        socket
            .write(buf)
            .map_err(|e| self.fail("write", EndpointError::WriteError(e)))
    }

    /// Receives from an accepted connection. Tcp server only.
    pub fn read_peer(&self, peer: &Peer, buf: &mut [u8]) -> Result<usize> {
        self.stream("read_peer", Role::Server)?;
        let mut socket = &peer.socket;
        socket
            .read(buf)
            .map_err(|e| self.fail("read_peer", EndpointError::from_recv(e)))
    }

    /// Sends to an accepted connection. Tcp server only.
    pub fn write_peer(&self, peer: &Peer, buf: &[u8]) -> Result<usize> {
        self.stream("write_peer", Role::Server)?;
        let mut socket = &peer.socket;
        socket
            .write(buf)
            .map_err(|e| self.fail("write_peer", EndpointError::WriteError(e)))
    }

    /// Receives one datagram. Udp client only.
    ///
    /// The sender becomes the stored remote address, so later [`send`](Endpoint::send)
    /// calls answer whoever spoke last.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let socket = self.datagram("recv", Role::Client)?;
        let (n, from) = socket
            .recv_from(buf)
            .map_err(|e| self.fail("recv", EndpointError::from_recv(e)))?;
        self.remote = Some(from);
        Ok((n, from))
    }

    /// Sends one datagram to the stored remote address. Udp client only.
    pub fn send(&self, buf: &[u8]) -> Result<usize> {
        let socket = self.datagram("send", Role::Client)?;
        let Some(remote) = self.remote else {
            return Err(self.fail("send", EndpointError::InvalidState("no target address")));
        };
        socket
            .send_to(buf, remote)
            .map_err(|e| self.fail("send", EndpointError::WriteError(e)))
    }

    /// Receives one datagram and returns its sender. Udp server only.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let socket = self.datagram("recv_from", Role::Server)?;
        socket
            .recv_from(buf)
            .map_err(|e| self.fail("recv_from", EndpointError::from_recv(e)))
    }

    /// Sends one datagram to `to`. Udp server only.
    pub fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result<usize> {
        let socket = self.datagram("send_to", Role::Server)?;
        socket
            .send_to(buf, to)
            .map_err(|e| self.fail("send_to", EndpointError::WriteError(e)))
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self.socket_for("local_addr", None)?;
        local_ip_addr(&socket).map_err(|e| self.fail("local_addr", e))
    }

    fn socket_for(&self, op: &'static str, transport: Option<Transport>) -> Result<SockRef<'_>> {
        match self.socket.as_ref() {
            Some(handle) if transport.is_none_or(|t| t == handle.transport()) => Ok(handle.sock()),
            _ => Err(self.fail(op, EndpointError::UnsupportedTransport)),
        }
    }

    /// Transport is checked before role, so a Udp endpoint asked for a Tcp
    /// operation always reports the transport mismatch.
    fn stream(&self, op: &'static str, role: Role) -> Result<&Socket> {
        let Some(Handle::Stream(socket)) = self.socket.as_ref() else {
            return Err(self.fail(op, EndpointError::UnsupportedTransport));
        };
        self.require_role(op, role)?;
        Ok(socket)
    }

    fn datagram(&self, op: &'static str, role: Role) -> Result<&UdpSocket> {
        let Some(Handle::Datagram(socket)) = self.socket.as_ref() else {
            return Err(self.fail(op, EndpointError::UnsupportedTransport));
        };
        self.require_role(op, role)?;
        Ok(socket)
    }

    /// The client stream, once `connect` has succeeded.
    fn connected(&self, op: &'static str) -> Result<&Socket> {
        let socket = self.stream(op, Role::Client)?;
        if self.state != State::Connected {
            return Err(self.fail(op, EndpointError::InvalidState("not connected")));
        }
        Ok(socket)
    }

    fn require_role(&self, op: &'static str, role: Role) -> Result<()> {
        if self.role != role {
            return Err(self.fail(op, EndpointError::WrongSocketType));
        }
        Ok(())
    }

    fn fail(&self, op: &'static str, err: EndpointError) -> EndpointError {
        log_failure(self.verbose, "Endpoint", op, err)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if let Some(handle) = self.socket.take() {
            // Listening and unconnected sockets report ENOTCONN here.
            let _ = handle.sock().shutdown(Shutdown::Both);
            log::debug!("Released {:?} socket", handle.transport());
        }
    }
}

/// A connection accepted by a Tcp server [`Endpoint`].
///
/// Data is exchanged through [`Endpoint::read_peer`] and [`Endpoint::write_peer`]
/// on the server that accepted it. Dropping the peer closes the connection.
/// A peer logs its own failures when the accepting server is verbose.
#[derive(Debug)]
pub struct Peer {
    socket: Socket,
    addr: SocketAddr,
    verbose: bool,
}

impl Peer {
    /// The remote address of the connection.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The local half of the connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        local_ip_addr(&self.socket).map_err(|e| log_failure(self.verbose, "Peer", "local_addr", e))
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

/// Logs `err` when `verbose` is set and hands it back unchanged.
fn log_failure(verbose: bool, owner: &str, op: &str, err: EndpointError) -> EndpointError {
    if verbose {
        match std::error::Error::source(&err) {
            Some(cause) => log::warn!("{owner}::{op} failed: {err}: {cause}"),
            None => log::warn!("{owner}::{op} failed: {err}"),
        }
    }
    err
}

fn local_ip_addr(socket: &Socket) -> Result<SocketAddr> {
    let addr = socket.local_addr().map_err(EndpointError::GetOptionFailure)?;
    addr.as_socket().ok_or_else(|| {
        EndpointError::GetOptionFailure(io::Error::new(
            io::ErrorKind::InvalidData,
            "local address is not an IP address",
        ))
    })
}

enum Attempt {
    Established,
    Writable,
    TimedOut,
    WaitFailed(io::Error),
    Rejected(io::Error),
}

fn connect_nonblocking(socket: &Socket, remote: &SockAddr, timeout: Duration) -> Result<()> {
    let saved = sys::get_flags(socket).map_err(EndpointError::GetFlagsFailure)?;
    sys::set_flags(socket, sys::with_nonblocking(saved)).map_err(EndpointError::SetFlagsFailure)?;

    let attempt = match socket.connect(remote) {
        Ok(()) => Attempt::Established,
        Err(e) if sys::connect_in_progress(&e) => match wait_writable(socket, timeout) {
            Ok(0) => Attempt::TimedOut,
            Ok(_) => Attempt::Writable,
            Err(e) => Attempt::WaitFailed(e),
        },
        Err(e) => Attempt::Rejected(e),
    };

    sys::set_flags(socket, saved).map_err(EndpointError::SetFlagsFailure)?;

    match attempt {
        Attempt::Established => Ok(()),
        Attempt::TimedOut => Err(EndpointError::ConnectionTimeout),
        Attempt::WaitFailed(e) => Err(EndpointError::ConnectionFailure(e)),
        Attempt::Rejected(e) => Err(EndpointError::from_rejected(e)),
        Attempt::Writable => match socket.take_error() {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(EndpointError::from_pending(e)),
            Err(e) => Err(EndpointError::GetOptionFailure(e)),
        },
    }
}

/// Waits for `socket` to become writable. Returns the number of ready events,
/// zero when the timeout elapsed first.
fn wait_writable(socket: &Socket, timeout: Duration) -> io::Result<usize> {
    let poller = polling::Poller::new()?;
    // SAFETY: the socket is deleted from the poller before it can be dropped.
    unsafe {
        poller.add(socket, polling::Event::writable(CONNECT_KEY))?;
    }
    let mut events = polling::Events::new();
    let ready = poller.wait(&mut events, Some(timeout));
    let _ = poller.delete(socket);
    ready
}
