//! # xsocket - One Socket, Either Transport, Either Side
//!
//! xsocket wraps a single OS socket that can be configured as a TCP or UDP
//! endpoint and used as a server (bind, listen, accept) or as a client
//! (connect). All I/O is blocking; the only non-blocking step is the
//! connect handshake, which is bounded by a caller-supplied timeout.
//!
//! ## Lifecycle
//!
//! 1. [`Endpoint::new`] builds an empty endpoint.
//! 2. [`Endpoint::create`] allocates the socket for a [`Transport`].
//! 3. Options ([`Endpoint::set_no_delay`], [`Endpoint::set_reuse_address`],
//!    [`Endpoint::set_receive_timeout`], or [`Endpoint::apply`]) are set.
//! 4. [`Endpoint::finalize`] fixes the [`Role`]: servers bind (and listen for
//!    Tcp), clients record their target.
//! 5. I/O: [`Endpoint::accept`] / [`Endpoint::connect`], then the read and write
//!    calls matching the transport and role.
//! 6. Dropping the endpoint shuts the socket down and closes it.
//!
//! Every call that does not fit the endpoint's transport or role fails with
//! [`EndpointError::UnsupportedTransport`] or [`EndpointError::WrongSocketType`]
//! without issuing any system call.
//!
//! ## Server Side
//!
//! ```rust,no_run
//! use xsocket::{Endpoint, Role, Transport};
//!
//! let mut server = Endpoint::new(false);
//! server.create(Transport::Tcp)?;
//! server.set_reuse_address(true)?;
//! server.finalize(Role::Server, 20000, None)?;
//!
//! let peer = server.accept()?;
//! println!("Accepted connection from {}", peer.addr());
//!
//! let mut buffer = [0; 1024];
//! let n = server.read_peer(&peer, &mut buffer)?;
//! server.write_peer(&peer, &buffer[..n])?;
//! # Ok::<(), xsocket::EndpointError>(())
//! ```
//!
//! ## Client Side
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use xsocket::{Endpoint, EndpointError, Role, Transport};
//!
//! let mut client = Endpoint::new(true);
//! client.create(Transport::Tcp)?;
//! client.finalize(Role::Client, 20000, Some("127.0.0.1"))?;
//!
//! match client.connect(Duration::from_millis(500)) {
//!     Ok(()) => {}
//!     Err(EndpointError::ConnectionTimeout) => println!("server did not answer"),
//!     Err(e) => return Err(e),
//! }
//! client.write(b"Hello")?;
//! # Ok::<(), xsocket::EndpointError>(())
//! ```
//!
//! ## Datagrams
//!
//! A Udp client sends to its finalized target with [`Endpoint::send`] and
//! receives with [`Endpoint::recv`]. A Udp server answers whoever spoke with
//! [`Endpoint::recv_from`] and [`Endpoint::send_to`].
//!
//! ## Diagnostics
//!
//! The crate logs through the `log` facade. Lifecycle steps are logged at
//! debug level; an endpoint built with `verbose` also warns on every failure.
//! Errors are always returned, logging is never the only trace of a failure.


#![warn(missing_docs)]

mod endpoint;
mod error;
pub mod ipv4;
mod options;
#[cfg_attr(unix, path = "sys/unix.rs")]
#[cfg_attr(windows, path = "sys/windows.rs")]
mod sys;

pub use endpoint::*;
pub use error::*;
pub use options::*;
