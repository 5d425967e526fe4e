//! Operations that do not fit an endpoint's transport or role fail without
//! touching the socket.

use std::time::Duration;

use xsocket::{Endpoint, EndpointError, EndpointOptions, Role, State, Transport};

fn finalized(transport: Transport, role: Role) -> Endpoint {
    let mut ep = Endpoint::new(false);
    ep.create(transport).unwrap();
    match role {
        Role::Server => ep.finalize(Role::Server, 0, None).unwrap(),
        _ => ep.finalize(Role::Client, 9, Some("127.0.0.1")).unwrap(),
    }
    ep
}

fn assert_wrong_role<T: std::fmt::Debug>(r: Result<T, EndpointError>) {
    assert!(matches!(r, Err(EndpointError::WrongSocketType)), "{r:?}");
}

fn assert_wrong_transport<T: std::fmt::Debug>(r: Result<T, EndpointError>) {
    assert!(matches!(r, Err(EndpointError::UnsupportedTransport)), "{r:?}");
}

#[test]
fn server_operations_on_tcp_client() {
    let ep = finalized(Transport::Tcp, Role::Client);
    assert_wrong_role(ep.accept());
    assert_eq!(ep.state(), State::Finalized);
}

#[test]
fn client_operations_on_tcp_server() {
    let mut ep = finalized(Transport::Tcp, Role::Server);
    let mut buf = [0u8; 4];
    assert_wrong_role(ep.connect(Duration::from_millis(10)));
    assert_wrong_role(ep.read(&mut buf));
    assert_wrong_role(ep.write(b"data"));
    assert_eq!(ep.state(), State::Finalized);
}

#[test]
fn server_operations_on_udp_client() {
    let ep = finalized(Transport::Udp, Role::Client);
    let mut buf = [0u8; 4];
    assert_wrong_role(ep.recv_from(&mut buf));
    assert_wrong_role(ep.send_to(b"data", "127.0.0.1:9".parse().unwrap()));
}

#[test]
fn client_operations_on_udp_server() {
    let mut ep = finalized(Transport::Udp, Role::Server);
    let mut buf = [0u8; 4];
    assert_wrong_role(ep.recv(&mut buf));
    assert_wrong_role(ep.send(b"data"));
}

#[test]
fn tcp_operations_on_udp_endpoints() {
    let mut client = finalized(Transport::Udp, Role::Client);
    let mut buf = [0u8; 4];
    assert_wrong_transport(client.set_no_delay(true));
    assert_wrong_transport(client.connect(Duration::from_millis(10)));
    assert_wrong_transport(client.connect_with(&EndpointOptions::new()));
    assert_wrong_transport(client.read(&mut buf));
    assert_wrong_transport(client.write(b"data"));
    assert_eq!(client.state(), State::Finalized);

    let server = finalized(Transport::Udp, Role::Server);
    assert_wrong_transport(server.accept());
}

#[test]
fn udp_operations_on_tcp_endpoints() {
    let mut client = finalized(Transport::Tcp, Role::Client);
    let mut buf = [0u8; 4];
    assert_wrong_transport(client.recv(&mut buf));
    assert_wrong_transport(client.send(b"data"));

    let server = finalized(Transport::Tcp, Role::Server);
    assert_wrong_transport(server.recv_from(&mut buf));
    assert_wrong_transport(server.send_to(b"data", "127.0.0.1:9".parse().unwrap()));
}

#[test]
fn transfer_before_connect_is_an_invalid_state() {
    let ep = finalized(Transport::Tcp, Role::Client);
    let mut buf = [0u8; 4];
    assert!(matches!(ep.read(&mut buf), Err(EndpointError::InvalidState(_))));
    assert!(matches!(ep.write(b"data"), Err(EndpointError::InvalidState(_))));
    assert_eq!(ep.state(), State::Finalized);
}

#[test]
fn io_before_finalize_is_a_role_mismatch() {
    let mut ep = Endpoint::new(false);
    ep.create(Transport::Tcp).unwrap();
    assert_wrong_role(ep.connect(Duration::from_millis(10)));
    assert_wrong_role(ep.accept());
    assert_eq!(ep.state(), State::Created);
}

#[test]
fn io_before_create_is_a_transport_mismatch() {
    let mut ep = Endpoint::new(false);
    let mut buf = [0u8; 4];
    assert_wrong_transport(ep.connect(Duration::from_millis(10)));
    assert_wrong_transport(ep.recv(&mut buf));
    assert_wrong_transport(ep.set_reuse_address(true));
    assert_wrong_transport(ep.local_addr());
}

#[test]
fn usage_errors_are_flagged() {
    let ep = finalized(Transport::Udp, Role::Client);
    let err = ep.set_no_delay(true).unwrap_err();
    assert!(err.is_usage_error());
    assert_eq!(err.raw_os_error(), None);
}
