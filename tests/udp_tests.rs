//! Loopback tests for Udp endpoints.

use std::time::Duration;

use xsocket::{Endpoint, EndpointError, Role, Transport};

fn udp_server() -> (Endpoint, u16) {
    let mut server = Endpoint::new(true);
    server.create(Transport::Udp).unwrap();
    server.finalize(Role::Server, 0, None).unwrap();
    server.set_receive_timeout(Some(Duration::from_secs(5))).unwrap();
    let port = server.local_addr().unwrap().port();
    (server, port)
}

fn udp_client(port: u16) -> Endpoint {
    let mut client = Endpoint::new(true);
    client.create(Transport::Udp).unwrap();
    client.finalize(Role::Client, port, Some("127.0.0.1")).unwrap();
    client.set_receive_timeout(Some(Duration::from_secs(5))).unwrap();
    client
}

#[test]
fn datagram_carries_sender_address() {
    let (server, port) = udp_server();
    let client = udp_client(port);

    assert_eq!(client.send(b"ping").unwrap(), 4);
    let client_port = client.local_addr().unwrap().port();

    let mut buf = [0u8; 64];
    let (n, from) = server.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ping");
    assert_eq!(from.port(), client_port);
    assert_eq!(from.ip().to_string(), "127.0.0.1");
}

#[test]
fn server_replies_to_sender_and_client_records_it() {
    let (server, port) = udp_server();
    let mut client = udp_client(port);

    client.send(b"hello").unwrap();
    let mut buf = [0u8; 64];
    let (n, from) = server.recv_from(&mut buf).unwrap();
    assert_eq!(server.send_to(&buf[..n], from).unwrap(), n);

    let (n, replier) = client.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(replier.port(), port);
    assert_eq!(client.remote_addr(), Some(replier));
}

#[test]
fn empty_socket_reports_receive_timeout() {
    let mut server = Endpoint::new(false);
    server.create(Transport::Udp).unwrap();
    server.finalize(Role::Server, 0, None).unwrap();
    server.set_receive_timeout(Some(Duration::from_millis(30))).unwrap();

    let mut buf = [0u8; 16];
    let r = server.recv_from(&mut buf);
    assert!(matches!(r, Err(EndpointError::ReceiveTimeout)), "{r:?}");
}

#[test]
fn datagram_larger_than_buffer_is_truncated() {
    let (server, port) = udp_server();
    let client = udp_client(port);

    client.send(&[7u8; 32]).unwrap();
    let mut buf = [0u8; 8];
    let (n, _) = server.recv_from(&mut buf).unwrap();
    assert_eq!(n, 8);
    assert_eq!(buf, [7u8; 8]);
}
