#![cfg(test)]
//! End-to-end tests running a live server on loopback.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::server::SocksServer;
use crate::thread::spawn_thread;

/// single-shot echo service; replies everything it reads until EOF
fn start_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_thread("echo", move || {
        if let Ok((mut conn, _)) = listener.accept() {
            let mut buff = [0u8; 1024];
            loop {
                match conn.read(&mut buff) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if conn.write_all(&buff[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    })
    .unwrap();
    addr
}

fn start_server() -> (SocksServer, SocketAddr) {
    let server = SocksServer::new(&ServerConfig::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    server.serve(listener).unwrap();
    (server, addr)
}

#[test]
fn socks5_roundtrip() {
    use socks::Socks5Stream;

    let echo = start_echo();
    let (server, proxy) = start_server();

    let mut conn = Socks5Stream::connect(proxy, echo).unwrap();
    conn.write_all(b"hello through socks5").unwrap();
    let mut buff = [0u8; 20];
    conn.read_exact(&mut buff).unwrap();
    assert_eq!(&buff, b"hello through socks5");

    server.close().unwrap();
}

#[test]
fn socks5_domain_roundtrip() {
    use socks::Socks5Stream;

    let echo = start_echo();
    let (server, proxy) = start_server();

    let mut conn = Socks5Stream::connect(proxy, ("localhost", echo.port())).unwrap();
    conn.write_all(b"ping").unwrap();
    let mut buff = [0u8; 4];
    conn.read_exact(&mut buff).unwrap();
    assert_eq!(&buff, b"ping");

    server.close().unwrap();
}

#[test]
fn socks4_roundtrip() {
    use socks::Socks4Stream;

    let echo = start_echo();
    let (server, proxy) = start_server();

    let mut conn = Socks4Stream::connect(proxy, echo, "ferris").unwrap();
    conn.write_all(b"hello through socks4").unwrap();
    let mut buff = [0u8; 20];
    conn.read_exact(&mut buff).unwrap();
    assert_eq!(&buff, b"hello through socks4");

    server.close().unwrap();
}

#[test]
fn socks4a_raw_handshake() {
    let echo = start_echo();
    let (server, proxy) = start_server();

    // CONNECT to localhost:<echo port> in the 4A form: sentinel 0.0.0.1 and
    // the hostname as a second NUL-terminated string
    let mut conn = TcpStream::connect(proxy).unwrap();
    let mut request = vec![4, 1];
    request.extend_from_slice(&echo.port().to_be_bytes());
    request.extend_from_slice(&[0, 0, 0, 1]);
    request.extend_from_slice(b"nobody\0");
    request.extend_from_slice(b"localhost\0");
    conn.write_all(&request).unwrap();

    let mut reply = [0u8; 8];
    conn.read_exact(&mut reply).unwrap();
    assert_eq!(reply, [0, 90, 0, 0, 0, 0, 0, 0]);

    conn.write_all(b"4a").unwrap();
    let mut buff = [0u8; 2];
    conn.read_exact(&mut buff).unwrap();
    assert_eq!(&buff, b"4a");

    server.close().unwrap();
}

#[test]
fn socks5_refused_destination() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (server, proxy) = start_server();

    let mut conn = TcpStream::connect(proxy).unwrap();
    conn.write_all(&[5, 1, 0]).unwrap();
    let mut selection = [0u8; 2];
    conn.read_exact(&mut selection).unwrap();
    assert_eq!(selection, [5, 0]);

    let mut request = vec![5, 1, 0, 1, 127, 0, 0, 1];
    request.extend_from_slice(&closed.port().to_be_bytes());
    conn.write_all(&request).unwrap();

    let mut reply = [0u8; 10];
    conn.read_exact(&mut reply).unwrap();
    assert_eq!(&reply[..4], [5, 5, 0, 1]);

    server.close().unwrap();
}

#[test]
fn socks5_no_acceptable_method() {
    let (server, proxy) = start_server();

    let mut conn = TcpStream::connect(proxy).unwrap();
    // offers username/password only
    conn.write_all(&[5, 1, 2]).unwrap();
    let mut selection = [0u8; 2];
    conn.read_exact(&mut selection).unwrap();
    assert_eq!(selection, [5, 0xff]);

    // the server hangs up without a request phase
    let mut buff = [0u8; 1];
    assert_eq!(conn.read(&mut buff).unwrap(), 0);

    server.close().unwrap();
}

#[test]
fn socks4_rejected_destination() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (server, proxy) = start_server();

    let mut conn = TcpStream::connect(proxy).unwrap();
    let mut request = vec![4, 1];
    request.extend_from_slice(&closed.port().to_be_bytes());
    request.extend_from_slice(&[127, 0, 0, 1]);
    request.extend_from_slice(b"\0");
    conn.write_all(&request).unwrap();

    let mut reply = [0u8; 8];
    conn.read_exact(&mut reply).unwrap();
    assert_eq!(reply[1], 91);

    server.close().unwrap();
}

#[test]
fn unknown_protocol_is_dropped() {
    let (server, proxy) = start_server();

    let mut conn = TcpStream::connect(proxy).unwrap();
    conn.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    // no reply of any protocol; the connection just ends (the drop may
    // surface as EOF or as a reset, depending on what was left unread)
    let mut buff = [0u8; 1];
    match conn.read(&mut buff) {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!("unexpected reply: {:?}", &buff[..n]),
    }

    server.close().unwrap();
}
