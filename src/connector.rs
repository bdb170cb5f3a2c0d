use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::*;

use crate::byte_stream::ByteStream;
use crate::error::Error;
use crate::model::Address;

/// makes the second connection of a circuit
///
/// Returns the established stream together with its local endpoint, which
/// the SOCKS5 reply reports back to the client.
pub trait Connector: Send {
    type Stream: ByteStream + 'static;
    fn connect(&self, addr: &Address) -> Result<(Self::Stream, SocketAddr), Error>;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    /// source address for outbound connections
    local_addr: Option<SocketAddr>,
    rw_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(local_addr: Option<SocketAddr>, rw_timeout: Option<Duration>) -> Self {
        Self {
            local_addr,
            rw_timeout,
        }
    }

    fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        match self.local_addr {
            Some(local) => {
                let socket = socket2::Socket::new(
                    socket2::Domain::for_address(addr),
                    socket2::Type::STREAM,
                    Some(socket2::Protocol::TCP),
                )?;
                socket.bind(&SocketAddr::new(local.ip(), 0).into())?;
                socket.connect(&addr.into())?;
                Ok(socket.into())
            }
            None => TcpStream::connect(addr),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, addr: &Address) -> Result<(Self::Stream, SocketAddr), Error> {
        let candidates: Vec<_> = addr
            .to_socket_addrs()
            .map_err(|err| resolve_error(err, addr))?
            .collect();

        let mut last_err = None;
        for candidate in candidates {
            match self.dial(candidate) {
                Ok(strm) => {
                    strm.set_read_timeout(self.rw_timeout)?;
                    strm.set_write_timeout(self.rw_timeout)?;
                    let local = strm.local_addr()?;
                    return Ok((strm, local));
                }
                Err(err) => {
                    debug!("dial {}: {}", candidate, err);
                    last_err = Some(err);
                }
            }
        }
        let err = last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address resolved"));
        Err(conn_error(err, addr))
    }
}

fn resolve_error(err: io::Error, addr: &Address) -> Error {
    match addr {
        Address::Domain(domain, port) => Error::DomainNotResolved {
            domain: domain.clone(),
            port: *port,
        },
        Address::IpAddr(..) => err.into(),
    }
}

/// classify the transport error of a failed dial
fn conn_error(err: io::Error, addr: &Address) -> Error {
    use io::ErrorKind as K;
    match err.kind() {
        K::ConnectionRefused => Error::ConnectionRefused { addr: addr.clone() },
        K::TimedOut | K::WouldBlock => Error::ConnectionTimedOut { addr: addr.clone() },
        _ => match err.raw_os_error() {
            Some(libc::ENETUNREACH) => Error::NetworkUnreachable { addr: addr.clone() },
            Some(libc::EHOSTUNREACH) => Error::HostUnreachable { addr: addr.clone() },
            Some(libc::ETIMEDOUT) => Error::ConnectionTimedOut { addr: addr.clone() },
            _ => err.into(),
        },
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::byte_stream::test::BufferStream;
    use std::collections::BTreeMap;

    /// destinations a handler is allowed to reach during a test
    #[derive(Debug, Clone)]
    pub struct BufferConnector {
        pub strms: BTreeMap<Address, Result<BufferStream, ConnectError>>,
        pub local_addr: SocketAddr,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum ConnectError {
        NetworkUnreachable,
        HostUnreachable,
        ConnectionRefused,
        TimedOut,
        DomainNotResolved,
        Other,
    }

    impl FromIterator<(Address, Result<BufferStream, ConnectError>)> for BufferConnector {
        fn from_iter<T>(iter: T) -> Self
        where
            T: IntoIterator<Item = (Address, Result<BufferStream, ConnectError>)>,
        {
            Self {
                strms: iter.into_iter().collect(),
                local_addr: "10.0.0.1:34567".parse().unwrap(),
            }
        }
    }

    impl BufferConnector {
        pub fn stream(&self, addr: &Address) -> &BufferStream {
            self.strms[addr].as_ref().unwrap()
        }
    }

    impl Connector for BufferConnector {
        type Stream = BufferStream;

        fn connect(&self, addr: &Address) -> Result<(Self::Stream, SocketAddr), Error> {
            match &self.strms[addr] {
                Ok(strm) => Ok((strm.clone(), self.local_addr)),
                Err(err) => Err(match err {
                    ConnectError::NetworkUnreachable => {
                        Error::NetworkUnreachable { addr: addr.clone() }
                    }
                    ConnectError::HostUnreachable => Error::HostUnreachable { addr: addr.clone() },
                    ConnectError::ConnectionRefused => {
                        Error::ConnectionRefused { addr: addr.clone() }
                    }
                    ConnectError::TimedOut => Error::ConnectionTimedOut { addr: addr.clone() },
                    ConnectError::DomainNotResolved => Error::DomainNotResolved {
                        domain: addr.to_string(),
                        port: addr.port(),
                    },
                    ConnectError::Other => {
                        io::Error::new(io::ErrorKind::Other, "connect error").into()
                    }
                }),
            }
        }
    }

    #[test]
    fn classify_refused() {
        let addr: Address = "127.0.0.1:1".parse().unwrap();
        let err = conn_error(io::ErrorKind::ConnectionRefused.into(), &addr);
        assert!(matches!(err, Error::ConnectionRefused { .. }));
    }

    #[test]
    fn classify_errno() {
        let addr: Address = "192.0.2.1:80".parse().unwrap();
        let err = conn_error(io::Error::from_raw_os_error(libc::ENETUNREACH), &addr);
        assert!(matches!(err, Error::NetworkUnreachable { .. }));
        let err = conn_error(io::Error::from_raw_os_error(libc::EHOSTUNREACH), &addr);
        assert!(matches!(err, Error::HostUnreachable { .. }));
        let err = conn_error(io::Error::from_raw_os_error(libc::ETIMEDOUT), &addr);
        assert!(matches!(err, Error::ConnectionTimedOut { .. }));
    }

    #[test]
    fn classify_other_is_io() {
        let addr: Address = "192.0.2.1:80".parse().unwrap();
        let err = conn_error(io::Error::new(io::ErrorKind::Other, "boom"), &addr);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn refused_on_loopback() {
        // bind then drop to find a port with nothing listening
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let connector = TcpConnector::new(None, None);
        let addr = Address::IpAddr("127.0.0.1".parse().unwrap(), port);
        assert!(matches!(
            connector.connect(&addr),
            Err(Error::ConnectionRefused { .. })
        ));
    }

    #[test]
    fn local_endpoint_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let connector = TcpConnector::new(None, None);
        let addr: Address = listener.local_addr().unwrap().into();
        let (strm, local) = connector.connect(&addr).unwrap();
        assert_eq!(local, strm.local_addr().unwrap());
        assert_eq!(local.ip(), "127.0.0.1".parse::<std::net::IpAddr>().unwrap());
    }
}
