//! Types shared by the SOCKS4 and SOCKS5 handlers.

use std::fmt;
use std::net::ToSocketAddrs;
pub use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// destination named by a proxy request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Address {
    IpAddr(IpAddr, u16),
    Domain(String, u16),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Address::*;
        match self {
            IpAddr(addr, port) => write!(f, "{}:{}", addr, port),
            Domain(host, port) => write!(f, "{}:{}", host, port),
        }
    }
}

impl Address {
    pub fn port(&self) -> u16 {
        match self {
            Address::IpAddr(_, port) => *port,
            Address::Domain(_, port) => *port,
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::IpAddr(addr.ip(), addr.port())
    }
}

impl FromStr for Address {
    type Err = std::net::AddrParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: SocketAddr = s.parse()?;
        Ok(addr.into())
    }
}

impl ToSocketAddrs for Address {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        use Address::*;
        match self {
            IpAddr(ipaddr, port) => Ok(vec![SocketAddr::new(*ipaddr, *port)].into_iter()),
            Domain(domain, port) => Ok((domain.as_str(), *port).to_socket_addrs()?),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_addresses() {
        let addr = Address::IpAddr("192.168.0.1".parse().unwrap(), 1080);
        assert_eq!(addr.to_string(), "192.168.0.1:1080");
        let addr = Address::Domain("example.com".into(), 80);
        assert_eq!(addr.to_string(), "example.com:80");
        let addr = Address::IpAddr("2001:db8::1".parse().unwrap(), 443);
        assert_eq!(addr.to_string(), "2001:db8::1:443");
    }

    #[test]
    fn parse_socket_addr() {
        assert_eq!(
            "127.0.0.1:1080".parse::<Address>().unwrap(),
            Address::IpAddr("127.0.0.1".parse().unwrap(), 1080)
        );
        assert!("example.com:80".parse::<Address>().is_err());
    }

    #[test]
    fn resolve_ip_address_without_lookup() {
        let addr = Address::IpAddr("10.1.2.3".parse().unwrap(), 5123);
        let resolved: Vec<_> = addr.to_socket_addrs().unwrap().collect();
        assert_eq!(resolved, vec!["10.1.2.3:5123".parse().unwrap()]);
    }
}
