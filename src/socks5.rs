//! RFC 1928 SOCKS Protocol Version 5.
//!
//! ```text
//! client            proxy            service
//!   |                 |                 |
//!   |---------------->|                 |
//!   | method candidates                 |
//!   |<----------------|                 |
//!   |  method selection                 |
//!   |                 |                 |
//!   |---------------->|                 |
//!   | connect request |                 |
//!   |<----------------|                 |
//!   |    connect reply|                 |
//!   |                 |                 |
//!   | - - - - - - - ->| - - - - - - - ->|
//!   |            [[ Relay ]]            |
//!   |<- - - - - - - - |< - - - - - - - -|
//! ```

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use derive_more::Display;
use log::*;

use crate::byte_stream::ByteStream;
use crate::connector::Connector;
use crate::error::Error;
use crate::model::Address;
use crate::peek_stream::PeekStream;
use crate::relay;

pub const VERSION: u8 = 5;

const RESERVED: u8 = 0x00;
const CMD_CONNECT: u8 = 1;

/// Section 6. Replies > Reply field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum ResponseCode {
    #[display(fmt = "succeeded")]
    Success = 0x00,
    #[display(fmt = "general SOCKS server failure")]
    Failure = 0x01,
    #[display(fmt = "connection not allowed by ruleset")]
    RuleFailure = 0x02,
    #[display(fmt = "network unreachable")]
    NetworkUnreachable = 0x03,
    #[display(fmt = "host unreachable")]
    HostUnreachable = 0x04,
    #[display(fmt = "connection refused")]
    ConnectionRefused = 0x05,
    #[display(fmt = "TTL expired")]
    TtlExpired = 0x06,
    #[display(fmt = "command not supported")]
    CommandNotSupported = 0x07,
    #[display(fmt = "address type not supported")]
    AddrTypeNotSupported = 0x08,
}

impl ResponseCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl From<&Error> for ResponseCode {
    fn from(err: &Error) -> Self {
        use ResponseCode::*;
        match err {
            Error::DomainNotResolved { .. } => HostUnreachable,
            Error::HostUnreachable { .. } => HostUnreachable,
            Error::NetworkUnreachable { .. } => NetworkUnreachable,
            Error::ConnectionRefused { .. } => ConnectionRefused,
            Error::ConnectionTimedOut { .. } => TtlExpired,
            Error::CommandNotSupported { .. } => CommandNotSupported,
            Error::AddrTypeNotSupported { .. } => AddrTypeNotSupported,
            _ => Failure,
        }
    }
}

/// client authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Method {
    /// No Authentication
    NoAuth,
    /// GSSAPI
    GssApi,
    /// Authenticate with a username / password
    UserPass,
    /// IANA assigned method
    IANAMethod(u8),
    /// Reserved for private method
    Private(u8),
    /// No acceptable method
    NoMethods,
}

impl Method {
    pub fn code(&self) -> u8 {
        use Method::*;
        match self {
            NoAuth => 0x00,
            GssApi => 0x01,
            UserPass => 0x02,
            IANAMethod(c) => *c,
            Private(c) => *c,
            NoMethods => 0xff,
        }
    }
}

impl From<u8> for Method {
    fn from(code: u8) -> Self {
        use Method::*;
        match code {
            0x00 => NoAuth,
            0x01 => GssApi,
            0x02 => UserPass,
            0x03..=0x7f => IANAMethod(code),
            0x80..=0xfe => Private(code),
            0xff => NoMethods,
        }
    }
}

/// ATYP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddrType {
    V4 = 0x01,
    Domain = 0x03,
    V6 = 0x04,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Request {
    pub command: u8,
    pub dest: Address,
}

/// Phase 1: select an authentication method from the client's candidates.
///
/// Only `NO AUTHENTICATION REQUIRED` is supported; when the client does not
/// offer it the reply is 0xFF and the session ends before the request phase.
fn negotiate_method<S>(stream: &mut PeekStream<S>) -> Result<Method, Error>
where
    S: ByteStream,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header)?;

    if header[0] != VERSION {
        return Err(Error::Version(header[0]));
    }
    if header[1] < 1 {
        return Err(Error::message_fmt(format_args!(
            "invalid number of methods: {}",
            header[1]
        )));
    }

    let mut methods = vec![0u8; header[1] as usize];
    stream.read_exact(&mut methods)?;
    trace!("candidates: {:?}", methods);

    let selected = methods
        .iter()
        .map(|code| Method::from(*code))
        .find(|method| *method == Method::NoAuth)
        .unwrap_or(Method::NoMethods);
    stream.write_all(&[VERSION, selected.code()])?;

    match selected {
        Method::NoMethods => Err(Error::NoAcceptableMethod),
        method => Ok(method),
    }
}

/// Phase 2: the connect request with one of three address encodings.
pub fn read_request<S>(stream: &mut PeekStream<S>) -> Result<Socks5Request, Error>
where
    S: ByteStream,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header)?;

    if header[0] != VERSION {
        return Err(Error::Version(header[0]));
    }

    let host = read_addr(stream, header[3])?;

    let mut port = [0u8; 2];
    stream.read_exact(&mut port)?;
    let port = u16::from_be_bytes(port);

    let dest = match host {
        Host::Ip(addr) => Address::IpAddr(addr, port),
        Host::Domain(domain) => Address::Domain(domain, port),
    };

    Ok(Socks5Request {
        command: header[1],
        dest,
    })
}

enum Host {
    Ip(std::net::IpAddr),
    Domain(String),
}

fn read_addr<S>(stream: &mut PeekStream<S>, atyp: u8) -> Result<Host, Error>
where
    S: ByteStream,
{
    match atyp {
        atyp if atyp == AddrType::V4 as u8 => {
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf)?;
            Ok(Host::Ip(Ipv4Addr::from(buf).into()))
        }
        atyp if atyp == AddrType::Domain as u8 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len)?;
            // an empty name cannot address a destination
            if len[0] == 0 {
                return Err(Error::AddrTypeNotSupported { atyp });
            }
            let mut buf = vec![0u8; len[0] as usize];
            stream.read_exact(&mut buf)?;
            Ok(Host::Domain(String::from_utf8_lossy(&buf).to_string()))
        }
        atyp if atyp == AddrType::V6 as u8 => {
            let mut buf = [0u8; 16];
            stream.read_exact(&mut buf)?;
            Ok(Host::Ip(Ipv6Addr::from(buf).into()))
        }
        atyp => Err(Error::AddrTypeNotSupported { atyp }),
    }
}

/// Build the complete wire reply in one step.
///
/// `None` produces the 10-byte IPv4-shaped zero template used for error
/// replies; a bound address makes the length 10 (IPv4) or 22 (IPv6) with the
/// address-type tag kept consistent.
pub fn reply(code: ResponseCode, bound: Option<SocketAddr>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 16 + 2);
    buf.extend_from_slice(&[VERSION, code.code(), RESERVED]);
    match bound {
        Some(SocketAddr::V4(addr)) => {
            buf.push(AddrType::V4 as u8);
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        Some(SocketAddr::V6(addr)) => {
            buf.push(AddrType::V6 as u8);
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        None => {
            buf.push(AddrType::V4 as u8);
            buf.extend_from_slice(&[0u8; 6]);
        }
    }
    buf
}

pub fn handle<S, C>(mut stream: PeekStream<S>, connector: &C) -> Result<(), Error>
where
    S: ByteStream + 'static,
    C: Connector,
{
    let method = negotiate_method(&mut stream)?;
    debug!("auth method: {:?}", method);

    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err @ Error::AddrTypeNotSupported { .. }) => {
            stream.write_all(&reply(ResponseCode::AddrTypeNotSupported, None))?;
            return Err(err);
        }
        Err(err) => return Err(err),
    };
    debug!("request: {:?}", request);

    if request.command != CMD_CONNECT {
        stream.write_all(&reply(ResponseCode::CommandNotSupported, None))?;
        return Err(Error::CommandNotSupported {
            cmd: request.command,
        });
    }

    let (dest, local_addr) = match connector.connect(&request.dest) {
        Ok(conn) => conn,
        Err(err) => {
            error!("connect error: {}", err);
            stream.write_all(&reply(ResponseCode::from(&err), None))?;
            return Err(err);
        }
    };
    info!("connected: {}: {}", request.dest, local_addr);

    // the client is told which local endpoint the proxy relays through
    stream.write_all(&reply(ResponseCode::Success, Some(local_addr)))?;

    relay::run(stream, dest)
}
