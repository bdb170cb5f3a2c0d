//! SOCKS4 and SOCKS4A request/reply handling.
//!
//! The protocol predates IPv6 and method negotiation: a single fixed-layout
//! request names the command, port and IPv4 destination, followed by a
//! NUL-terminated user-id. The 4A extension smuggles a domain name in as a
//! second NUL-terminated string behind the sentinel address `0.0.0.x`, x != 0.

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use log::*;

use crate::byte_stream::ByteStream;
use crate::connector::Connector;
use crate::error::Error;
use crate::model::Address;
use crate::peek_stream::PeekStream;
use crate::relay;

pub const VERSION: u8 = 4;

const CMD_CONNECT: u8 = 1;

/// result code of a SOCKS4 reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResultCode {
    Granted = 90,
    Rejected = 91,
    Failed = 92,
    Unauthorized = 93,
}

impl ResultCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Request {
    pub command: u8,
    pub user: String,
    pub dest: Address,
}

fn read_string<S>(stream: &mut PeekStream<S>) -> Result<String, Error>
where
    S: ByteStream,
{
    let slice = stream.read_slice(0)?;
    Ok(String::from_utf8_lossy(&slice[..slice.len() - 1]).to_string())
}

pub fn read_request<S>(stream: &mut PeekStream<S>) -> Result<Socks4Request, Error>
where
    S: ByteStream,
{
    let mut header = [0u8; 8];
    stream.read_exact(&mut header)?;

    if header[0] != VERSION {
        return Err(Error::Version(header[0]));
    }

    let user = read_string(stream)?;
    let port = u16::from_be_bytes([header[2], header[3]]);

    // 0.0.0.x (x != 0) marks a SOCKS4A request: the real destination follows
    // as a second NUL-terminated string
    let dest = if header[4] == 0 && header[5] == 0 && header[6] == 0 && header[7] != 0 {
        Address::Domain(read_string(stream)?, port)
    } else {
        Address::IpAddr(
            Ipv4Addr::new(header[4], header[5], header[6], header[7]).into(),
            port,
        )
    };

    Ok(Socks4Request {
        command: header[1],
        user,
        dest,
    })
}

/// 8-byte reply; the version octet is 0 on the wire, and this server never
/// echoes a bound address in bytes 2..8
pub fn reply(code: ResultCode) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[1] = code.code();
    buf
}

pub fn handle<S, C>(mut stream: PeekStream<S>, connector: &C) -> Result<(), Error>
where
    S: ByteStream + 'static,
    C: Connector,
{
    let request = read_request(&mut stream)?;
    debug!("request: {:?}", request);

    if request.command != CMD_CONNECT {
        stream.write_all(&reply(ResultCode::Rejected))?;
        return Err(Error::CommandNotSupported {
            cmd: request.command,
        });
    }

    let (dest, local_addr) = match connector.connect(&request.dest) {
        Ok(conn) => conn,
        Err(err) => {
            error!("connect error: {}", err);
            stream.write_all(&reply(ResultCode::Rejected))?;
            return Err(err);
        }
    };
    info!("connected: {}: {}", request.dest, local_addr);

    stream.write_all(&reply(ResultCode::Granted))?;

    relay::run(stream, dest)
}
