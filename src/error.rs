use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync;

use thiserror::Error;

use crate::model::Address;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {}", message)]
    Config { message: String },
    #[error("poisoned lock: {}", _0)]
    Poisoned(String),
    #[error("message format error: {}", message)]
    MessageFormat { message: String },
    #[error("unsupported protocol version: {}", _0)]
    Version(u8),
    #[error("authentication error: no acceptable method")]
    NoAcceptableMethod,
    #[error("command not supported: {:#04x}", cmd)]
    CommandNotSupported { cmd: u8 },
    #[error("address type not supported: {:#04x}", atyp)]
    AddrTypeNotSupported { atyp: u8 },
    #[error("name not resolved: {}:{}", domain, port)]
    DomainNotResolved { domain: String, port: u16 },
    #[error("host unreachable: {}", addr)]
    HostUnreachable { addr: Address },
    #[error("network unreachable: {}", addr)]
    NetworkUnreachable { addr: Address },
    #[error("connection refused: {}", addr)]
    ConnectionRefused { addr: Address },
    #[error("connection timed out: {}", addr)]
    ConnectionTimedOut { addr: Address },
    #[error("address already in use: {}", addr)]
    AddressAlreadyInUse { addr: SocketAddr },
    #[error("address not available: {}", addr)]
    AddressNotAvailable { addr: SocketAddr },
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn message_fmt(message: fmt::Arguments) -> Self {
        Self::MessageFormat {
            message: message.to_string(),
        }
    }
}

impl<T: fmt::Debug> From<sync::PoisonError<T>> for Error {
    fn from(error: sync::PoisonError<T>) -> Self {
        Error::Poisoned(format!("{:?}", error))
    }
}
