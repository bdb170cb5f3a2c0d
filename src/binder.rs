use std::io;
use std::net::{SocketAddr, TcpListener};

use crate::error::{Error, Result};

/// Turn a listen address into a ready listener.
///
/// The server core only ever consumes listeners built elsewhere; this is the
/// collaborator the daemon uses for plain TCP listen addresses.
pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket
        .set_reuse_address(true)
        .map_err(|err| addr_error(err, addr))?;
    socket.bind(&addr.into()).map_err(|err| addr_error(err, addr))?;

    // `backlog` is passed straight to listen(2). If it is too small, clients
    // may fail to connect(2) under load; keep it near net.core.somaxconn.
    socket.listen(256)?;

    Ok(socket.into())
}

fn addr_error(io_err: io::Error, addr: SocketAddr) -> Error {
    match io_err.kind() {
        io::ErrorKind::AddrInUse => Error::AddressAlreadyInUse { addr },
        io::ErrorKind::AddrNotAvailable => Error::AddressNotAvailable { addr },
        _ => io_err.into(),
    }
}
