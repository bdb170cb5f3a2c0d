use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::*;

use crate::byte_stream::ByteStream;
use crate::config::ServerConfig;
use crate::connector::{Connector, TcpConnector};
use crate::error::{Error, Result};
use crate::peek_stream::PeekStream;
use crate::socks4;
use crate::socks5;
use crate::tcp_listener_ext::TcpListenerExt;
use crate::thread::spawn_thread;

/// The proxy service: accepts client connections on any number of listeners
/// and speaks SOCKS4(A) or SOCKS5 with each of them.
///
/// Listeners are handed in ready-made via [`SocksServer::serve`]; the server
/// owns them from then on and [`SocksServer::close`] tears them all down.
pub struct SocksServer<C = TcpConnector> {
    /// listeners currently served; shared with nobody but guarded because
    /// `serve` and `close` may run from different threads
    listeners: Arc<Mutex<Vec<TcpListener>>>,
    connector: C,
    client_rw_timeout: Option<Duration>,
}

impl SocksServer<TcpConnector> {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let local_addr = config
            .bind
            .as_deref()
            .map(resolve_bind_addr)
            .transpose()?;

        Ok(Self::with_connector(
            TcpConnector::new(local_addr, config.server_rw_timeout),
            config.client_rw_timeout,
        ))
    }
}

/// resolve the configured source address the way a listen address would be,
/// with a wildcard port
fn resolve_bind_addr(bind: &str) -> Result<SocketAddr> {
    (bind, 0u16)
        .to_socket_addrs()
        .map_err(|err| Error::config(format!("bind address {:?}: {}", bind, err)))?
        .next()
        .ok_or_else(|| Error::config(format!("bind address {:?} did not resolve", bind)))
}

impl<C> SocksServer<C>
where
    C: Connector + Clone + 'static,
{
    pub fn with_connector(connector: C, client_rw_timeout: Option<Duration>) -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            connector,
            client_rw_timeout,
        }
    }

    /// Registers `listener` and starts accepting from it in the background.
    ///
    /// Returns as soon as the accept loop is running. The loop survives
    /// transient accept failures and exits on any other error without
    /// affecting sibling listeners.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let acceptor = listener.try_clone()?;
        self.listeners.lock()?.push(listener);

        let connector = self.connector.clone();
        let rw_timeout = self.client_rw_timeout;
        spawn_thread("acceptor", move || {
            accept_loop(acceptor, connector, rw_timeout)
        })?;
        Ok(())
    }

    /// Closes every registered listener, best-effort.
    ///
    /// Failures do not stop the remaining listeners from being closed; the
    /// last error observed is the one returned.
    pub fn close(&self) -> Result<()> {
        let mut listeners = self.listeners.lock()?;
        let mut last_err = None;
        for listener in listeners.drain(..) {
            if let Err(err) = TcpListenerExt::shutdown(&listener) {
                warn!("close listener: {}", err);
                last_err = Some(err);
            }
        }
        match last_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

fn accept_loop<C>(listener: TcpListener, connector: C, rw_timeout: Option<Duration>)
where
    C: Connector + Clone + 'static,
{
    loop {
        match listener.accept() {
            Ok((conn, addr)) => {
                debug!("accepted: {}", addr);
                if let Err(err) = conn
                    .set_read_timeout(rw_timeout)
                    .and_then(|_| conn.set_write_timeout(rw_timeout))
                {
                    warn!("set timeout: {}: {}", addr, err);
                    continue;
                }
                let connector = connector.clone();
                let spawned = spawn_thread("handler", move || {
                    handle_connection(&connector, conn, addr)
                });
                if let Err(err) = spawned {
                    error!("spawn handler: {}: {}", addr, err);
                }
            }
            Err(err) if is_transient(&err) => {
                debug!("accept error: {}", err);
            }
            Err(err) => {
                info!("accept loop terminated: {}", err);
                return;
            }
        }
    }
}

/// accept failures worth retrying; everything else ends the loop
fn is_transient(err: &io::Error) -> bool {
    use io::ErrorKind as K;
    match err.kind() {
        K::ConnectionAborted | K::ConnectionReset | K::Interrupted | K::WouldBlock | K::TimedOut => {
            true
        }
        // descriptor and buffer pressure passes; a closed listener does not
        _ => matches!(
            err.raw_os_error(),
            Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOBUFS) | Some(libc::ENOMEM)
        ),
    }
}

/// Outermost failure boundary of one client connection.
///
/// The stream is closed on every exit path; errors never travel further up.
pub fn handle_connection<C, S>(connector: &C, conn: S, addr: SocketAddr)
where
    C: Connector,
    S: ByteStream + 'static,
{
    if let Err(err) = dispatch(connector, PeekStream::new(conn)) {
        info!("connection closed: {}: {}", addr, err);
    }
}

/// route on the protocol version nibble without consuming it
fn dispatch<C, S>(connector: &C, mut stream: PeekStream<S>) -> Result<()>
where
    C: Connector,
    S: ByteStream + 'static,
{
    let version = stream.peek(1).map(|buf| buf[0])?;
    match version {
        socks4::VERSION => socks4::handle(stream, connector),
        socks5::VERSION => socks5::handle(stream, connector),
        // an unrecognized protocol gets no reply at all
        version => Err(Error::Version(version)),
    }
}
