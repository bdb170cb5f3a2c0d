use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::ops::Deref;

use crate::error::Error;

/// read/write operations on byte stream
///
/// `Sync` because `shutdown` may be called from either relay direction.
pub trait ByteStream: fmt::Debug + io::Read + io::Write + Send + Sync {
    #[allow(clippy::type_complexity)]
    fn split(&self) -> Result<(Box<dyn io::Read + Send>, Box<dyn io::Write + Send>), Error>;

    /// tear down both directions; must be safe to call more than once
    fn shutdown(&self) -> io::Result<()>;
}

/// byte stream on tcp connection
impl ByteStream for TcpStream {
    #[allow(clippy::type_complexity)]
    fn split(&self) -> Result<(Box<dyn io::Read + Send>, Box<dyn io::Write + Send>), Error> {
        let rd = self.try_clone()?;
        let wr = self.try_clone()?;
        Ok((Box::new(rd), Box::new(wr)))
    }

    fn shutdown(&self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            // the peer or the other relay direction may already have closed it
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// Boxed stream
impl<S: ByteStream> ByteStream for Box<S> {
    #[allow(clippy::type_complexity)]
    fn split(&self) -> Result<(Box<dyn io::Read + Send>, Box<dyn io::Write + Send>), Error> {
        self.deref().split()
    }

    fn shutdown(&self) -> io::Result<()> {
        self.deref().shutdown()
    }
}
