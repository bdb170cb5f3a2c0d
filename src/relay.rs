use std::io;
use std::sync::Arc;

use log::*;

use crate::byte_stream::ByteStream;
use crate::error::Error;
use crate::thread::spawn_thread;

/// Relay bytes between `client` and `dest` until either direction ends.
///
/// A spawned thread copies dest -> client while the calling thread copies
/// client -> dest. Whichever direction finishes first, EOF or error, shuts
/// down both endpoints; that unblocks the opposite copy, so both directions
/// are torn down together. Returns once the spawned thread has been joined,
/// reporting an error if either direction failed.
pub fn run<C, D>(client: C, dest: D) -> Result<(), Error>
where
    C: ByteStream + 'static,
    D: ByteStream + 'static,
{
    let (mut client_rd, mut client_wr) = client.split()?;
    let (mut dest_rd, mut dest_wr) = dest.split()?;
    let client = Arc::new(client);
    let dest = Arc::new(dest);

    let incoming_th = {
        let client = client.clone();
        let dest = dest.clone();
        spawn_thread("incoming", move || {
            let result = io::copy(&mut dest_rd, &mut client_wr);
            client.shutdown().ok();
            dest.shutdown().ok();
            finish("incoming", result)
        })?
    };

    let outbound = {
        let result = io::copy(&mut client_rd, &mut dest_wr);
        client.shutdown().ok();
        dest.shutdown().ok();
        finish("outbound", result)
    };

    let incoming = incoming_th
        .join()
        .map_err(|err| Error::message_fmt(format_args!("relay thread panicked: {:?}", err)))?;

    outbound.and(incoming)
}

fn finish(name: &str, result: io::Result<u64>) -> Result<(), Error> {
    match result {
        Ok(size) => {
            debug!("relay finished: {}: {} bytes", name, size);
            Ok(())
        }
        // the other direction tearing the sockets down surfaces here
        Err(err) if interrupted_by_shutdown(&err) => {
            debug!("relay stopped: {}: {}", name, err);
            Ok(())
        }
        Err(err) => {
            info!("relay error: {}: {}", name, err);
            Err(err.into())
        }
    }
}

fn interrupted_by_shutdown(err: &io::Error) -> bool {
    use io::ErrorKind as K;
    matches!(
        err.kind(),
        K::ConnectionReset | K::ConnectionAborted | K::BrokenPipe | K::NotConnected
    )
}
