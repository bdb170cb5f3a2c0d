use std::io;
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;

use nix::sys::socket::Shutdown;

pub trait TcpListenerExt {
    /// shutdown(2) the listening socket
    ///
    /// Unlike dropping the listener, this reaches every handle cloned from
    /// the same descriptor: a blocked `accept(2)` wakes up with an error the
    /// accept loop treats as terminal.
    fn shutdown(&self) -> io::Result<()>;
}

impl TcpListenerExt for TcpListener {
    fn shutdown(&self) -> io::Result<()> {
        nix::sys::socket::shutdown(self.as_raw_fd(), Shutdown::Both)
            .map_err(|err| io::Error::from_raw_os_error(err as i32))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shutdown_wakes_accept() {
        use crate::thread::spawn_thread;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let acceptor = listener.try_clone().unwrap();
        let th = spawn_thread("accept", move || acceptor.accept()).unwrap();

        // accept(2) is blocking by the time shutdown lands, or shortly after
        std::thread::sleep(std::time::Duration::from_millis(100));
        listener.shutdown().unwrap();

        assert!(th.join().unwrap().is_err());
    }
}
