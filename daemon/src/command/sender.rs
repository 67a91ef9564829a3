//! One-shot TCP delivery of encoded commands.
//!
//! Every send opens its own connection, writes the message, and closes. No
//! pooling, no retry, no response read.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, error};

use crate::error::Error;

/// Sends command messages with bounded connect and write times.
#[derive(Debug, Clone, Copy)]
pub struct CommandSender {
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl CommandSender {
    pub fn new(connect_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            write_timeout,
        }
    }

    /// Deliver `message` to `host:port`. Failures are logged and reported as
    /// `false`; the caller decides whether to retry.
    pub fn send(&self, host: &str, port: u16, message: &[u8]) -> bool {
        match self.try_send(host, port, message) {
            Ok(addr) => {
                debug!(%addr, message = %String::from_utf8_lossy(message), "Sent command");
                true
            }
            Err(Error::ConnectionTimeout { addr }) => {
                error!(
                    %addr,
                    message = %String::from_utf8_lossy(message),
                    "Could not send command, host timed out"
                );
                false
            }
            Err(e) => {
                error!(
                    host,
                    port,
                    message = %String::from_utf8_lossy(message),
                    error = %e,
                    "Could not send command"
                );
                false
            }
        }
    }

    /// Like [`CommandSender::send`] but returns the error. On success yields
    /// the address that accepted the message.
    pub fn try_send(&self, host: &str, port: u16, message: &[u8]) -> Result<SocketAddr, Error> {
        let target = format!("{host}:{port}");
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::Unresolvable(target.clone()))?
            .collect();

        let mut last_err = Error::Unresolvable(target);
        for addr in addrs {
            match self.send_to(&addr, message) {
                Ok(()) => return Ok(addr),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn send_to(&self, addr: &SocketAddr, message: &[u8]) -> Result<(), Error> {
        let mut stream = TcpStream::connect_timeout(addr, self.connect_timeout)
            .map_err(|e| Error::transport(addr, e))?;
        stream
            .set_write_timeout(Some(self.write_timeout))
            .map_err(|e| Error::transport(addr, e))?;
        stream
            .write_all(message)
            .and_then(|()| stream.flush())
            .map_err(|e| Error::transport(addr, e))?;
        // Peer may already have closed; the message is out either way.
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
