//! UDP transport bound to an ephemeral local port

use super::Transport;
use crate::error::Result;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// UDP datagram transport targeting a fixed remote endpoint.
///
/// The local port is OS-assigned. Datagrams arriving from any other source
/// address are ignored.
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local endpoint targeting `remote`
    pub fn open(remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        Ok(UdpTransport { socket, remote })
    }

    /// Local address the OS assigned
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn is_timeout(kind: ErrorKind) -> bool {
        matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<usize> {
        Ok(self.socket.send_to(datagram, self.remote)?)
    }

    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        if timeout.is_zero() {
            // Non-blocking poll
            self.socket.set_nonblocking(true)?;
            let result = loop {
                match self.socket.recv_from(buffer) {
                    Ok((len, src)) if src.ip() == self.remote.ip() => break Ok(Some(len)),
                    Ok(_) => continue, // foreign sender, keep draining
                    Err(e) if Self::is_timeout(e.kind()) => break Ok(None),
                    Err(e) => break Err(e.into()),
                }
            };
            self.socket.set_nonblocking(false)?;
            return result;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.socket.set_read_timeout(Some(remaining))?;
            match self.socket.recv_from(buffer) {
                Ok((len, src)) if src.ip() == self.remote.ip() => return Ok(Some(len)),
                Ok(_) => continue, // foreign sender, wait out the remainder
                Err(e) if Self::is_timeout(e.kind()) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn discard_pending(&mut self) -> Result<()> {
        let mut scratch = [0u8; super::MAX_DATAGRAM];
        self.socket.set_nonblocking(true)?;
        let result = loop {
            match self.socket.recv_from(&mut scratch) {
                Ok(_) => continue,
                Err(e) if Self::is_timeout(e.kind()) => break Ok(()),
                Err(e) => break Err(e.into()),
            }
        };
        self.socket.set_nonblocking(false)?;
        result
    }
}
