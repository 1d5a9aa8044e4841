//! Datagram transport layer
//!
//! The session loop talks to the engine through this trait so tests can run
//! against [`MockTransport`] instead of a real socket.

use crate::error::Result;
use std::time::Duration;

mod mock;
mod udp;

pub use mock::MockTransport;
pub use udp::UdpTransport;

/// Largest datagram the engine is expected to send
pub const MAX_DATAGRAM: usize = 4096;

/// Datagram transport for the engine's command channel
pub trait Transport: Send {
    /// Send one datagram to the remote endpoint
    fn send(&mut self, datagram: &[u8]) -> Result<usize>;

    /// Wait up to `timeout` for one datagram; `Ok(None)` when nothing
    /// arrived. A zero timeout polls without blocking.
    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<Option<usize>>;

    /// Drop any already-buffered inbound datagrams.
    ///
    /// Called before each send so a reply is never matched against a
    /// previous, possibly superseded request.
    fn discard_pending(&mut self) -> Result<()> {
        Ok(())
    }
}
