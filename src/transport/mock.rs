//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;
use std::io::{Error as IoError, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock datagram transport for unit and integration testing.
///
/// Clones share the same buffers, so a test can hold one handle while the
/// session loop owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    incoming: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    fail_sends: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram for the session loop to receive
    pub fn inject_datagram(&self, datagram: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.incoming.push_back(datagram.to_vec());
    }

    /// All datagrams sent so far, oldest first
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of datagrams sent so far
    pub fn sent_count(&self) -> usize {
        self.inner.lock().unwrap().sent.len()
    }

    /// Make every subsequent send fail with a broken-pipe error
    pub fn fail_sends(&self) {
        self.inner.lock().unwrap().fail_sends = true;
    }
}

impl Transport for MockTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            return Err(IoError::new(ErrorKind::BrokenPipe, "mock send failure").into());
        }
        inner.sent.push(datagram.to_vec());
        Ok(datagram.len())
    }

    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(datagram) = inner.incoming.pop_front() {
                    let len = datagram.len().min(buffer.len());
                    buffer[..len].copy_from_slice(&datagram[..len]);
                    return Ok(Some(len));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn discard_pending(&mut self) -> Result<()> {
        self.inner.lock().unwrap().incoming.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_and_receive() {
        let mut transport = MockTransport::new();
        transport.inject_datagram(b"<IdentifyAck/>");

        let mut buf = [0u8; 64];
        let len = transport
            .recv_timeout(&mut buf, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"<IdentifyAck/>");
        assert!(transport
            .recv_timeout(&mut buf, Duration::ZERO)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_sent_capture_and_failure_injection() {
        let mut transport = MockTransport::new();
        transport.send(b"one").unwrap();
        assert_eq!(transport.sent(), vec![b"one".to_vec()]);

        transport.fail_sends();
        assert!(transport.send(b"two").is_err());
        assert_eq!(transport.sent_count(), 1);
    }

    #[test]
    fn test_discard_pending_clears_backlog() {
        let mut transport = MockTransport::new();
        transport.inject_datagram(b"stale");
        transport.discard_pending().unwrap();

        let mut buf = [0u8; 16];
        assert!(transport
            .recv_timeout(&mut buf, Duration::ZERO)
            .unwrap()
            .is_none());
    }
}
