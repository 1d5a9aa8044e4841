//! Device lifecycle manager and host-facing command API

use crate::config::MocapConfig;
use crate::error::Result;
use crate::events::{DeviceStatus, SessionEvents};
use crate::protocol::Request;
use crate::queue::QueuedCommand;
use crate::session::{self, SessionShared, SessionTiming};
use crate::transport::{Transport, UdpTransport};

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Handle to a running session
struct SessionHandle {
    thread: JoinHandle<()>,
    shared: Arc<SessionShared>,
}

/// Client for a remote motion-capture recording engine.
///
/// Owns the connection lifecycle and exposes the command surface the host
/// calls. All protocol work happens on the background session thread; command
/// methods only encode and enqueue.
pub struct MocapRemote {
    name: String,
    config: MocapConfig,
    timing: SessionTiming,
    events: Arc<dyn SessionEvents>,
    /// Forward record-start intents to the engine
    trigger_start: bool,
    /// Forward record-stop intents to the engine
    trigger_stop: bool,
    slate: String,
    take: u32,
    session: Option<SessionHandle>,
}

impl MocapRemote {
    pub fn new(config: MocapConfig, events: Arc<dyn SessionEvents>) -> Self {
        MocapRemote {
            name: config.device.name.clone(),
            config,
            timing: SessionTiming::default(),
            events,
            trigger_start: true,
            trigger_stop: true,
            slate: "slate".to_string(),
            take: 1,
            session: None,
        }
    }

    /// Override the session timing (tests compress it)
    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Open the control channel and start the session loop.
    ///
    /// No-op when already connected. A previous session's queued commands are
    /// not carried over; a stale start/stop is never re-sent after
    /// reconnection.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            log::debug!("{}: already connected", self.name);
            return Ok(());
        }
        let remote = self.config.remote_addr()?;
        let transport = UdpTransport::open(remote)?;
        log::info!(
            "{}: control channel {} -> {}",
            self.name,
            transport.local_addr()?,
            remote
        );
        self.start_session(Box::new(transport))
    }

    /// Connect over an injected transport (tests, simulation)
    pub fn connect_with<T: Transport + 'static>(&mut self, transport: T) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.start_session(Box::new(transport))
    }

    fn start_session(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        // A dead handle from a timed-out session may still be around
        if let Some(stale) = self.session.take() {
            let _ = stale.thread.join();
        }

        let shared = Arc::new(SessionShared::new());
        *shared.status.lock() = DeviceStatus::Connecting;
        shared.link_alive.store(true, Ordering::Relaxed);

        let thread = session::spawn_session(
            self.name.clone(),
            transport,
            Arc::clone(&shared),
            Arc::clone(&self.events),
            self.timing.clone(),
        )?;
        self.session = Some(SessionHandle { thread, shared });
        Ok(())
    }

    /// Request shutdown and block until the session loop has exited.
    ///
    /// No-op when not connected. The loop itself reports the disconnected
    /// state to the host.
    pub fn disconnect(&mut self) {
        let Some(handle) = self.session.take() else {
            log::debug!("{}: not connected", self.name);
            return;
        };
        handle.shared.shutdown.store(true, Ordering::Relaxed);
        if handle.thread.join().is_err() {
            log::error!("{}: session thread panicked during shutdown", self.name);
        }
    }

    /// True iff the session loop currently holds the socket
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|handle| handle.shared.link_alive.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn status(&self) -> DeviceStatus {
        self.session
            .as_ref()
            .map(|handle| *handle.shared.status.lock())
            .unwrap_or(DeviceStatus::Disconnected)
    }

    /// Ask the engine to start recording a take
    pub fn record_start(&mut self, slate: &str, take: u32, description: &str) -> Result<()> {
        if !self.trigger_start {
            log::debug!("{}: start trigger disabled, ignoring record start", self.name);
            return Ok(());
        }
        log::info!(
            "{}: requesting record start, slate {:?} take {}",
            self.name,
            slate,
            take
        );
        self.send_request(&Request::StartRecording {
            session_name: slate.to_string(),
            description: description.to_string(),
        })
    }

    /// Ask the engine to stop the current recording
    pub fn record_stop(&mut self) -> Result<()> {
        if !self.trigger_stop {
            log::debug!("{}: stop trigger disabled, ignoring record stop", self.name);
            return Ok(());
        }
        log::info!("{}: requesting record stop", self.name);
        self.send_request(&Request::StopRecording)
    }

    /// Announce a new slate name and take number to the engine
    pub fn set_take(&mut self, name: &str, number: u32) -> Result<()> {
        self.slate = name.to_string();
        self.take = number;
        self.send_request(&Request::CaptureName {
            name: name.to_string(),
            take: number,
        })
    }

    pub fn slate(&self) -> &str {
        &self.slate
    }

    pub fn take_number(&self) -> u32 {
        self.take
    }

    pub fn set_trigger_start(&mut self, enabled: bool) {
        self.trigger_start = enabled;
    }

    pub fn set_trigger_stop(&mut self, enabled: bool) {
        self.trigger_stop = enabled;
    }

    /// Encode and enqueue; commands while disconnected are dropped
    fn send_request(&self, request: &Request) -> Result<()> {
        let live = self
            .session
            .as_ref()
            .filter(|handle| handle.shared.link_alive.load(Ordering::Relaxed));
        let Some(handle) = live else {
            log::debug!(
                "{}: not connected, dropping {}",
                self.name,
                request.kind().tag()
            );
            return Ok(());
        };
        let bytes = request.encode()?;
        handle.shared.queue.push(QueuedCommand {
            bytes,
            kind: request.kind(),
        });
        Ok(())
    }
}

impl Drop for MocapRemote {
    fn drop(&mut self) {
        if self.session.is_some() {
            log::debug!("{}: shutting down session on drop", self.name);
            self.disconnect();
        }
    }
}
