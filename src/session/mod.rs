//! Background session loop
//!
//! One session thread per connected device. The thread is the sole owner of
//! the transport: it drains the outbound queue (newest first), waits a
//! bounded time for replies after each send, keeps the link alive with
//! identify probes, and ends the session on inactivity or when the lifecycle
//! manager requests shutdown. Any transport error is fatal; recovery is a
//! fresh connect from the host.

mod dispatch;

use crate::error::Error;
use crate::events::{DeviceStatus, SessionEvents};
use crate::protocol::{Request, RequestKind};
use crate::queue::{CommandQueue, QueuedCommand};
use crate::transport::{Transport, MAX_DATAGRAM};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Bounded wait for replies after each send
pub const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Idle sleep when the outbound queue is empty
pub const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Inactivity threshold after which an identify probe is enqueued
pub const PING_INTERVAL: Duration = Duration::from_secs(1);

/// Inactivity threshold after which the session is considered lost
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Session timing knobs. Defaults are the engine protocol values; tests
/// compress them.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    pub read_timeout: Duration,
    pub idle_sleep: Duration,
    pub ping_interval: Duration,
    pub disconnect_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        SessionTiming {
            read_timeout: READ_TIMEOUT,
            idle_sleep: IDLE_SLEEP,
            ping_interval: PING_INTERVAL,
            disconnect_timeout: DISCONNECT_TIMEOUT,
        }
    }
}

/// State shared between the lifecycle manager and the session thread.
///
/// The manager only pushes commands, reads status, and sets `shutdown`;
/// everything else belongs to the loop.
pub(crate) struct SessionShared {
    pub queue: CommandQueue,
    pub shutdown: AtomicBool,
    /// True from connect until the loop has released the transport
    pub link_alive: AtomicBool,
    pub status: Mutex<DeviceStatus>,
}

impl SessionShared {
    pub fn new() -> Self {
        SessionShared {
            queue: CommandQueue::new(),
            shutdown: AtomicBool::new(false),
            link_alive: AtomicBool::new(false),
            status: Mutex::new(DeviceStatus::Disconnected),
        }
    }
}

/// Loop-private state. Owned exclusively by the session thread.
pub(crate) struct SessionState {
    /// At most one identify probe may be outstanding
    pub awaiting_identify: bool,
    /// Start request sent, ack not yet seen
    pub pending_start: bool,
    /// Stop request sent, ack not yet seen
    pub pending_stop: bool,
    /// Refreshed on every received datagram, valid or not
    pub last_activity: Instant,
}

impl SessionState {
    fn new() -> Self {
        SessionState {
            awaiting_identify: false,
            pending_start: false,
            pending_stop: false,
            last_activity: Instant::now(),
        }
    }

    fn note_sent(&mut self, kind: RequestKind) {
        match kind {
            RequestKind::StartRecording => self.pending_start = true,
            RequestKind::StopRecording => self.pending_stop = true,
            RequestKind::Identify | RequestKind::CaptureName => {}
        }
    }
}

/// Session lifecycle phases, loop-owned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Probe sent, nothing heard yet
    Connecting,
    /// Normal operation
    Connected,
    /// Shutdown requested, draining the queue before closing
    Disconnecting,
}

enum SessionEnd {
    Clean,
    Fatal(Error),
}

/// Spawn the session thread for a freshly opened transport
pub(crate) fn spawn_session(
    device: String,
    transport: Box<dyn Transport>,
    shared: Arc<SessionShared>,
    events: Arc<dyn SessionEvents>,
    timing: SessionTiming,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-session", device))
        .spawn(move || run_session(&device, transport, &shared, events.as_ref(), &timing))
}

fn run_session(
    device: &str,
    mut transport: Box<dyn Transport>,
    shared: &SessionShared,
    events: &dyn SessionEvents,
    timing: &SessionTiming,
) {
    let mut state = SessionState::new();
    let mut phase = Phase::Connecting;
    let mut buf = [0u8; MAX_DATAGRAM];

    log::info!("{}: session loop started", device);

    // The connection opens with an identify probe
    enqueue_identify(device, &shared.queue, &mut state);

    let end = loop {
        if let Some(command) = shared.queue.pop_newest() {
            // Drop replies to superseded requests before sending
            if let Err(e) = transport.discard_pending() {
                break SessionEnd::Fatal(e);
            }
            log::debug!(
                "{}: TX {} ({} bytes)",
                device,
                command.kind.tag(),
                command.bytes.len()
            );
            if let Err(e) = transport.send(&command.bytes) {
                break SessionEnd::Fatal(e);
            }
            state.note_sent(command.kind);

            match receive_replies(
                device,
                transport.as_mut(),
                &mut buf,
                shared,
                events,
                timing,
                &mut state,
            ) {
                Ok(received) => {
                    if received && phase == Phase::Connecting {
                        phase = Phase::Connected;
                    }
                }
                Err(e) => break SessionEnd::Fatal(e),
            }
        } else {
            thread::sleep(timing.idle_sleep);
        }

        let idle = state.last_activity.elapsed();
        if idle > timing.disconnect_timeout {
            break SessionEnd::Fatal(Error::SessionTimeout(timing.disconnect_timeout));
        } else if idle > timing.ping_interval {
            enqueue_identify(device, &shared.queue, &mut state);
        }

        if shared.shutdown.load(Ordering::Relaxed) {
            if phase != Phase::Disconnecting {
                phase = Phase::Disconnecting;
                log::debug!("{}: shutdown requested, draining queue", device);
            }
            if shared.queue.is_empty() {
                break SessionEnd::Clean;
            }
        }
    };

    // Release the transport before reporting: no sends can follow the
    // disconnect notification.
    drop(transport);
    shared.link_alive.store(false, Ordering::Relaxed);
    *shared.status.lock() = DeviceStatus::Disconnected;

    if state.pending_start || state.pending_stop {
        log::warn!(
            "{}: session ended with an unacknowledged recording command",
            device
        );
    }
    match end {
        SessionEnd::Clean => log::info!("{}: session closed", device),
        SessionEnd::Fatal(e) => log::warn!("{}: disconnecting due to: {}", device, e),
    }
    events.on_disconnected();
}

/// Wait up to the read timeout for a reply, then drain whatever else is
/// already buffered. Returns whether anything was received.
fn receive_replies(
    device: &str,
    transport: &mut dyn Transport,
    buf: &mut [u8],
    shared: &SessionShared,
    events: &dyn SessionEvents,
    timing: &SessionTiming,
    state: &mut SessionState,
) -> crate::error::Result<bool> {
    let mut received = false;
    let mut wait = timing.read_timeout;
    while let Some(len) = transport.recv_timeout(buf, wait)? {
        received = true;
        // Any datagram counts as liveness, even one that fails to parse
        state.last_activity = Instant::now();
        {
            let mut status = shared.status.lock();
            if *status == DeviceStatus::Connecting {
                *status = DeviceStatus::Connected;
            }
        }
        dispatch::dispatch(device, &buf[..len], state, shared, events);
        wait = Duration::ZERO;
    }
    Ok(received)
}

/// Enqueue an identify probe unless one is already outstanding
fn enqueue_identify(device: &str, queue: &CommandQueue, state: &mut SessionState) {
    if state.awaiting_identify {
        return;
    }
    match Request::Identify.encode() {
        Ok(bytes) => {
            state.awaiting_identify = true;
            queue.push(QueuedCommand {
                bytes,
                kind: RequestKind::Identify,
            });
            log::debug!("{}: identify probe enqueued", device);
        }
        Err(e) => log::error!("{}: failed to encode identify probe: {}", device, e),
    }
}
