//! Host-facing device status and event notifications

use std::path::PathBuf;

/// Device status as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// No session
    Disconnected,
    /// Session thread running, no reply from the engine yet
    Connecting,
    /// Engine traffic observed, identify echo still outstanding
    Connected,
    /// Identify echo received, device is usable
    Ready,
}

/// Callbacks from the session toward the host.
///
/// All methods default to no-ops so hosts implement only what they consume.
/// Invoked from the session thread; implementations must not block for long.
pub trait SessionEvents: Send + Sync {
    /// Device reached READY (identify echo received)
    fn on_connected(&self) {}

    /// Session ended, cleanly or fatally. Fired exactly once per session.
    fn on_disconnected(&self) {}

    /// Engine confirmed recording start
    fn record_start_confirmed(&self, timecode: &str) {
        let _ = timecode;
    }

    /// Engine confirmed recording stop; `paths` lists output files when the
    /// engine reports them (this engine reports none)
    fn record_stop_confirmed(&self, timecode: &str, paths: &[PathBuf]) {
        let _ = (timecode, paths);
    }
}

/// No-op event sink
pub struct NullEvents;

impl SessionEvents for NullEvents {}

/// Session events as plain values, for channel-based consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected,
    Disconnected,
    RecordStartConfirmed { timecode: String },
    RecordStopConfirmed { timecode: String, paths: Vec<PathBuf> },
}

/// Channel sink: hosts that prefer polling a channel over implementing the
/// trait hand the sender to the device and read [`DeviceEvent`]s off the
/// receiver. A dropped receiver silently discards events.
impl SessionEvents for crossbeam_channel::Sender<DeviceEvent> {
    fn on_connected(&self) {
        let _ = self.send(DeviceEvent::Connected);
    }

    fn on_disconnected(&self) {
        let _ = self.send(DeviceEvent::Disconnected);
    }

    fn record_start_confirmed(&self, timecode: &str) {
        let _ = self.send(DeviceEvent::RecordStartConfirmed {
            timecode: timecode.to_string(),
        });
    }

    fn record_stop_confirmed(&self, timecode: &str, paths: &[PathBuf]) {
        let _ = self.send(DeviceEvent::RecordStopConfirmed {
            timecode: timecode.to_string(),
            paths: paths.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let events: &dyn SessionEvents = &tx;

        events.on_connected();
        events.record_start_confirmed("00:00:01:15");
        events.on_disconnected();

        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Connected);
        assert_eq!(
            rx.try_recv().unwrap(),
            DeviceEvent::RecordStartConfirmed {
                timecode: "00:00:01:15".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Disconnected);
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (tx, rx) = crossbeam_channel::unbounded::<DeviceEvent>();
        drop(rx);
        let events: &dyn SessionEvents = &tx;
        events.on_disconnected();
    }
}
