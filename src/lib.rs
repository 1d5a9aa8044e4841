//! MocapLink - control-channel client for a remote motion-capture recording
//! engine
//!
//! Maintains a live UDP command channel to the engine: identify handshake,
//! record start/stop, take naming, and heartbeat-based liveness with an
//! inactivity timeout. The host application constructs a [`MocapRemote`],
//! receives state changes through [`SessionEvents`], and drives recording
//! through the command methods; everything protocol-side runs on a dedicated
//! background session thread.

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod timecode;
pub mod transport;

// Re-export commonly used types
pub use config::MocapConfig;
pub use device::MocapRemote;
pub use error::{Error, Result};
pub use events::{DeviceEvent, DeviceStatus, NullEvents, SessionEvents};
pub use session::SessionTiming;
