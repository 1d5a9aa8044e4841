//! Response dispatcher
//!
//! Routes decoded acknowledgements to device-state transitions and host
//! callbacks. Parse failures and unknown tags are observability events, not
//! session failures.

use super::{SessionShared, SessionState};
use crate::error::Error;
use crate::events::{DeviceStatus, SessionEvents};
use crate::protocol::Response;
use crate::timecode;

pub(crate) fn dispatch(
    device: &str,
    datagram: &[u8],
    state: &mut SessionState,
    shared: &SessionShared,
    events: &dyn SessionEvents,
) {
    let response = match Response::decode(datagram) {
        Ok(response) => response,
        Err(e) => {
            log::error!(
                "{}: could not parse message {:?}: {}",
                device,
                String::from_utf8_lossy(datagram),
                e
            );
            return;
        }
    };

    match response {
        Response::IdentifyAck(_) => {
            state.awaiting_identify = false;
            let newly_ready = {
                let mut status = shared.status.lock();
                if *status == DeviceStatus::Ready {
                    false
                } else {
                    *status = DeviceStatus::Ready;
                    true
                }
            };
            if newly_ready {
                log::info!("{}: identify echo received, device ready", device);
                events.on_connected();
            }
        }
        Response::StartRecordingAck(_) => {
            state.pending_start = false;
            let timecode = timecode::now();
            log::info!("{}: recording started at {}", device, timecode);
            events.record_start_confirmed(&timecode);
        }
        Response::StopRecordingAck(_) => {
            state.pending_stop = false;
            let timecode = timecode::now();
            log::info!("{}: recording stopped at {}", device, timecode);
            events.record_stop_confirmed(&timecode, &[]);
        }
        Response::CaptureNameAck(_) => {
            log::debug!("{}: take name acknowledged", device);
        }
        Response::Unknown(element) => {
            log::warn!("{}: {}", device, Error::UnrecognizedResponse(element.name));
        }
    }
}
