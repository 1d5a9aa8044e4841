//! Request and response messages exchanged with the recording engine
//!
//! Requests are the four commands the client can issue; responses are the
//! acknowledgement tags the engine sends back. Acks correlate to requests by
//! tag only; the protocol has no request IDs.

use super::element::Element;
use crate::error::Result;

/// Command classification, kept alongside each queued wire message so the
/// session loop knows what it is sending without re-decoding its own bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Identify,
    StartRecording,
    StopRecording,
    CaptureName,
}

impl RequestKind {
    /// Wire tag for this request
    pub fn tag(&self) -> &'static str {
        match self {
            RequestKind::Identify => "IdentifyReq",
            RequestKind::StartRecording => "StartRecordingReq",
            RequestKind::StopRecording => "StopRecordingReq",
            RequestKind::CaptureName => "CaptureName",
        }
    }
}

/// Commands issued toward the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Heartbeat probe; also initiates the connection
    Identify,
    /// Begin recording a take
    StartRecording {
        session_name: String,
        description: String,
    },
    /// End the current recording
    StopRecording,
    /// Announce the slate name and take number for the next recording
    CaptureName { name: String, take: u32 },
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Identify => RequestKind::Identify,
            Request::StartRecording { .. } => RequestKind::StartRecording,
            Request::StopRecording => RequestKind::StopRecording,
            Request::CaptureName { .. } => RequestKind::CaptureName,
        }
    }

    /// Build the markup element for this request
    pub fn to_element(&self) -> Element {
        match self {
            Request::Identify => Element::new(RequestKind::Identify.tag()),
            Request::StartRecording {
                session_name,
                description,
            } => Element::new(RequestKind::StartRecording.tag())
                .attr("SessionName", session_name)
                .attr("Description", description),
            Request::StopRecording => Element::new(RequestKind::StopRecording.tag()),
            Request::CaptureName { name, take } => Element::new(RequestKind::CaptureName.tag())
                .child(Element::new("Name").attr("VALUE", name))
                .child(Element::new("Take").attr("VALUE", &take.to_string())),
        }
    }

    /// Encode this request as wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_element().encode()
    }
}

/// Acknowledgements received from the engine.
///
/// One variant per known tag plus `Unknown`, so dispatch is an exhaustive
/// match and adding a message kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    IdentifyAck(Element),
    StartRecordingAck(Element),
    StopRecordingAck(Element),
    CaptureNameAck(Element),
    Unknown(Element),
}

impl Response {
    /// Decode wire bytes into a classified response
    pub fn decode(bytes: &[u8]) -> Result<Response> {
        Ok(Response::from_element(Element::decode(bytes)?))
    }

    /// Classify a decoded element by tag
    pub fn from_element(element: Element) -> Response {
        match element.name.as_str() {
            "IdentifyAck" => Response::IdentifyAck(element),
            "StartRecordingAck" => Response::StartRecordingAck(element),
            "StopRecordingAck" => Response::StopRecordingAck(element),
            "CaptureNameAck" => Response::CaptureNameAck(element),
            _ => Response::Unknown(element),
        }
    }

    /// Tag name of the underlying element
    pub fn tag(&self) -> &str {
        match self {
            Response::IdentifyAck(el)
            | Response::StartRecordingAck(el)
            | Response::StopRecordingAck(el)
            | Response::CaptureNameAck(el)
            | Response::Unknown(el) => &el.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_encoding() {
        assert_eq!(Request::Identify.encode().unwrap(), b"<IdentifyReq/>");
    }

    #[test]
    fn test_start_recording_encoding() {
        let request = Request::StartRecording {
            session_name: "sceneA".to_string(),
            description: "desc".to_string(),
        };
        let element = Element::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(element.name, "StartRecordingReq");
        assert_eq!(element.get_attr("SessionName"), Some("sceneA"));
        assert_eq!(element.get_attr("Description"), Some("desc"));
    }

    #[test]
    fn test_capture_name_children() {
        let request = Request::CaptureName {
            name: "sceneA".to_string(),
            take: 3,
        };
        let element = Element::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(element.name, "CaptureName");
        assert_eq!(
            element.find_child("Name").and_then(|c| c.get_attr("VALUE")),
            Some("sceneA")
        );
        assert_eq!(
            element.find_child("Take").and_then(|c| c.get_attr("VALUE")),
            Some("3")
        );
    }

    #[test]
    fn test_response_classification() {
        let known = Response::decode(b"<StartRecordingAck/>").unwrap();
        assert!(matches!(known, Response::StartRecordingAck(_)));
        assert_eq!(known.tag(), "StartRecordingAck");

        let unknown = Response::decode(b"<FirmwareUpdateAck/>").unwrap();
        assert!(matches!(unknown, Response::Unknown(_)));
        assert_eq!(unknown.tag(), "FirmwareUpdateAck");
    }

    #[test]
    fn test_request_kind_tags() {
        assert_eq!(RequestKind::Identify.tag(), "IdentifyReq");
        assert_eq!(RequestKind::CaptureName.tag(), "CaptureName");
    }
}
