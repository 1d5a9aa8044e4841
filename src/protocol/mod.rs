//! Wire protocol for the recording engine's UDP command channel

mod element;
mod messages;

pub use element::Element;
pub use messages::{Request, RequestKind, Response};
