//! agentflow Protocol - Core types and message definitions
//!
//! Describes the JSON messages exchanged between the frontend and the
//! multi-agent workflow backend, and decodes inbound payloads into a closed
//! set of typed events.

pub mod constants;
pub mod error;
pub mod events;
pub mod messages;
pub mod types;

pub use constants::*;
pub use error::*;
pub use events::{decode_event, Decoded, InboundEvent, ResponseStatus};
pub use messages::OutboundMessage;
pub use types::*;
