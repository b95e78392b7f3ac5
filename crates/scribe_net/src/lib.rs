//! Scribe net: duplex channel management for the import and chat
//! connections, typed frame codecs, and the sync bridge used by the
//! session layer.
mod channel;
mod endpoint;
mod error;
mod frame;
mod manager;
mod reconnect;
mod session;

pub use channel::Channel;
pub use endpoint::EndpointResolver;
pub use error::NetError;
pub use frame::{ChatFrame, ChatRequest, FeedbackData, JobFrame, JobRequest, StageKey};
pub use manager::{ConnectionManager, ImportPayload, NetConfig, NetEvent};
pub use reconnect::ReconnectPolicy;
pub use session::SessionNet;
