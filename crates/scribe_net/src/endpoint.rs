use url::Url;

use crate::error::NetError;

/// Builds channel endpoints from the runtime host, so the same build works
/// against local, LAN, and deployed backends.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    host: String,
}

impl EndpointResolver {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `ws://{host}/ws/character-creation`
    pub fn job_endpoint(&self) -> Result<Url, NetError> {
        self.build("/ws/character-creation")
    }

    /// `ws://{host}/ws/chat`
    pub fn chat_endpoint(&self) -> Result<Url, NetError> {
        self.build("/ws/chat")
    }

    fn build(&self, path: &str) -> Result<Url, NetError> {
        let host = self.host.trim_end_matches('/');
        let raw = if host.contains("://") {
            format!("{host}{path}")
        } else {
            format!("ws://{host}{path}")
        };
        Url::parse(&raw).map_err(|err| NetError::InvalidEndpoint(format!("{raw}: {err}")))
    }
}
