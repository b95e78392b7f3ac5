use std::path::PathBuf;

/// Per-session configuration assembled by the binary.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend host, e.g. `localhost:8000`. Channel endpoints derive from
    /// this at connect time.
    pub host: String,
    pub campaign_id: String,
    /// Directory holding the persisted draft slot.
    pub data_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let data_dir = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".scribe");
        Self {
            host: "localhost:8000".to_string(),
            campaign_id: "default".to_string(),
            data_dir,
        }
    }
}
