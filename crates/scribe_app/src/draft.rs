use std::fs;
use std::path::PathBuf;

use scribe_core::DraftSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_logging::{session_error, session_info, session_warn};

use crate::persist::AtomicFileWriter;

const DRAFT_FILENAME: &str = "draft.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDraft {
    current_step: u8,
    completed_steps: Vec<u8>,
    source_url: String,
    parsed_result: Option<Value>,
    timestamp_ms: u64,
}

/// The single named draft slot. Writes are last-write-wins; there is no
/// merging across concurrent sessions.
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn exists(&self) -> bool {
        self.dir.join(DRAFT_FILENAME).is_file()
    }

    pub fn save(&self, snapshot: &DraftSnapshot) {
        let draft = PersistedDraft {
            current_step: snapshot.current_step,
            completed_steps: snapshot.completed_steps.clone(),
            source_url: snapshot.source_url.clone(),
            parsed_result: snapshot.parsed_result.clone(),
            timestamp_ms: snapshot.timestamp_ms,
        };

        let pretty = ron::ser::PrettyConfig::new();
        let content = match ron::ser::to_string_pretty(&draft, pretty) {
            Ok(text) => text,
            Err(err) => {
                session_error!("Failed to serialize draft: {}", err);
                return;
            }
        };

        let writer = AtomicFileWriter::new(self.dir.clone());
        if let Err(err) = writer.write(DRAFT_FILENAME, &content) {
            session_error!("Failed to write draft to {:?}: {}", self.dir, err);
        }
    }

    /// Loads the persisted draft. A missing file is simply `None`; a
    /// corrupted one is logged and treated as absent.
    pub fn load(&self) -> Option<DraftSnapshot> {
        let path = self.dir.join(DRAFT_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return None;
            }
            Err(err) => {
                session_warn!("Failed to read draft from {:?}: {}", path, err);
                return None;
            }
        };

        let draft: PersistedDraft = match ron::from_str(&content) {
            Ok(draft) => draft,
            Err(err) => {
                session_warn!("Failed to parse draft from {:?}: {}", path, err);
                return None;
            }
        };

        session_info!("Loaded draft from {:?}", path);
        Some(DraftSnapshot {
            current_step: draft.current_step,
            completed_steps: draft.completed_steps,
            source_url: draft.source_url,
            parsed_result: draft.parsed_result,
            timestamp_ms: draft.timestamp_ms,
        })
    }

    pub fn clear(&self) {
        let path = self.dir.join(DRAFT_FILENAME);
        match fs::remove_file(&path) {
            Ok(()) => session_info!("Removed draft at {:?}", path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => session_warn!("Failed to remove draft at {:?}: {}", path, err),
        }
    }
}
