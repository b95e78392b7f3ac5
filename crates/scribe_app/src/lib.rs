//! Scribe app: session wiring between the pure core and the transport,
//! draft persistence, logging setup, and the CLI driver.
pub mod config;
pub mod draft;
pub mod effects;
pub mod logging;
pub mod persist;
pub mod session;

pub use config::SessionConfig;
pub use draft::DraftStore;
pub use session::Session;
