//! Editing core for the Notura markdown notes app: open tabs with a
//! session-persisted selection, and per-tab version history with debounced
//! auto-save.

pub mod autosave;
pub mod logging;
pub mod session;
pub mod settings;
pub mod stats;
pub mod store;
pub mod tabs;
pub mod versions;

pub use autosave::AutosaveEngine;
pub use session::{EditorSession, SaveOutcome};
pub use settings::Settings;
pub use stats::DocumentStats;
pub use store::{MemorySessionStore, SessionStore, StoreError};
pub use tabs::{Tab, TabId, TabRegistry};
pub use versions::{VersionHistory, VersionId, VersionSnapshot};
