use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::settings::Settings;
use crate::versions::{VersionHistory, VersionId, VersionSnapshot, AUTO_SAVE};

/// Version history plus a debounced auto-capture timer for one tab.
///
/// `auto_save` needs a tokio runtime; every other call is synchronous. At
/// most one capture is pending at a time, and only the content from the last
/// `auto_save` before the quiet period elapses is ever captured. Dropping the
/// engine cancels the pending capture.
pub struct AutosaveEngine {
    history: Arc<Mutex<VersionHistory>>,
    pending: Option<JoinHandle<()>>,
    delay: Duration,
}

impl AutosaveEngine {
    pub fn new(initial_content: impl Into<String>) -> Self {
        Self::with_settings(initial_content, &Settings::default())
    }

    pub fn with_settings(initial_content: impl Into<String>, settings: &Settings) -> Self {
        Self {
            history: Arc::new(Mutex::new(VersionHistory::with_retention(
                initial_content,
                settings.max_versions,
            ))),
            pending: None,
            delay: settings.autosave_delay(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Capture immediately, bypassing the debounce timer.
    pub fn save_version(&self, content: &str, description: Option<&str>) -> Option<VersionId> {
        self.history
            .lock()
            .expect("version history mutex")
            .save_version(content, description)
    }

    /// Restart the quiet-period timer so that `content` is captured once edits stop.
    pub fn auto_save(&mut self, content: impl Into<String>) {
        self.cancel_pending();
        let content = content.into();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime for auto-save timer, capturing immediately");
            self.save_version(&content, Some(AUTO_SAVE));
            return;
        };

        let history = Arc::clone(&self.history);
        let deadline = Instant::now() + self.delay;
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let captured = history
                .lock()
                .expect("version history mutex")
                .save_version(&content, Some(AUTO_SAVE));
            if captured.is_some() {
                tracing::debug!("Auto-save captured after quiet period");
            }
        }));
    }

    /// Cancel the pending auto-save, if any. Returns true if one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::trace!("Cancelled pending auto-save");
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn restore_version(&self, version_id: &str) -> Option<String> {
        self.history
            .lock()
            .expect("version history mutex")
            .restore_version(version_id)
    }

    pub fn history(&self) -> Vec<VersionSnapshot> {
        self.history.lock().expect("version history mutex").history()
    }

    pub fn current_version(&self) -> Option<VersionSnapshot> {
        self.history
            .lock()
            .expect("version history mutex")
            .current_version()
            .cloned()
    }

    pub fn current_version_id(&self) -> VersionId {
        self.history
            .lock()
            .expect("version history mutex")
            .current_version_id()
            .to_string()
    }

    /// Content of the most recent capture.
    pub fn latest_content(&self) -> String {
        self.history
            .lock()
            .expect("version history mutex")
            .latest()
            .content
            .clone()
    }

    /// True once a save or auto-save has landed after the initial snapshot.
    pub fn has_captures(&self) -> bool {
        self.history.lock().expect("version history mutex").has_captures()
    }

    pub fn version_count(&self) -> usize {
        self.history.lock().expect("version history mutex").len()
    }
}

impl Drop for AutosaveEngine {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
