use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stats::format_relative;

pub type VersionId = String;

pub const INITIAL_VERSION: &str = "Initial version";
pub const AUTO_SAVE: &str = "Auto-save";
pub const MANUAL_SAVE: &str = "Manual save";

/// Full-content capture of a document at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub id: VersionId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl VersionSnapshot {
    /// Short age label for a version picker ("Just now", "5m ago", ...).
    pub fn relative_label(&self, now: DateTime<Utc>) -> String {
        format_relative(self.timestamp, now)
    }
}

/// Linear snapshot history for one editing session.
///
/// Snapshots are kept in capture order. The current pointer names either the
/// latest capture or whatever the user last restored, and always refers to a
/// snapshot that is still in the list.
#[derive(Debug, Clone)]
pub struct VersionHistory {
    versions: Vec<VersionSnapshot>,
    current_id: VersionId,
    max_versions: Option<usize>,
    captured: bool,
}

impl VersionHistory {
    pub fn new(initial_content: impl Into<String>) -> Self {
        Self::with_retention(initial_content, None)
    }

    /// History that drops its oldest snapshots past `max_versions`.
    pub fn with_retention(initial_content: impl Into<String>, max_versions: Option<usize>) -> Self {
        let initial = VersionSnapshot {
            id: Uuid::new_v4().to_string(),
            content: initial_content.into(),
            timestamp: Utc::now(),
            description: INITIAL_VERSION.to_string(),
        };
        Self {
            current_id: initial.id.clone(),
            versions: vec![initial],
            max_versions: max_versions.map(|max| max.max(1)),
            captured: false,
        }
    }

    /// Capture `content` unless it matches the latest snapshot.
    ///
    /// Returns the id of the new snapshot, or None when nothing changed.
    pub fn save_version(&mut self, content: &str, description: Option<&str>) -> Option<VersionId> {
        if self.latest().content == content {
            tracing::trace!("Skipping version capture, content unchanged");
            return None;
        }

        let description = description.unwrap_or(AUTO_SAVE);
        Some(self.push_snapshot(content.to_string(), description.to_string(), Utc::now()))
    }

    fn push_snapshot(
        &mut self,
        content: String,
        description: String,
        timestamp: DateTime<Utc>,
    ) -> VersionId {
        let id = Uuid::new_v4().to_string();
        tracing::debug!(version_id = %id, description = %description, "Captured version");

        self.versions.push(VersionSnapshot {
            id: id.clone(),
            content,
            timestamp,
            description,
        });
        self.current_id = id.clone();
        self.captured = true;
        self.enforce_retention();
        id
    }

    fn enforce_retention(&mut self) {
        let Some(max) = self.max_versions else {
            return;
        };

        while self.versions.len() > max {
            let Some(oldest) = self.versions.iter().position(|v| v.id != self.current_id) else {
                break;
            };
            let dropped = self.versions.remove(oldest);
            tracing::trace!(version_id = %dropped.id, "Dropped version past retention limit");
        }
    }

    /// Point at `version_id` and hand back its content for the editor.
    pub fn restore_version(&mut self, version_id: &str) -> Option<String> {
        let version = self.versions.iter().find(|v| v.id == version_id)?;
        self.current_id = version.id.clone();
        tracing::debug!(version_id = %version_id, "Restored version");
        Some(version.content.clone())
    }

    /// All snapshots, newest first. Equal timestamps list the later capture first.
    pub fn history(&self) -> Vec<VersionSnapshot> {
        let mut versions: Vec<VersionSnapshot> = self.versions.iter().rev().cloned().collect();
        versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        versions
    }

    pub fn current_version(&self) -> Option<&VersionSnapshot> {
        self.versions.iter().find(|v| v.id == self.current_id)
    }

    pub fn current_version_id(&self) -> &str {
        &self.current_id
    }

    /// Most recently captured snapshot, regardless of the current pointer.
    pub fn latest(&self) -> &VersionSnapshot {
        self.versions
            .last()
            .expect("history always holds at least one snapshot")
    }

    /// Whether anything has been captured since the initial snapshot.
    pub fn has_captures(&self) -> bool {
        self.captured
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
