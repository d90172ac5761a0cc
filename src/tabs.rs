use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::Settings;
use crate::store::SessionStore;

pub type TabId = String;

/// One open document in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub content: String,
    pub is_dirty: bool,
}

/// Ordered set of open tabs, the active selection, and dirty flags.
///
/// Every mutation is written through to the session store so that a registry
/// rebuilt against the same store comes back in the same state. Store
/// failures are logged and never reach the caller.
pub struct TabRegistry<S: SessionStore> {
    tabs: Vec<Tab>,
    active_tab_id: Option<TabId>,
    store: S,
    default_title: String,
    tabs_key: String,
    active_key: String,
}

impl<S: SessionStore> TabRegistry<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, &Settings::default())
    }

    /// Restore from `store`, or start empty if nothing usable is stored.
    pub fn with_settings(store: S, settings: &Settings) -> Self {
        let mut registry = Self {
            tabs: Vec::new(),
            active_tab_id: None,
            store,
            default_title: settings.default_tab_title.clone(),
            tabs_key: settings.tabs_storage_key.clone(),
            active_key: settings.active_tab_storage_key.clone(),
        };

        if let Some((tabs, active_tab_id)) = registry.load_from_store() {
            tracing::debug!(count = tabs.len(), "Restored tabs from session");
            registry.tabs = tabs;
            registry.active_tab_id = active_tab_id;
        }

        registry
    }

    fn load_from_store(&self) -> Option<(Vec<Tab>, Option<TabId>)> {
        let saved_tabs = match self.store.get_item(&self.tabs_key) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load tabs from storage");
                return None;
            }
        };
        let saved_active = match self.store.get_item(&self.active_key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load active tab from storage");
                return None;
            }
        };

        let tabs: Vec<Tab> = match serde_json::from_str(&saved_tabs) {
            Ok(tabs) => tabs,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable tab session");
                return None;
            }
        };

        if tabs.is_empty() && saved_active.is_empty() {
            return Some((tabs, None));
        }

        if !tabs.iter().any(|tab| tab.id == saved_active) {
            tracing::warn!(active = %saved_active, "Stored active tab is not among stored tabs, discarding session");
            return None;
        }

        Some((tabs, Some(saved_active)))
    }

    fn persist(&self) {
        let tabs_json = match serde_json::to_string(&self.tabs) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize tabs");
                return;
            }
        };
        let active = self.active_tab_id.as_deref().unwrap_or("");
        let previous_tabs = self.store.get_item(&self.tabs_key).ok().flatten();

        if let Err(e) = self.store.set_item(&self.tabs_key, &tabs_json) {
            tracing::warn!(error = %e, "Failed to save tabs to storage");
            return;
        }

        if let Err(e) = self.store.set_item(&self.active_key, active) {
            tracing::warn!(error = %e, "Failed to save active tab, rolling back stored tabs");
            // Keep the stored pair consistent with the last good write
            let rollback = match previous_tabs {
                Some(previous) => self.store.set_item(&self.tabs_key, &previous),
                None => self.store.remove_item(&self.tabs_key),
            };
            if let Err(e) = rollback {
                tracing::warn!(error = %e, "Failed to roll back stored tabs");
            }
        }
    }

    fn find_mut(&mut self, tab_id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.id == tab_id)
    }

    pub fn create_tab(&mut self, title: Option<&str>, content: Option<&str>) -> TabId {
        let id = Uuid::new_v4().to_string();
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(self.default_title.as_str())
            .to_string();

        self.tabs.push(Tab {
            id: id.clone(),
            title,
            content: content.unwrap_or_default().to_string(),
            is_dirty: false,
        });
        self.active_tab_id = Some(id.clone());
        tracing::debug!(tab_id = %id, "Created tab");

        self.persist();
        id
    }

    pub fn create_blank_tab(&mut self) -> TabId {
        self.create_tab(None, None)
    }

    /// Copy `tab_id` into a new, dirty, active tab titled "<title> (Copy)".
    pub fn duplicate_tab(&mut self, tab_id: &str) -> Option<TabId> {
        let source = self.get_tab(tab_id)?.clone();
        let id = Uuid::new_v4().to_string();

        self.tabs.push(Tab {
            id: id.clone(),
            title: format!("{} (Copy)", source.title),
            content: source.content,
            is_dirty: true,
        });
        self.active_tab_id = Some(id.clone());
        tracing::debug!(source = %tab_id, tab_id = %id, "Duplicated tab");

        self.persist();
        Some(id)
    }

    pub fn close_tab(&mut self, tab_id: &str) {
        let before = self.tabs.len();
        self.tabs.retain(|tab| tab.id != tab_id);
        if self.tabs.len() == before {
            return;
        }

        if self.active_tab_id.as_deref() == Some(tab_id) {
            self.active_tab_id = self.tabs.first().map(|tab| tab.id.clone());
        }
        tracing::debug!(tab_id = %tab_id, "Closed tab");

        self.persist();
    }

    /// Point the active selection at `tab_id`. The id is not validated.
    pub fn select_tab(&mut self, tab_id: &str) {
        if self.get_tab(tab_id).is_none() {
            tracing::warn!(tab_id = %tab_id, "Selecting a tab that is not open");
        }
        self.active_tab_id = Some(tab_id.to_string());
        self.persist();
    }

    pub fn update_tab_content(&mut self, tab_id: &str, content: &str) {
        let Some(tab) = self.find_mut(tab_id) else {
            return;
        };
        tab.content = content.to_string();
        tab.is_dirty = true;
        self.persist();
    }

    pub fn update_tab_title(&mut self, tab_id: &str, title: &str) {
        let Some(tab) = self.find_mut(tab_id) else {
            return;
        };
        tab.title = title.to_string();
        self.persist();
    }

    pub fn mark_tab_saved(&mut self, tab_id: &str) {
        let Some(tab) = self.find_mut(tab_id) else {
            return;
        };
        tab.is_dirty = false;
        self.persist();
    }

    /// Drop both stored entries and every open tab.
    pub fn clear_session(&mut self) {
        for key in [&self.tabs_key, &self.active_key] {
            if let Err(e) = self.store.remove_item(key) {
                tracing::warn!(error = %e, key = %key, "Failed to clear session entry");
            }
        }
        self.tabs.clear();
        self.active_tab_id = None;
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        let active = self.active_tab_id.as_deref()?;
        self.get_tab(active)
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    pub fn get_tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == tab_id)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tabs.iter().any(|tab| tab.is_dirty)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
