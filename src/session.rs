use std::collections::HashMap;

use crate::autosave::AutosaveEngine;
use crate::settings::Settings;
use crate::stats::{suggest_title, DocumentStats};
use crate::store::SessionStore;
use crate::tabs::{TabId, TabRegistry};
use crate::versions::{VersionSnapshot, MANUAL_SAVE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The tab still carries the default title; ask for a name first.
    NeedsTitle { suggested: String },
    NoActiveTab,
}

/// Binds one autosave engine to each open tab.
///
/// Edits go to the registry first and then to the tab's engine. Switching
/// away from a tab cancels its pending auto-save, and closing a tab drops
/// its engine along with any pending capture.
pub struct EditorSession<S: SessionStore> {
    registry: TabRegistry<S>,
    engines: HashMap<TabId, AutosaveEngine>,
    settings: Settings,
}

impl<S: SessionStore> EditorSession<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        let registry = TabRegistry::with_settings(store, &settings);
        let engines = registry
            .tabs()
            .iter()
            .map(|tab| {
                (
                    tab.id.clone(),
                    AutosaveEngine::with_settings(tab.content.clone(), &settings),
                )
            })
            .collect();

        Self {
            registry,
            engines,
            settings,
        }
    }

    pub fn registry(&self) -> &TabRegistry<S> {
        &self.registry
    }

    pub fn engine(&self, tab_id: &str) -> Option<&AutosaveEngine> {
        self.engines.get(tab_id)
    }

    fn active_id(&self) -> Option<TabId> {
        self.registry.active_tab().map(|tab| tab.id.clone())
    }

    fn cancel_active_autosave(&mut self) {
        let Some(active) = self.active_id() else {
            return;
        };
        if let Some(engine) = self.engines.get_mut(&active) {
            if engine.cancel_pending() {
                tracing::debug!(tab_id = %active, "Cancelled auto-save for outgoing tab");
            }
        }
    }

    fn bind_engine(&mut self, tab_id: &str) {
        let content = self
            .registry
            .get_tab(tab_id)
            .map(|tab| tab.content.clone())
            .unwrap_or_default();
        self.engines.insert(
            tab_id.to_string(),
            AutosaveEngine::with_settings(content, &self.settings),
        );
    }

    pub fn open_tab(&mut self, title: Option<&str>, content: Option<&str>) -> TabId {
        self.cancel_active_autosave();
        let id = self.registry.create_tab(title, content);
        self.bind_engine(&id);
        id
    }

    pub fn open_blank_tab(&mut self) -> TabId {
        self.open_tab(None, None)
    }

    pub fn duplicate_tab(&mut self, tab_id: &str) -> Option<TabId> {
        self.registry.get_tab(tab_id)?;
        self.cancel_active_autosave();
        let id = self.registry.duplicate_tab(tab_id)?;
        self.bind_engine(&id);
        Some(id)
    }

    pub fn select_tab(&mut self, tab_id: &str) {
        if self.registry.active_tab_id() != Some(tab_id) {
            self.cancel_active_autosave();
        }
        self.registry.select_tab(tab_id);
    }

    pub fn close_tab(&mut self, tab_id: &str) {
        // Dropping the engine cancels its timer
        self.engines.remove(tab_id);
        self.registry.close_tab(tab_id);
    }

    /// Record an edit to the active tab and restart its auto-save timer.
    ///
    /// Returns false when no tab is active.
    pub fn edit_active(&mut self, content: &str) -> bool {
        let Some(active) = self.active_id() else {
            return false;
        };
        self.registry.update_tab_content(&active, content);
        if let Some(engine) = self.engines.get_mut(&active) {
            engine.auto_save(content);
        }
        true
    }

    pub fn rename_active(&mut self, title: &str) {
        if let Some(active) = self.active_id() {
            self.registry.update_tab_title(&active, title);
        }
    }

    /// Manual save of the active tab, bypassing the debounce.
    pub fn save_active(&mut self) -> SaveOutcome {
        let Some(tab) = self.registry.active_tab() else {
            return SaveOutcome::NoActiveTab;
        };
        if tab.title == self.registry.default_title() {
            return SaveOutcome::NeedsTitle {
                suggested: suggest_title(&tab.content),
            };
        }
        self.capture_active()
    }

    pub fn rename_and_save_active(&mut self, title: &str) -> SaveOutcome {
        if self.active_id().is_none() {
            return SaveOutcome::NoActiveTab;
        }
        self.rename_active(title);
        self.capture_active()
    }

    fn capture_active(&mut self) -> SaveOutcome {
        let Some(tab) = self.registry.active_tab() else {
            return SaveOutcome::NoActiveTab;
        };
        let (id, content) = (tab.id.clone(), tab.content.clone());

        if let Some(engine) = self.engines.get(&id) {
            engine.save_version(&content, Some(MANUAL_SAVE));
        }
        self.registry.mark_tab_saved(&id);
        SaveOutcome::Saved
    }

    /// Restore a version of the active tab and push it into the tab buffer.
    pub fn restore_active_version(&mut self, version_id: &str) -> Option<String> {
        let active = self.active_id()?;
        let engine = self.engines.get_mut(&active)?;
        let content = engine.restore_version(version_id)?;
        // A pending capture of pre-restore typing would bury the restored text
        engine.cancel_pending();

        self.registry.update_tab_content(&active, &content);
        Some(content)
    }

    pub fn active_history(&self) -> Vec<VersionSnapshot> {
        self.active_id()
            .and_then(|id| self.engines.get(&id))
            .map(|engine| engine.history())
            .unwrap_or_default()
    }

    pub fn active_stats(&self) -> Option<DocumentStats> {
        self.registry
            .active_tab()
            .map(|tab| DocumentStats::from_content(&tab.content))
    }

    /// Mark clean every dirty tab whose latest capture matches its buffer.
    ///
    /// The initial snapshot an engine starts with does not count as a capture.
    pub fn sync_saved_tabs(&mut self) -> Vec<TabId> {
        let captured: Vec<TabId> = self
            .registry
            .tabs()
            .iter()
            .filter(|tab| tab.is_dirty)
            .filter(|tab| {
                self.engines.get(&tab.id).is_some_and(|engine| {
                    engine.has_captures()
                        && !engine.has_pending()
                        && engine.latest_content() == tab.content
                })
            })
            .map(|tab| tab.id.clone())
            .collect();

        for id in &captured {
            self.registry.mark_tab_saved(id);
        }
        captured
    }

    pub fn clear_session(&mut self) {
        self.engines.clear();
        self.registry.clear_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use std::time::Duration;
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(2000);

    fn session() -> (EditorSession<MemorySessionStore>, MemorySessionStore) {
        let store = MemorySessionStore::new();
        (EditorSession::new(store.clone(), Settings::default()), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_then_autosave_then_sync() {
        let (mut session, _) = session();
        let id = session.open_tab(Some("Journal"), None);

        assert!(session.edit_active("day one"));
        assert!(session.registry().get_tab(&id).unwrap().is_dirty);
        assert!(session.sync_saved_tabs().is_empty());

        sleep(QUIET + Duration::from_millis(10)).await;
        assert_eq!(session.active_history()[0].content, "day one");

        assert_eq!(session.sync_saved_tabs(), vec![id.clone()]);
        assert!(!session.registry().get_tab(&id).unwrap().is_dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_tabs_cancels_pending_autosave() {
        let (mut session, _) = session();
        let first = session.open_tab(Some("First"), None);
        session.edit_active("unsaved words");
        assert!(session.engine(&first).unwrap().has_pending());

        let second = session.open_tab(Some("Second"), None);
        assert!(!session.engine(&first).unwrap().has_pending());

        sleep(QUIET * 2).await;
        assert_eq!(session.engine(&first).unwrap().version_count(), 1);
        assert_eq!(session.registry().active_tab_id(), Some(second.as_str()));

        // Buffer still holds the edit
        assert_eq!(session.registry().get_tab(&first).unwrap().content, "unsaved words");
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_cancels_outgoing_only() {
        let (mut session, _) = session();
        let first = session.open_tab(Some("First"), None);
        let second = session.open_tab(Some("Second"), None);

        session.edit_active("second draft");
        session.select_tab(&second);
        assert!(session.engine(&second).unwrap().has_pending());

        session.select_tab(&first);
        assert!(!session.engine(&second).unwrap().has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drops_engine() {
        let (mut session, _) = session();
        let id = session.open_tab(Some("Gone"), None);
        session.edit_active("pending");
        session.close_tab(&id);

        assert!(session.engine(&id).is_none());
        assert!(session.registry().is_empty());
        sleep(QUIET * 2).await;
        assert!(session.active_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_untitled_needs_title() {
        let (mut session, _) = session();
        assert_eq!(session.save_active(), SaveOutcome::NoActiveTab);

        session.open_blank_tab();
        session.edit_active("# Shopping list\n\n- eggs");
        assert_eq!(
            session.save_active(),
            SaveOutcome::NeedsTitle {
                suggested: "Shopping list".to_string()
            }
        );

        assert_eq!(session.rename_and_save_active("Shopping"), SaveOutcome::Saved);
        let tab = session.registry().active_tab().unwrap();
        assert_eq!(tab.title, "Shopping");
        assert!(!tab.is_dirty);
        assert_eq!(session.active_history()[0].description, "Manual save");
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_of_titled_tab() {
        let (mut session, _) = session();
        session.open_tab(Some("Ideas"), Some("seed"));
        session.edit_active("seed grown");

        assert_eq!(session.save_active(), SaveOutcome::Saved);
        let history = session.active_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "seed grown");
        assert!(!session.registry().has_unsaved_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_pushes_content_into_tab() {
        let (mut session, _) = session();
        let id = session.open_tab(Some("Draft"), Some(""));
        session.edit_active("hello");
        session.save_active();

        let initial = session.active_history().last().unwrap().id.clone();
        assert_eq!(session.restore_active_version(&initial).as_deref(), Some(""));

        let tab = session.registry().get_tab(&id).unwrap();
        assert_eq!(tab.content, "");
        assert!(tab.is_dirty);
        assert_eq!(session.engine(&id).unwrap().current_version_id(), initial);

        assert!(session.restore_active_version("missing").is_none());
    }

    #[test]
    fn test_session_restores_tabs_and_engines() {
        let (mut session, store) = session();
        let kept = session.open_tab(Some("Kept"), Some("body"));
        let closed = session.open_tab(Some("Closed"), None);
        session.close_tab(&closed);

        let restored = EditorSession::new(store, Settings::default());
        assert_eq!(restored.registry().active_tab_id(), Some(kept.as_str()));
        let engine = restored.engine(&kept).unwrap();
        assert_eq!(engine.version_count(), 1);
        assert_eq!(engine.latest_content(), "body");
        assert!(restored.engine(&closed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_gets_own_history() {
        let (mut session, _) = session();
        let source = session.open_tab(Some("Base"), Some("shared"));
        let copy = session.duplicate_tab(&source).unwrap();

        session.edit_active("diverged");
        session.save_active();
        assert_eq!(session.engine(&copy).unwrap().version_count(), 2);
        assert_eq!(session.engine(&source).unwrap().version_count(), 1);
        assert!(session.duplicate_tab("missing").is_none());
    }

    #[test]
    fn test_sync_leaves_uncaptured_duplicate_dirty() {
        let (mut session, _) = session();
        let source = session.open_tab(Some("Base"), Some("text"));
        let copy = session.duplicate_tab(&source).unwrap();

        assert!(session.sync_saved_tabs().is_empty());
        assert!(session.registry().get_tab(&copy).unwrap().is_dirty);
    }

    #[test]
    fn test_sync_leaves_restored_dirty_tab_dirty() {
        let store = MemorySessionStore::new();
        let mut registry = TabRegistry::new(store.clone());
        let id = registry.create_tab(Some("Draft"), None);
        registry.update_tab_content(&id, "typed but never captured");

        let mut session = EditorSession::new(store, Settings::default());
        assert!(session.sync_saved_tabs().is_empty());
        assert!(session.registry().get_tab(&id).unwrap().is_dirty);

        let history = session.active_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].description, "Initial version");
    }

    #[test]
    fn test_active_stats_and_clear() {
        let (mut session, store) = session();
        assert!(session.active_stats().is_none());
        session.open_tab(Some("Stats"), Some("two words"));
        assert_eq!(session.active_stats().unwrap().words, 2);

        session.clear_session();
        assert!(session.registry().is_empty());
        assert!(store.is_empty());
        assert!(!session.edit_active("nothing open"));
    }
}
