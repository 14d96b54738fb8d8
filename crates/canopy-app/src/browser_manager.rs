//! Manages the open browser tabs

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::prelude::*;
use canopy_core::{BrowserKind, DisplayMode, NodeComparator};

use crate::browser::{next_browser_id, BrowserId, BrowserSession, SessionOptions};

/// Maximum number of open browsers
pub const MAX_BROWSERS: usize = 12;

/// Manages the open browsers and which one is focused
#[derive(Debug, Default)]
pub struct BrowserManager {
    /// All browsers indexed by ID
    browsers: HashMap<BrowserId, BrowserSession>,

    /// Order of browser IDs (for tab ordering)
    order: Vec<BrowserId>,

    /// Currently focused browser
    selected_index: usize,
}

impl BrowserManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new browser. The first one opened is focused.
    pub fn create(
        &mut self,
        kind: BrowserKind,
        options: SessionOptions,
        comparator: Arc<dyn NodeComparator>,
    ) -> Result<BrowserId> {
        if self.browsers.len() >= MAX_BROWSERS {
            return Err(Error::config(format!(
                "Maximum of {} open browsers reached",
                MAX_BROWSERS
            )));
        }

        let id = next_browser_id();
        let mut session = BrowserSession::new(id, kind, options, comparator);
        session.displayed = true;

        self.browsers.insert(id, session);
        self.order.push(id);

        if self.order.len() == 1 {
            self.selected_index = 0;
        }
        self.sync_selected();

        Ok(id)
    }

    /// Remove a browser, keeping the focus index in range.
    pub fn remove(&mut self, id: BrowserId) -> Option<BrowserSession> {
        if let Some(pos) = self.order.iter().position(|&b| b == id) {
            self.order.remove(pos);
            if !self.order.is_empty() && self.selected_index >= self.order.len() {
                self.selected_index = self.order.len() - 1;
            }
        }
        let removed = self.browsers.remove(&id);
        self.sync_selected();
        removed
    }

    pub fn get(&self, id: BrowserId) -> Option<&BrowserSession> {
        self.browsers.get(&id)
    }

    pub fn get_mut(&mut self, id: BrowserId) -> Option<&mut BrowserSession> {
        self.browsers.get_mut(&id)
    }

    /// Like [`BrowserManager::get_mut`], failing with `NotFound`.
    pub fn require_mut(&mut self, id: BrowserId) -> Result<&mut BrowserSession> {
        self.browsers
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("browser {id}")))
    }

    pub fn selected(&self) -> Option<&BrowserSession> {
        self.selected_id().and_then(|id| self.browsers.get(&id))
    }

    pub fn selected_mut(&mut self) -> Option<&mut BrowserSession> {
        let id = self.selected_id()?;
        self.browsers.get_mut(&id)
    }

    pub fn selected_id(&self) -> Option<BrowserId> {
        self.order.get(self.selected_index).copied()
    }

    pub fn select_by_id(&mut self, id: BrowserId) -> bool {
        match self.order.iter().position(|&b| b == id) {
            Some(pos) => {
                self.selected_index = pos;
                self.sync_selected();
                true
            }
            None => false,
        }
    }

    /// First open browser of the given kind, in tab order.
    pub fn find_by_kind(&self, kind: BrowserKind) -> Option<BrowserId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.browsers.get(id).is_some_and(|b| b.kind() == kind))
    }

    /// Switch every browser's display mode; each picks it up on its next
    /// refresh. Discarded browsers are skipped.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        for browser in self.browsers.values_mut() {
            if let Err(e) = browser.set_display_mode(mode) {
                trace!("skipping browser {}: {}", browser.id(), e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    pub fn ids(&self) -> Vec<BrowserId> {
        self.order.clone()
    }

    /// Iterate over browsers in tab order
    pub fn iter(&self) -> impl Iterator<Item = &BrowserSession> {
        self.order.iter().filter_map(|id| self.browsers.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BrowserSession> {
        self.browsers.values_mut()
    }

    fn sync_selected(&mut self) {
        let selected = self.selected_id();
        for (id, browser) in self.browsers.iter_mut() {
            browser.selected = Some(*id) == selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::DefaultComparator;

    fn create(manager: &mut BrowserManager, kind: BrowserKind) -> BrowserId {
        manager
            .create(kind, SessionOptions::default(), Arc::new(DefaultComparator))
            .unwrap()
    }

    #[test]
    fn test_first_browser_is_selected() {
        let mut manager = BrowserManager::new();
        let id = create(&mut manager, BrowserKind::Projects);
        assert_eq!(manager.selected_id(), Some(id));
        assert!(manager.get(id).unwrap().selected);
        assert!(manager.get(id).unwrap().displayed);
    }

    #[test]
    fn test_select_by_id_moves_flag() {
        let mut manager = BrowserManager::new();
        let first = create(&mut manager, BrowserKind::Projects);
        let second = create(&mut manager, BrowserKind::Tags);

        assert!(manager.select_by_id(second));
        assert!(!manager.get(first).unwrap().selected);
        assert!(manager.get(second).unwrap().selected);
        assert!(!manager.select_by_id(9_999_999));
    }

    #[test]
    fn test_remove_keeps_selection_in_range() {
        let mut manager = BrowserManager::new();
        let first = create(&mut manager, BrowserKind::Projects);
        let second = create(&mut manager, BrowserKind::Screens);
        manager.select_by_id(second);

        assert!(manager.remove(second).is_some());
        assert_eq!(manager.selected_id(), Some(first));
        assert!(manager.get(first).unwrap().selected);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_max_browsers() {
        let mut manager = BrowserManager::new();
        for _ in 0..MAX_BROWSERS {
            create(&mut manager, BrowserKind::Images);
        }
        let result = manager.create(
            BrowserKind::Images,
            SessionOptions::default(),
            Arc::new(DefaultComparator),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_find_by_kind_and_display_mode() {
        let mut manager = BrowserManager::new();
        create(&mut manager, BrowserKind::Projects);
        let admin = create(&mut manager, BrowserKind::Admin);
        assert_eq!(manager.find_by_kind(BrowserKind::Admin), Some(admin));
        assert_eq!(manager.find_by_kind(BrowserKind::Files), None);

        manager.set_display_mode(DisplayMode::GroupDisplay);
        assert!(manager
            .iter()
            .all(|b| b.options().display_mode == DisplayMode::GroupDisplay));
    }
}
