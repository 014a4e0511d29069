use std::collections::HashMap;
use std::sync::Mutex;

use super::{Checklist, ChecklistStore};
use crate::errors::ChecklistError;

/// In-memory checklists. Nothing survives the process.
#[derive(Default)]
pub struct MemoryChecklistStore {
    lists: Mutex<HashMap<Checklist, Vec<String>>>,
}

impl MemoryChecklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a list.
    pub fn with_entries(self, list: Checklist, ids: &[&str]) -> Self {
        if let Ok(mut lists) = self.lists.lock() {
            let entry = lists.entry(list).or_default();
            for id in ids {
                if !entry.iter().any(|e| e == id) {
                    entry.push((*id).to_string());
                }
            }
        }
        self
    }
}

impl ChecklistStore for MemoryChecklistStore {
    fn contains(&self, list: Checklist, id: &str) -> Result<bool, ChecklistError> {
        let lists = self.lists.lock().map_err(|_| ChecklistError::LockPoisoned)?;
        Ok(lists
            .get(&list)
            .is_some_and(|ids| ids.iter().any(|e| e == id)))
    }

    fn add(&self, list: Checklist, id: &str) -> Result<(), ChecklistError> {
        let mut lists = self.lists.lock().map_err(|_| ChecklistError::LockPoisoned)?;
        let ids = lists.entry(list).or_default();
        if !ids.iter().any(|e| e == id) {
            ids.push(id.to_string());
        }
        Ok(())
    }

    fn remove(&self, list: Checklist, id: &str) -> Result<(), ChecklistError> {
        let mut lists = self.lists.lock().map_err(|_| ChecklistError::LockPoisoned)?;
        if let Some(ids) = lists.get_mut(&list) {
            ids.retain(|e| e != id);
        }
        Ok(())
    }

    fn members(&self, list: Checklist) -> Result<Vec<String>, ChecklistError> {
        let lists = self.lists.lock().map_err(|_| ChecklistError::LockPoisoned)?;
        Ok(lists.get(&list).cloned().unwrap_or_default())
    }
}
