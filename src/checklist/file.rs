use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Checklist, ChecklistStore};
use crate::errors::ChecklistError;

/// Checklists stored as `<state_dir>/<list>.txt`, one identifier per line.
///
/// Each list is read once and cached; every mutation goes to disk before the
/// cache is updated. `add` appends and fsyncs, `remove` rewrites the file
/// through a `.tmp` + rename.
pub struct FileChecklistStore {
    state_dir: PathBuf,
    cache: Mutex<HashMap<Checklist, Vec<String>>>,
}

impl FileChecklistStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self, list: Checklist) -> PathBuf {
        self.state_dir.join(list.file_name())
    }

    fn read_list(&self, list: Checklist) -> Result<Vec<String>, ChecklistError> {
        let path = self.path(list);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| ChecklistError::Read {
            path: path.clone(),
            source,
        })?;
        let mut ids: Vec<String> = Vec::new();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !ids.iter().any(|existing| existing == line) {
                ids.push(line.to_string());
            }
        }
        Ok(ids)
    }

    /// Run `f` against the cached list, loading it from disk on first use.
    fn with_list<T>(
        &self,
        list: Checklist,
        f: impl FnOnce(&mut Vec<String>) -> Result<T, ChecklistError>,
    ) -> Result<T, ChecklistError> {
        let mut cache = self.cache.lock().map_err(|_| ChecklistError::LockPoisoned)?;
        if !cache.contains_key(&list) {
            let ids = self.read_list(list)?;
            cache.insert(list, ids);
        }
        let ids = cache.get_mut(&list).ok_or(ChecklistError::LockPoisoned)?;
        f(ids)
    }

    fn append_line(&self, list: Checklist, id: &str) -> Result<(), ChecklistError> {
        let path = self.path(list);
        let write_err = |source| ChecklistError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.state_dir).map_err(write_err)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;
        let mut line = String::new();
        if !ends_with_newline(&mut file).map_err(write_err)? {
            line.push('\n');
        }
        line.push_str(id);
        line.push('\n');
        file.write_all(line.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)
    }

    fn rewrite(&self, list: Checklist, ids: &[String]) -> Result<(), ChecklistError> {
        let path = self.path(list);
        let write_err = |source| ChecklistError::Write {
            path: path.clone(),
            source,
        };
        let tmp = path.with_extension("txt.tmp");
        let mut content = ids.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        {
            let mut file = fs::File::create(&tmp).map_err(write_err)?;
            file.write_all(content.as_bytes()).map_err(write_err)?;
            file.sync_all().map_err(write_err)?;
        }
        fs::rename(&tmp, &path).map_err(write_err)
    }
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl ChecklistStore for FileChecklistStore {
    fn contains(&self, list: Checklist, id: &str) -> Result<bool, ChecklistError> {
        self.with_list(list, |ids| Ok(ids.iter().any(|existing| existing == id)))
    }

    fn add(&self, list: Checklist, id: &str) -> Result<(), ChecklistError> {
        self.with_list(list, |ids| {
            if ids.iter().any(|existing| existing == id) {
                return Ok(());
            }
            self.append_line(list, id)?;
            ids.push(id.to_string());
            Ok(())
        })
    }

    fn remove(&self, list: Checklist, id: &str) -> Result<(), ChecklistError> {
        self.with_list(list, |ids| {
            if !ids.iter().any(|existing| existing == id) {
                return Ok(());
            }
            let remaining: Vec<String> = ids.iter().filter(|e| *e != id).cloned().collect();
            self.rewrite(list, &remaining)?;
            *ids = remaining;
            Ok(())
        })
    }

    fn members(&self, list: Checklist) -> Result<Vec<String>, ChecklistError> {
        self.with_list(list, |ids| Ok(ids.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_list() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        assert!(!store.contains(Checklist::Invited, "alice").unwrap());
        assert!(store.members(Checklist::Invited).unwrap().is_empty());
    }

    #[test]
    fn test_add_is_visible_to_a_fresh_store() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Forked, "alice").unwrap();

        // Simulates a crash right after add returned.
        let reopened = FileChecklistStore::new(dir.path());
        assert!(reopened.contains(Checklist::Forked, "alice").unwrap());
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Invited, "alice").unwrap();
        store.add(Checklist::Invited, "alice").unwrap();
        let content = fs::read_to_string(store.path(Checklist::Invited)).unwrap();
        assert_eq!(content, "alice\n");
    }

    #[test]
    fn test_lists_are_independent() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Invited, "alice").unwrap();
        assert!(!store.contains(Checklist::Accepted, "alice").unwrap());
        assert!(!store.contains(Checklist::Forked, "alice").unwrap());
    }

    #[test]
    fn test_remove_only_drops_one_entry() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Forked, "alice").unwrap();
        store.add(Checklist::Forked, "bob").unwrap();
        store.add(Checklist::Forked, "carol").unwrap();
        store.remove(Checklist::Forked, "bob").unwrap();

        assert_eq!(
            store.members(Checklist::Forked).unwrap(),
            vec!["alice".to_string(), "carol".to_string()]
        );
        let reopened = FileChecklistStore::new(dir.path());
        assert!(!reopened.contains(Checklist::Forked, "bob").unwrap());
        assert!(reopened.contains(Checklist::Forked, "carol").unwrap());
        assert!(!store.path(Checklist::Forked).with_extension("txt.tmp").exists());
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let dir = tempdir().unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.remove(Checklist::Forked, "ghost").unwrap();
        assert!(!store.path(Checklist::Forked).exists());
    }

    #[test]
    fn test_reads_existing_file_with_blank_lines_and_duplicates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("accepted.txt"), "alice\n\n bob \nalice\n").unwrap();
        let store = FileChecklistStore::new(dir.path());
        assert_eq!(
            store.members(Checklist::Accepted).unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_add_after_unterminated_last_line_keeps_both_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("invited.txt"), "alice").unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Invited, "bob").unwrap();

        let content = fs::read_to_string(store.path(Checklist::Invited)).unwrap();
        assert_eq!(content, "alice\nbob\n");
        let reopened = FileChecklistStore::new(dir.path());
        assert_eq!(
            reopened.members(Checklist::Invited).unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(reopened.contains(Checklist::Invited, "alice").unwrap());
    }

    #[test]
    fn test_add_after_terminated_file_adds_no_blank_line() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("forked.txt"), "alice\n").unwrap();
        let store = FileChecklistStore::new(dir.path());
        store.add(Checklist::Forked, "bob").unwrap();
        let content = fs::read_to_string(store.path(Checklist::Forked)).unwrap();
        assert_eq!(content, "alice\nbob\n");
    }

    #[test]
    fn test_add_creates_state_dir() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("nested/state");
        let store = FileChecklistStore::new(&state);
        store.add(Checklist::Invited, "alice").unwrap();
        assert!(state.join("invited.txt").exists());
    }
}
