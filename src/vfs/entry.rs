use std::sync::Arc;

use parking_lot::RwLock;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EntryType {
    File,
    Directory,
}

/// A node of [`MapFS`](crate::MapFS). File content is shared with every open
/// handle, so writes through one handle are visible to readers of the same path.
#[derive(Debug, Clone)]
pub struct Entry {
    entry_type: EntryType,
    content: Arc<RwLock<Vec<u8>>>,
}

impl Entry {
    pub fn new(entry_type: EntryType) -> Entry {
        Entry {
            entry_type,
            content: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn content(&self) -> Arc<RwLock<Vec<u8>>> {
        Arc::clone(&self.content)
    }

    pub fn truncate(&self) {
        self.content.write().clear();
    }
}
