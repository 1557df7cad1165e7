//! This module provides a virtual filesystem (VFS) backend that keeps everything in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::status::Status;
use crate::core::{Backend, RandomAccessFile, Result, WritableFile, utils};
use crate::{Entry, EntryType};

/// A virtual file system (VFS) backend that stores file and directory entries in memory
/// using an ordered map.
///
/// `MapFS` is strict: it never creates missing parents, so it reports every status the
/// backend contract describes. It is the reference backend for the conformance suite.
///
/// ### Internal state
///
/// * `cwd` — Current Working Directory, expressed as an **inner absolute normalized path**.
///   Relative canonical paths (possible only for the empty scheme) resolve against it.
///   Default value: `/`. Changed via `cd()` before the backend is registered.
///
/// * `entries` — The core storage map that holds all virtual file and directory entries.
///   - Key: `PathBuf` representing **inner absolute normalized paths** (always start with `/`).
///   - Value: `Entry` struct containing type and (for files) shared content.
///
/// ### Invariants
///
/// 1. **Root existence**: The path `/` is always present in `entries` and has type `Directory`.
/// 2. **Path normalization**: All keys in `entries` and `cwd` are normalized.
/// 3. **Parent consistency**: For any entry at `/a/b/c`, there is an entry `/a/b` of type
///    `Directory`.
///
/// ### Thread Safety
///
/// `entries` sits behind a mutex, so a registered `MapFS` can be shared between test threads.
///
/// ### Example
///
/// ```
/// use modular_vfs::{Backend, MapFS};
///
/// let fs = MapFS::new();
/// fs.create_dir("/docs").unwrap();
/// let mut file = fs.new_writable_file("/docs/note.txt").unwrap();
/// file.append(b"Hello").unwrap();
///
/// assert!(fs.exists("/docs/note.txt"));
/// ```
pub struct MapFS {
    cwd: PathBuf,                                 // inner absolute normalized path
    entries: Mutex<BTreeMap<PathBuf, Entry>>,     // inner absolute normalized paths
}

impl MapFS {
    /// Creates new MapFS instance holding only the root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Entry::new(EntryType::Directory));

        Self {
            cwd: PathBuf::from("/"),
            entries: Mutex::new(entries),
        }
    }

    /// Returns current working directory.
    pub fn cwd(&self) -> &Path {
        self.cwd.as_path()
    }

    /// Changes the current working directory.
    /// * `path` can be in relative or absolute form, but it must be an existing directory.
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let target = self.to_inner(path)?;
        match self.entries.lock().get(&target) {
            Some(entry) if entry.is_dir() => {}
            Some(_) => {
                return Err(Status::failed_precondition(format!(
                    "{} not a directory",
                    target.display()
                )));
            }
            None => {
                return Err(Status::not_found(format!(
                    "{} does not exist",
                    target.display()
                )));
            }
        }
        self.cwd = target;
        Ok(())
    }

    /// Checks if a `path` exists in the VFS.
    pub fn exists(&self, path: &str) -> bool {
        match self.to_inner(path) {
            Ok(inner) => self.entries.lock().contains_key(&inner),
            Err(_) => false,
        }
    }

    fn to_inner(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(Status::invalid_argument("invalid path: empty"));
        }
        let cwd = self.cwd.to_string_lossy();
        let absolute = if path.starts_with('/') {
            utils::normalize(path)
        } else {
            utils::normalize(&utils::join_path(&cwd, path))
        };
        Ok(PathBuf::from(absolute))
    }

    /// Verifies that every ancestor of `inner` exists and is a directory.
    /// The topmost offending ancestor decides the status.
    fn check_ancestors(entries: &BTreeMap<PathBuf, Entry>, inner: &Path) -> Result<()> {
        let mut ancestors: Vec<&Path> = inner.ancestors().skip(1).collect();
        ancestors.reverse();
        for ancestor in ancestors {
            match entries.get(ancestor) {
                Some(entry) if entry.is_dir() => {}
                Some(_) => {
                    return Err(Status::failed_precondition(format!(
                        "{} is not a directory",
                        ancestor.display()
                    )));
                }
                None => {
                    return Err(Status::not_found(format!(
                        "{} does not exist",
                        ancestor.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the content of the file at `path`, creating the file if needed.
    fn open_for_write(&self, path: &str, truncate: bool) -> Result<Arc<RwLock<Vec<u8>>>> {
        let inner = self.to_inner(path)?;
        let mut entries = self.entries.lock();
        Self::check_ancestors(&entries, &inner)?;

        if let Some(entry) = entries.get(&inner) {
            if entry.is_dir() {
                return Err(Status::failed_precondition(format!(
                    "{} is a directory",
                    inner.display()
                )));
            }
            if truncate {
                entry.truncate();
            }
            return Ok(entry.content());
        }

        let entry = Entry::new(EntryType::File);
        let content = entry.content();
        entries.insert(inner, entry);
        Ok(content)
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MapFS {
    fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        let content = self.open_for_write(path, true)?;
        Ok(Box::new(MapWritableFile { content }))
    }

    fn new_appendable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        let content = self.open_for_write(path, false)?;
        Ok(Box::new(MapWritableFile { content }))
    }

    fn new_random_access_file(&self, path: &str) -> Result<Box<dyn RandomAccessFile>> {
        let inner = self.to_inner(path)?;
        let entries = self.entries.lock();
        Self::check_ancestors(&entries, &inner)?;

        match entries.get(&inner) {
            Some(entry) if entry.is_file() => Ok(Box::new(MapRandomAccessFile {
                content: entry.content(),
            })),
            Some(_) => Err(Status::failed_precondition(format!(
                "{} is a directory",
                inner.display()
            ))),
            None => Err(Status::not_found(format!(
                "{} does not exist",
                inner.display()
            ))),
        }
    }

    /// Creates a single directory. Parents are never created.
    fn create_dir(&self, path: &str) -> Result<()> {
        let inner = self.to_inner(path)?;
        let mut entries = self.entries.lock();

        if entries.contains_key(&inner) {
            return Err(Status::already_exists(format!(
                "path already exists: {}",
                inner.display()
            )));
        }
        Self::check_ancestors(&entries, &inner)?;

        entries.insert(inner, Entry::new(EntryType::Directory));
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<()> {
        let inner = self.to_inner(path)?;
        if self.entries.lock().contains_key(&inner) {
            Ok(())
        } else {
            Err(Status::not_found(format!(
                "{} does not exist",
                inner.display()
            )))
        }
    }

    fn is_directory(&self, path: &str) -> Result<()> {
        let inner = self.to_inner(path)?;
        match self.entries.lock().get(&inner) {
            Some(entry) if entry.is_dir() => Ok(()),
            Some(_) => Err(Status::failed_precondition(format!(
                "{} not a directory",
                inner.display()
            ))),
            None => Err(Status::not_found(format!(
                "{} does not exist",
                inner.display()
            ))),
        }
    }
}

struct MapWritableFile {
    content: Arc<RwLock<Vec<u8>>>,
}

impl WritableFile for MapWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.content.write().extend_from_slice(data);
        Ok(())
    }
}

struct MapRandomAccessFile {
    content: Arc<RwLock<Vec<u8>>>,
}

impl RandomAccessFile for MapRandomAccessFile {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let content = self.content.read();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let available = &content[start..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}
