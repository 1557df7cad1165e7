//! This module provides a virtual filesystem (VFS) backend that maps to a real directory
//! on the host system.
//!
//! ### Key Features:
//! - **Rooted view**: Canonical paths are resolved below a designated host directory
//!   (`self.root`). `DirFS::host()` roots at `/`, which makes it the local disk backend.
//! - **Native errors**: Host `io::Error`s are mapped onto the status taxonomy, so the
//!   backend reports exactly what the operating system reports.
//! - **Auto‑cleanup**: Optionally removes artifacts it created on Drop (when
//!   `is_auto_clean = true`).

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::core::status::Status;
use crate::core::{Backend, RandomAccessFile, Result, WritableFile, utils};

/// A virtual filesystem (VFS) backend that maps to a real directory on the host system.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks on cleanup; removing a link never touches its target.
/// - Permissions are not automatically adjusted; ensure `root` is writable.
/// - Missing parents are never created by file operations; the host reports `NOT_FOUND`.
///
/// ### Example:
/// ```
/// use modular_vfs::{Backend, DirFS};
///
/// let root = std::env::temp_dir().join("my_vfs");
///
/// let fs = DirFS::new(&root).unwrap();
/// fs.create_dir("/docs").unwrap();
/// let mut file = fs.new_writable_file("/docs/note.txt").unwrap();
/// file.append(b"Hello").unwrap();
/// assert!(root.join("docs/note.txt").exists());
/// ```
pub struct DirFS {
    root: PathBuf,                      // host-related absolute normalized path
    cwd: PathBuf,                       // inner absolute normalized path
    created: Mutex<BTreeSet<PathBuf>>,  // host-related absolute normalized paths
    created_root_parents: Vec<PathBuf>, // host-related absolute normalized paths
    is_auto_clean: bool,
}

impl DirFS {
    /// Creates a new DirFS instance with the root directory at `path`.
    /// Checks permissions to create and write into `path`.
    /// * `path` is an absolute host path. If path not exists it will be created.
    /// If `path` is not absolute or path is not a directory, error returns.
    /// By default, the `is_auto_clean` flag is set to `true`.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(anyhow!("invalid root path: empty"));
        }
        if root.is_relative() {
            return Err(anyhow!("the root path must be absolute"));
        }
        if root.exists() && !root.is_dir() {
            return Err(anyhow!("{:?} is not a directory", root));
        }

        let root = PathBuf::from(utils::normalize(&root.to_string_lossy()));

        let mut created_root_parents = Vec::new();
        if !std::fs::exists(&root)? {
            created_root_parents.extend(Self::mkdir_all(&root)?);
        }

        if !Self::check_permissions(&root) {
            return Err(anyhow!("Access denied: {:?}", root));
        }

        Ok(Self {
            root,
            cwd: PathBuf::from("/"),
            created: Mutex::new(BTreeSet::new()),
            created_root_parents,
            is_auto_clean: true,
        })
    }

    /// Creates the local disk backend: rooted at `/`, with the process working
    /// directory as `cwd` so that relative paths behave as they do for `std::fs`.
    pub fn host() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self {
            root: PathBuf::from("/"),
            cwd: PathBuf::from(utils::normalize(&cwd.to_string_lossy())),
            created: Mutex::new(BTreeSet::new()),
            created_root_parents: Vec::new(),
            is_auto_clean: true,
        })
    }

    /// Changes auto-clean flag.
    /// If auto-clean flag is true all artifacts created through this backend
    /// will be removed on drop.
    pub fn set_auto_clean(&mut self, clean: bool) {
        self.is_auto_clean = clean;
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns current working directory related to the vfs root.
    pub fn cwd(&self) -> &Path {
        self.cwd.as_path()
    }

    /// Returns the path on the host system that matches the specified canonical path.
    pub fn to_host(&self, path: &str) -> Result<PathBuf> {
        let inner = self.to_inner(path)?;
        let relative = inner.strip_prefix("/").unwrap_or(&inner);
        Ok(self.root.join(relative))
    }

    fn to_inner(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(Status::invalid_argument("invalid path: empty"));
        }
        if path.starts_with('/') {
            return Ok(PathBuf::from(utils::normalize(path)));
        }
        let cwd = self.cwd.to_string_lossy();
        Ok(PathBuf::from(utils::normalize(&utils::join_path(&cwd, path))))
    }

    fn track(&self, host: PathBuf) {
        self.created.lock().insert(host);
    }

    /// Make directories recursively.
    /// * `path` is an absolute host path.
    /// Returns vector of created directories.
    fn mkdir_all<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<PathBuf>> {
        let host_path = path.as_ref().to_path_buf();

        // Looking for the first existing parent
        let mut existed_part = host_path.clone();
        while let Some(parent) = existed_part.parent() {
            let parent_buf = parent.to_path_buf();
            if std::fs::exists(parent)? {
                existed_part = parent_buf;
                break;
            }
            existed_part = parent_buf;
        }

        let need_to_create: Vec<_> = host_path
            .strip_prefix(&existed_part)?
            .components()
            .collect();

        let mut created = Vec::new();

        let mut built = PathBuf::from(&existed_part);
        for component in need_to_create {
            built.push(component);
            if !std::fs::exists(&built)? {
                std::fs::create_dir(&built)?;
                created.push(built.clone());
            }
        }

        Ok(created)
    }

    fn check_permissions<P: AsRef<Path>>(path: P) -> bool {
        let filename = path.as_ref().join(".access");
        if std::fs::write(&filename, b"check").is_err() {
            return false;
        }
        std::fs::remove_file(filename).is_ok()
    }

    fn open_for_write(&self, path: &str, options: &OpenOptions) -> Result<Box<dyn WritableFile>> {
        let host = self.to_host(path)?;
        let existed = host.exists();
        let file = options
            .open(&host)
            .map_err(|e| Status::from(e).context(path))?;
        if !existed {
            self.track(host);
        }
        Ok(Box::new(DirWritableFile { file }))
    }

    /// Removes all artifacts created through this backend, deepest first.
    fn cleanup(&mut self) -> bool {
        let mut is_ok = true;
        let created = std::mem::take(self.created.get_mut());
        for host in created.iter().rev() {
            match utils::rm_on_host(host) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    is_ok = false;
                    log::warn!("Unable to remove {}: {}", host.display(), e);
                }
            }
        }
        is_ok
    }
}

impl Backend for DirFS {
    fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        self.open_for_write(path, &options)
    }

    fn new_appendable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        self.open_for_write(path, &options)
    }

    fn new_random_access_file(&self, path: &str) -> Result<Box<dyn RandomAccessFile>> {
        let host = self.to_host(path)?;
        let file = File::open(&host).map_err(|e| Status::from(e).context(path))?;
        // Opening a directory read-only succeeds on most hosts.
        if file.metadata()?.is_dir() {
            return Err(Status::failed_precondition(format!("{} is a directory", path)));
        }
        Ok(Box::new(DirRandomAccessFile {
            file: Mutex::new(file),
        }))
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let host = self.to_host(path)?;
        std::fs::create_dir(&host).map_err(|e| Status::from(e).context(path))?;
        self.track(host);
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<()> {
        let host = self.to_host(path)?;
        std::fs::metadata(&host).map_err(|e| Status::from(e).context(path))?;
        Ok(())
    }

    fn is_directory(&self, path: &str) -> Result<()> {
        let host = self.to_host(path)?;
        let metadata = std::fs::metadata(&host).map_err(|e| Status::from(e).context(path))?;
        if !metadata.is_dir() {
            return Err(Status::failed_precondition(format!("{} not a directory", path)));
        }
        Ok(())
    }
}

impl Drop for DirFS {
    fn drop(&mut self) {
        if !self.is_auto_clean {
            return;
        }

        if !self.cleanup() {
            log::warn!("Some artifacts under {} were left behind", self.root.display());
        }

        let errors: Vec<_> = self
            .created_root_parents
            .iter()
            .rev()
            .filter_map(|p| utils::rm_on_host(p).err())
            .collect();
        if !errors.is_empty() {
            log::warn!("Failed to remove parents: {:?}", errors);
        }

        self.created_root_parents.clear();
    }
}

struct DirWritableFile {
    file: File,
}

impl WritableFile for DirWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

struct DirRandomAccessFile {
    file: Mutex<File>,
}

impl RandomAccessFile for DirRandomAccessFile {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}
