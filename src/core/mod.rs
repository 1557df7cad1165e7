pub mod status;
pub mod utils;

use status::{Code, Status};

pub type Result<T> = std::result::Result<T, Status>;

/// A handle for sequential writing, returned by `new_writable_file` and
/// `new_appendable_file`. The caller owns it.
pub trait WritableFile: Send {
    fn append(&mut self, data: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// A handle for positional reads, returned by `new_random_access_file`.
pub trait RandomAccessFile: Send + Sync {
    /// Reads up to `buf.len()` bytes starting at `offset`; returns the count read.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

/// The capability interface every filesystem backend implements.
///
/// All paths handed to these methods are canonical: scheme and host are already
/// stripped and the path is normalized (see [`utils::translate`]).
///
/// Every operation except `translate_name` defaults to `UNIMPLEMENTED`, which
/// callers must accept in place of any other outcome. A backend overrides only
/// what it supports natively.
///
/// Error contract for the operations a backend does implement:
///
/// | operation | `NOT_FOUND` | `FAILED_PRECONDITION` | `ALREADY_EXISTS` |
/// |---|---|---|---|
/// | `new_writable_file` | parent missing | path is a dir, ancestor is a file | - |
/// | `new_appendable_file` | parent missing | path is a dir, ancestor is a file | - |
/// | `new_random_access_file` | path missing | path is a dir, ancestor is a file | - |
/// | `create_dir` | parent missing | ancestor is a file | path exists |
///
/// A backend that creates missing parents returns OK instead of `NOT_FOUND`.
pub trait Backend: Send + Sync {
    /// Strips the scheme and normalizes the remaining path.
    fn translate_name(&self, uri: &str) -> String {
        utils::translate(uri)
    }

    /// Creates or truncates the file at `path`.
    fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        Err(unimplemented("new_writable_file", path))
    }

    /// Opens the file at `path` for appending, creating it if needed.
    fn new_appendable_file(&self, path: &str) -> Result<Box<dyn WritableFile>> {
        Err(unimplemented("new_appendable_file", path))
    }

    /// Opens an existing file at `path` for positional reads.
    fn new_random_access_file(&self, path: &str) -> Result<Box<dyn RandomAccessFile>> {
        Err(unimplemented("new_random_access_file", path))
    }

    /// Creates a single directory.
    fn create_dir(&self, path: &str) -> Result<()> {
        Err(unimplemented("create_dir", path))
    }

    /// OK if something exists at `path`, `NOT_FOUND` otherwise.
    fn file_exists(&self, path: &str) -> Result<()> {
        Err(unimplemented("file_exists", path))
    }

    /// OK for a directory, `FAILED_PRECONDITION` for a file, `NOT_FOUND` if absent.
    fn is_directory(&self, path: &str) -> Result<()> {
        Err(unimplemented("is_directory", path))
    }

    /// Creates `path` and every missing ancestor. Existing directories along
    /// the way are fine.
    fn recursively_create_dir(&self, path: &str) -> Result<()> {
        let mut prefix = String::new();
        if path.starts_with('/') {
            prefix.push('/');
        }
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            prefix = utils::join_path(&prefix, segment);
            match self.create_dir(&prefix) {
                Ok(()) => {}
                Err(status) if status.code() == Code::AlreadyExists => {
                    if let Err(status) = self.is_directory(&prefix) {
                        if status.code() != Code::Unimplemented {
                            return Err(status);
                        }
                    }
                }
                Err(status) => return Err(status),
            }
        }
        Ok(())
    }
}

fn unimplemented(op: &str, path: &str) -> Status {
    Status::unimplemented(format!("{}() is not supported: {}", op, path))
}
