//! URI dispatch.
//!
//! `Env` owns the frozen [`SchemeRegistry`] and forwards every operation to the
//! backend registered for the URI's scheme, after translating the URI into a
//! canonical path. Statuses are returned unchanged.

use std::sync::Arc;

use crate::core::status::Status;
use crate::core::{Backend, RandomAccessFile, Result, WritableFile, utils};
use crate::plugin::PluginLoader;
use crate::registry::SchemeRegistry;

pub struct Env {
    registry: SchemeRegistry,
    plugins: PluginLoader,
}

impl Env {
    /// Builds an environment over a registry populated by static registration only.
    pub fn new(registry: SchemeRegistry) -> Self {
        Self::with_plugins(registry, PluginLoader::new())
    }

    /// Builds an environment that keeps `plugins` mapped for as long as it lives.
    pub fn with_plugins(registry: SchemeRegistry, plugins: PluginLoader) -> Self {
        Self { registry, plugins }
    }

    pub fn plugins(&self) -> &PluginLoader {
        &self.plugins
    }

    /// All schemes a backend is registered for.
    pub fn registered_schemes(&self) -> Vec<String> {
        self.registry.schemes()
    }

    /// Returns the backend responsible for `uri`.
    ///
    /// A URI without scheme goes to the backend registered for `""`. The returned
    /// backend may outlive the `Env`: plugin modules stay mapped for the rest of
    /// the process.
    pub fn resolve(&self, uri: &str) -> Result<Arc<dyn Backend>> {
        let scheme = utils::scheme_of(uri);
        self.registry.lookup(scheme).ok_or_else(|| {
            Status::not_found(format!(
                "No file system registered for scheme '{}' (uri: {})",
                scheme, uri
            ))
        })
    }

    /// Resolves `uri` and translates it with the resolved backend.
    fn dispatch(&self, uri: &str) -> Result<(Arc<dyn Backend>, String)> {
        let backend = self.resolve(uri)?;
        let path = backend.translate_name(uri);
        log::debug!("dispatch {} -> {}", uri, path);
        Ok((backend, path))
    }

    pub fn translate_name(&self, uri: &str) -> Result<String> {
        Ok(self.resolve(uri)?.translate_name(uri))
    }

    pub fn new_writable_file(&self, uri: &str) -> Result<Box<dyn WritableFile>> {
        let (backend, path) = self.dispatch(uri)?;
        backend.new_writable_file(&path)
    }

    pub fn new_appendable_file(&self, uri: &str) -> Result<Box<dyn WritableFile>> {
        let (backend, path) = self.dispatch(uri)?;
        backend.new_appendable_file(&path)
    }

    pub fn new_random_access_file(&self, uri: &str) -> Result<Box<dyn RandomAccessFile>> {
        let (backend, path) = self.dispatch(uri)?;
        backend.new_random_access_file(&path)
    }

    pub fn create_dir(&self, uri: &str) -> Result<()> {
        let (backend, path) = self.dispatch(uri)?;
        backend.create_dir(&path)
    }

    pub fn recursively_create_dir(&self, uri: &str) -> Result<()> {
        let (backend, path) = self.dispatch(uri)?;
        backend.recursively_create_dir(&path)
    }

    pub fn file_exists(&self, uri: &str) -> Result<()> {
        let (backend, path) = self.dispatch(uri)?;
        backend.file_exists(&path)
    }

    pub fn is_directory(&self, uri: &str) -> Result<()> {
        let (backend, path) = self.dispatch(uri)?;
        backend.is_directory(&path)
    }
}
