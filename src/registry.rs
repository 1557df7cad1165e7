//! Mapping from URI schemes to backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::status::Status;
use crate::core::{Backend, Result};

/// Scheme → backend table.
///
/// The registry is populated single-threaded at start-up (static registration,
/// then plugin initialisation) and then moved into an [`Env`](crate::Env), which
/// only reads it. Moving it is what orders every write before the first lookup,
/// so no lock is needed.
#[derive(Default)]
pub struct SchemeRegistry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `backend` for `scheme`. The empty scheme is the local backend.
    ///
    /// The first registration of a scheme wins; a second one is rejected with
    /// `ALREADY_EXISTS` and leaves the table unchanged.
    pub fn register(&mut self, scheme: &str, backend: Arc<dyn Backend>) -> Result<()> {
        if self.backends.contains_key(scheme) {
            return Err(Status::already_exists(format!(
                "file system for scheme '{}' is already registered",
                scheme
            )));
        }
        log::debug!("registered file system for scheme '{}'", scheme);
        self.backends.insert(scheme.to_string(), backend);
        Ok(())
    }

    /// Moves every entry of `other` into this registry.
    ///
    /// Either all entries are added or, if any scheme is already registered,
    /// none is and `ALREADY_EXISTS` is returned.
    pub fn merge(&mut self, other: SchemeRegistry) -> Result<()> {
        if let Some(scheme) = other.backends.keys().find(|s| self.backends.contains_key(*s)) {
            return Err(Status::already_exists(format!(
                "file system for scheme '{}' is already registered",
                scheme
            )));
        }
        for (scheme, backend) in other.backends {
            log::debug!("registered file system for scheme '{}'", scheme);
            self.backends.insert(scheme, backend);
        }
        Ok(())
    }

    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(scheme).cloned()
    }

    /// All registered schemes, in no particular order.
    pub fn schemes(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Code, MapFS};

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SchemeRegistry::new();
        assert!(registry.is_empty());

        registry.register("mem", Arc::new(MapFS::new())).unwrap();
        registry.register("", Arc::new(MapFS::new())).unwrap();

        assert!(registry.lookup("mem").is_some());
        assert!(registry.lookup("").is_some());
        assert!(registry.lookup("gs").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_scheme_is_rejected() {
        let mut registry = SchemeRegistry::new();
        let first: Arc<dyn Backend> = Arc::new(MapFS::new());
        registry.register("mem", Arc::clone(&first)).unwrap();

        let result = registry.register("mem", Arc::new(MapFS::new()));
        assert_eq!(Code::of(&result), Code::AlreadyExists);

        let current = registry.lookup("mem").unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn test_merge_moves_all_entries() {
        let mut registry = SchemeRegistry::new();
        registry.register("", Arc::new(MapFS::new())).unwrap();

        let mut other = SchemeRegistry::new();
        other.register("mem", Arc::new(MapFS::new())).unwrap();
        other.register("ram", Arc::new(MapFS::new())).unwrap();
        registry.merge(other).unwrap();

        assert_eq!(registry.schemes(), vec!["", "mem", "ram"]);
    }

    #[test]
    fn test_merge_with_conflict_adds_nothing() {
        let mut registry = SchemeRegistry::new();
        registry.register("mem", Arc::new(MapFS::new())).unwrap();

        let mut other = SchemeRegistry::new();
        other.register("aaa", Arc::new(MapFS::new())).unwrap();
        other.register("mem", Arc::new(MapFS::new())).unwrap();

        assert_eq!(Code::of(&registry.merge(other)), Code::AlreadyExists);
        assert_eq!(registry.schemes(), vec!["mem"]);
    }

    #[test]
    fn test_same_backend_under_two_schemes() {
        let mut registry = SchemeRegistry::new();
        let fs: Arc<dyn Backend> = Arc::new(MapFS::new());
        registry.register("", Arc::clone(&fs)).unwrap();
        registry.register("file", Arc::clone(&fs)).unwrap();

        let mut schemes = registry.schemes();
        schemes.sort();
        assert_eq!(schemes, vec!["".to_string(), "file".to_string()]);
    }
}
