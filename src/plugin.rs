//! Loading backends from external modules.
//!
//! A plugin is a `cdylib` that exports a [`PluginDeclaration`] under the symbol
//! `vfs_plugin_declaration` (use [`export_plugin!`](crate::export_plugin)). The
//! loader checks the declared ABI and crate versions, then calls `init` with the
//! registry and a status slot. `init` registers its backends and reports failure
//! through the slot.
//!
//! `init` registers into a scratch registry that is merged into the real one
//! only when `init` succeeds, so a failing module registers nothing.
//!
//! Plugins exchange Rust types with the host, so a plugin must be built with the
//! same toolchain and the same version of this crate as the host.

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::core::Result;
use crate::core::status::Status;
use crate::registry::SchemeRegistry;

/// Bumped whenever the shape of [`PluginDeclaration`] or [`InitFn`] changes.
pub const ABI_VERSION: u32 = 1;

pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Null-terminated name of the exported declaration.
pub const DECLARATION_SYMBOL: &[u8] = b"vfs_plugin_declaration\0";

/// Plugin entry point: registers backends and fills the status slot.
pub type InitFn = fn(registry: &mut SchemeRegistry, status: &mut Result<()>);

// `abi_version` stays first so a mismatched plugin is still read correctly.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub crate_version: &'static str,
    pub init: InitFn,
}

/// Exports the plugin declaration for `$init` from a `cdylib`.
///
/// ```ignore
/// fn init(registry: &mut SchemeRegistry, status: &mut modular_vfs::Result<()>) {
///     *status = registry.register("mem", Arc::new(MapFS::new()));
/// }
///
/// modular_vfs::export_plugin!(init);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($init:expr) => {
        #[doc(hidden)]
        #[allow(non_upper_case_globals)]
        #[unsafe(no_mangle)]
        pub static vfs_plugin_declaration: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                abi_version: $crate::plugin::ABI_VERSION,
                crate_version: $crate::plugin::CRATE_VERSION,
                init: $init,
            };
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleState {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed(Status),
}

/// A module the loader has seen, successfully loaded or not.
pub struct Module {
    path: PathBuf,
    state: ModuleState,
    // never unmapped once opened
    _library: Option<&'static Library>,
}

impl Module {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ModuleState::Loaded
    }
}

/// Loads plugin modules and keeps them mapped.
///
/// Modules are never unloaded, not even when dropping the loader: backends
/// registered by a module point into its code and may be held by anyone who
/// resolved them. A module that opened but failed to initialise stays mapped
/// too, since its `init` may have spawned or leaked code of its own.
#[derive(Default)]
pub struct PluginLoader {
    modules: Vec<Module>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the module at `path` and runs its initialisation.
    ///
    /// Returns `false` on any failure; the failure is logged and recorded in the
    /// module state, and other modules are unaffected.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, registry: &mut SchemeRegistry) -> bool {
        let mut module = Module {
            path: path.as_ref().to_path_buf(),
            state: ModuleState::Unloaded,
            _library: None,
        };

        module.state = ModuleState::Loading;
        let outcome = Self::open(&module.path).and_then(|library| {
            module._library = Some(library);
            let declaration = Self::declaration(library)?;
            initialize(&declaration, registry)
        });

        let loaded = match outcome {
            Ok(()) => {
                log::info!("loaded file system module {}", module.path.display());
                module.state = ModuleState::Loaded;
                true
            }
            Err(status) => {
                log::warn!("Couldn't load module {}: {}", module.path.display(), status);
                module.state = ModuleState::LoadFailed(status);
                false
            }
        };
        self.modules.push(module);
        loaded
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    fn open(path: &Path) -> Result<&'static Library> {
        // SAFETY: loading a module runs its initialisers; plugins are trusted input.
        let library = unsafe { Library::new(path) }
            .map_err(|e| Status::not_found(format!("couldn't open {}: {}", path.display(), e)))?;
        Ok(Box::leak(Box::new(library)))
    }

    fn declaration(library: &Library) -> Result<PluginDeclaration> {
        // SAFETY: the symbol is a `PluginDeclaration` static when the versions
        // match, which `initialize` verifies before calling into it.
        unsafe {
            let symbol = library
                .get::<*const PluginDeclaration>(DECLARATION_SYMBOL)
                .map_err(|e| Status::not_found(format!("couldn't find plugin declaration: {}", e)))?;
            Ok((*symbol).read())
        }
    }
}

/// Validates `declaration`, runs its `init` and merges what it registered into
/// `registry`. On any failure `registry` is left unchanged.
///
/// Also usable for statically linked plugins.
pub fn initialize(declaration: &PluginDeclaration, registry: &mut SchemeRegistry) -> Result<()> {
    if declaration.abi_version != ABI_VERSION {
        return Err(Status::failed_precondition(format!(
            "plugin ABI version {} does not match host ABI version {}",
            declaration.abi_version, ABI_VERSION
        )));
    }
    if declaration.crate_version != CRATE_VERSION {
        return Err(Status::failed_precondition(format!(
            "plugin built against {} but host is {}",
            declaration.crate_version, CRATE_VERSION
        )));
    }

    let mut scratch = SchemeRegistry::new();
    let mut status = Ok(());
    (declaration.init)(&mut scratch, &mut status);
    status.map_err(|s| s.context("couldn't initialize plugin"))?;
    registry.merge(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Code, MapFS};
    use std::sync::Arc;

    fn register_mem(registry: &mut SchemeRegistry, status: &mut Result<()>) {
        *status = registry.register("mem", Arc::new(MapFS::new()));
    }

    fn fail(_registry: &mut SchemeRegistry, status: &mut Result<()>) {
        *status = Err(Status::new(Code::Internal, "no credentials"));
    }

    fn register_then_fail(registry: &mut SchemeRegistry, status: &mut Result<()>) {
        *status = registry
            .register("partial", Arc::new(MapFS::new()))
            .and_then(|()| Err(Status::new(Code::Internal, "late failure")));
    }

    fn declaration(init: InitFn) -> PluginDeclaration {
        PluginDeclaration {
            abi_version: ABI_VERSION,
            crate_version: CRATE_VERSION,
            init,
        }
    }

    mod init {
        use super::*;

        #[test]
        fn test_successful_init_registers() {
            let mut registry = SchemeRegistry::new();
            initialize(&declaration(register_mem), &mut registry).unwrap();
            assert!(registry.lookup("mem").is_some());
        }

        #[test]
        fn test_status_slot_failure_is_reported() {
            let mut registry = SchemeRegistry::new();
            let status = initialize(&declaration(fail), &mut registry).unwrap_err();
            assert_eq!(status.code(), Code::Internal);
            assert!(status.message().contains("no credentials"));
        }

        #[test]
        fn test_failed_init_registers_nothing() {
            let mut registry = SchemeRegistry::new();
            registry.register("mem", Arc::new(MapFS::new())).unwrap();

            let result = initialize(&declaration(register_then_fail), &mut registry);
            assert_eq!(Code::of(&result), Code::Internal);
            assert!(registry.lookup("partial").is_none());
            assert_eq!(registry.schemes(), vec!["mem"]);
        }

        #[test]
        fn test_abi_version_leads_declaration() {
            assert_eq!(std::mem::offset_of!(PluginDeclaration, abi_version), 0);
        }

        #[test]
        fn test_abi_mismatch_skips_init() {
            let mut registry = SchemeRegistry::new();
            let mut decl = declaration(register_mem);
            decl.abi_version = ABI_VERSION + 1;

            let result = initialize(&decl, &mut registry);
            assert_eq!(Code::of(&result), Code::FailedPrecondition);
            assert!(registry.is_empty());
        }

        #[test]
        fn test_crate_version_mismatch_skips_init() {
            let mut registry = SchemeRegistry::new();
            let mut decl = declaration(register_mem);
            decl.crate_version = "0.0.0-other";

            let result = initialize(&decl, &mut registry);
            assert_eq!(Code::of(&result), Code::FailedPrecondition);
            assert!(registry.is_empty());
        }

        #[test]
        fn test_duplicate_registration_fails_init() {
            let mut registry = SchemeRegistry::new();
            registry.register("mem", Arc::new(MapFS::new())).unwrap();
            let result = initialize(&declaration(register_mem), &mut registry);
            assert_eq!(Code::of(&result), Code::AlreadyExists);
        }
    }

    mod load {
        use super::*;

        #[test]
        fn test_missing_module_is_load_failed() {
            let mut loader = PluginLoader::new();
            let mut registry = SchemeRegistry::new();

            assert!(!loader.load("/definitely/not/here/libplugin.so", &mut registry));
            assert!(!loader.load("/also/missing/libother.so", &mut registry));

            assert_eq!(loader.modules().len(), 2);
            for module in loader.modules() {
                assert!(!module.is_loaded());
                match module.state() {
                    ModuleState::LoadFailed(status) => assert_eq!(status.code(), Code::NotFound),
                    state => panic!("unexpected state {:?}", state),
                }
            }
            assert!(registry.is_empty());
        }
    }
}
