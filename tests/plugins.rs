use std::path::{Path, PathBuf};

use modular_vfs::conformance::Suite;
use modular_vfs::{Code, Env, MapFS, ModuleState, PluginLoader, SchemeRegistry};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Path of a `cdylib` example; `cargo test` builds examples next to `deps/`.
fn example_library(name: &str) -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let profile_dir = exe.parent().and_then(Path::parent).unwrap();
    let path = profile_dir
        .join("examples")
        .join(libloading::library_filename(name));
    assert!(
        path.exists(),
        "{} is missing; build the examples first",
        path.display()
    );
    path
}

fn load(name: &str, registry: &mut SchemeRegistry) -> PluginLoader {
    let mut plugins = PluginLoader::new();
    plugins.load(example_library(name), registry);
    plugins
}

fn mem_registry() -> SchemeRegistry {
    let mut registry = SchemeRegistry::new();
    registry
        .register("mem", std::sync::Arc::new(MapFS::new()))
        .unwrap();
    registry
}

mod loaded {
    use super::*;

    #[test]
    fn test_plugin_scheme_is_dispatched() {
        init_logger();
        let mut registry = mem_registry();
        let plugins = load("mem_plugin", &mut registry);

        let module = &plugins.modules()[0];
        assert!(module.is_loaded());
        assert_eq!(module.state(), &ModuleState::Loaded);

        let env = Env::with_plugins(registry, plugins);
        assert_eq!(env.registered_schemes(), vec!["mem", "memplugin"]);
        env.create_dir("memplugin:///data").unwrap();
        assert_eq!(Code::of(&env.is_directory("memplugin:///data")), Code::Ok);
        assert_eq!(Code::of(&env.is_directory("mem:///data")), Code::NotFound);
    }

    #[test]
    fn test_plugin_backend_conforms() {
        init_logger();
        let mut registry = SchemeRegistry::new();
        let plugins = load("mem_plugin", &mut registry);
        let env = Env::with_plugins(registry, plugins);

        let report = Suite::new(&env, vec!["memplugin".into()], "/tmp").run();
        assert!(report.is_success(), "{}", report);
        assert_eq!(report.skipped(), 0, "{}", report);
    }

    #[test]
    fn test_backend_outlives_env() {
        init_logger();
        let mut registry = SchemeRegistry::new();
        let plugins = load("mem_plugin", &mut registry);
        let env = Env::with_plugins(registry, plugins);

        let backend = env.resolve("memplugin:///").unwrap();
        drop(env);

        backend.create_dir("/after_env").unwrap();
        assert_eq!(Code::of(&backend.is_directory("/after_env")), Code::Ok);
    }

    #[test]
    fn test_second_load_of_same_scheme_fails() {
        init_logger();
        let mut registry = SchemeRegistry::new();
        let mut plugins = PluginLoader::new();
        assert!(plugins.load(example_library("mem_plugin"), &mut registry));
        assert!(!plugins.load(example_library("mem_plugin"), &mut registry));

        match plugins.modules()[1].state() {
            ModuleState::LoadFailed(status) => assert_eq!(status.code(), Code::AlreadyExists),
            state => panic!("unexpected state {:?}", state),
        }
        let env = Env::with_plugins(registry, plugins);
        env.create_dir("memplugin:///still_works").unwrap();
    }
}

mod failed {
    use super::*;

    #[test]
    fn test_failed_init_registers_nothing() {
        init_logger();
        let mut registry = mem_registry();
        let plugins = load("failing_plugin", &mut registry);

        let module = &plugins.modules()[0];
        assert!(!module.is_loaded());
        match module.state() {
            ModuleState::LoadFailed(status) => {
                assert_eq!(status.code(), Code::Internal);
                assert!(status.message().contains("credentials"));
            }
            state => panic!("unexpected state {:?}", state),
        }
        assert!(registry.lookup("partial").is_none());

        let env = Env::with_plugins(registry, plugins);
        assert_eq!(env.registered_schemes(), vec!["mem"]);
        assert_eq!(Code::of(&env.create_dir("partial:///x")), Code::NotFound);
        env.create_dir("mem:///x").unwrap();
    }

    #[test]
    fn test_missing_declaration_is_load_failed() {
        init_logger();
        let mut registry = mem_registry();
        let plugins = load("no_declaration", &mut registry);

        match plugins.modules()[0].state() {
            ModuleState::LoadFailed(status) => {
                assert_eq!(status.code(), Code::NotFound);
                assert!(status.message().contains("declaration"));
            }
            state => panic!("unexpected state {:?}", state),
        }
        assert_eq!(registry.schemes(), vec!["mem"]);
    }

    #[test]
    fn test_failures_do_not_stop_later_modules() {
        init_logger();
        let mut registry = SchemeRegistry::new();
        let mut plugins = PluginLoader::new();
        assert!(!plugins.load(example_library("failing_plugin"), &mut registry));
        assert!(!plugins.load(example_library("no_declaration"), &mut registry));
        assert!(plugins.load(example_library("mem_plugin"), &mut registry));

        assert_eq!(plugins.modules().len(), 3);
        assert_eq!(registry.schemes(), vec!["memplugin"]);
    }
}
