//! Runtime configuration for the conformance binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::Backend;
use crate::core::utils;
use crate::env::Env;
use crate::plugin::PluginLoader;
use crate::registry::SchemeRegistry;
use crate::vfs::{DirFS, MapFS};

/// Overrides the directory under which case working directories are created.
pub const TEMP_ROOT_VAR: &str = "TEST_TMPDIR";

pub const USAGE: &str = "\
vfs-conformance - checks file system backends against the common contract

USAGE:
    vfs-conformance [OPTIONS]

OPTIONS:
    --dso=<PATH>       Load a file system module before testing (repeatable)
    --scheme=<NAME>    Test only this scheme; empty means the local file system
                       (repeatable, default: every registered scheme)
    -h, --help         Show this help message

ENVIRONMENT:
    TEST_TMPDIR        Directory for working directories (default: system temp)
    RUST_LOG           Log filter, e.g. RUST_LOG=debug";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Flags {
    pub dsos: Vec<PathBuf>,
    pub schemes: Vec<String>,
    pub help: bool,
}

impl Flags {
    /// Parses command line arguments, without the program name.
    pub fn parse<I, S>(args: I) -> Result<Flags>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut flags = Flags::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => flags.help = true,
                "--dso" => {
                    let path = args.next().ok_or_else(|| anyhow!("--dso needs a path"))?;
                    flags.dsos.push(PathBuf::from(path));
                }
                "--scheme" => {
                    let scheme = args.next().ok_or_else(|| anyhow!("--scheme needs a value"))?;
                    flags.schemes.push(scheme);
                }
                _ => {
                    if let Some(path) = arg.strip_prefix("--dso=") {
                        if path.is_empty() {
                            bail!("--dso needs a path");
                        }
                        flags.dsos.push(PathBuf::from(path));
                    } else if let Some(scheme) = arg.strip_prefix("--scheme=") {
                        flags.schemes.push(scheme.to_string());
                    } else {
                        bail!("unknown option: {}", arg);
                    }
                }
            }
        }
        Ok(flags)
    }
}

/// Directory under which working directories are created: `TEST_TMPDIR` if set,
/// the system temp directory otherwise. Always absolute and normalized.
pub fn temp_root() -> Result<String> {
    resolve_temp_root(std::env::var(TEMP_ROOT_VAR).ok())
}

fn resolve_temp_root(configured: Option<String>) -> Result<String> {
    let root = configured
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    utils::absolute(&root.to_string_lossy())
        .with_context(|| format!("cannot resolve temp root {}", root.display()))
}

/// Registers the built-in backends: the host disk for `""` and `file`, and an
/// in-memory file system for `mem`.
pub fn register_builtin(registry: &mut SchemeRegistry) -> Result<()> {
    let host: Arc<dyn Backend> = Arc::new(DirFS::host()?);
    registry.register("", Arc::clone(&host))?;
    registry.register("file", host)?;
    registry.register("mem", Arc::new(MapFS::new()))?;
    Ok(())
}

/// Builds the environment: built-in backends first, then every module from
/// `flags` in order. A module that fails to load is logged and skipped.
pub fn build_env(flags: &Flags) -> Result<Env> {
    let mut registry = SchemeRegistry::new();
    register_builtin(&mut registry)?;

    let mut plugins = PluginLoader::new();
    for dso in &flags.dsos {
        plugins.load(dso, &mut registry);
    }
    Ok(Env::with_plugins(registry, plugins))
}
