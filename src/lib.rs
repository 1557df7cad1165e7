//! Scheme-dispatched virtual file systems with pluggable backends.
//!
//! ### Overview
//!
//! `modular-vfs` routes file system calls by URI scheme. A [`SchemeRegistry`]
//! maps schemes such as `mem` or `file` to [`Backend`] implementations; an
//! [`Env`] resolves each URI, translates it into a canonical path and forwards
//! the call. Backends come from static registration or from external modules
//! loaded at runtime by the [`PluginLoader`].
//!
//! **Key ideas**:
//! - **Capabilities**: a backend implements only what it supports; everything
//!   else answers `UNIMPLEMENTED`, which callers accept in place of any result.
//! - **Canonical paths**: backends only see normalized paths with scheme and host
//!   stripped (see [`utils::translate`]).
//! - **Conformance**: the [`conformance`] suite checks any registered backend
//!   against the shared status-code contract.
//!
//! Two backends ship with the crate: [`DirFS`] over a host directory and
//! [`MapFS`] in memory.

mod core;
mod env;
mod registry;
mod vfs;

pub mod conformance;
pub mod config;
pub mod plugin;

pub use self::core::status::{Code, Status};
pub use self::core::utils;
pub use self::core::{Backend, RandomAccessFile, Result, WritableFile};
pub use env::Env;
pub use plugin::{ModuleState, PluginDeclaration, PluginLoader};
pub use registry::SchemeRegistry;
pub use vfs::{DirFS, Entry, EntryType, MapFS};
