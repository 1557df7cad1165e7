//! A file system module that registers an in-memory backend for `memplugin`.
//!
//! ```sh
//! cargo build --example mem_plugin
//! cargo run --bin vfs-conformance -- --dso=target/debug/examples/libmem_plugin.so --scheme=memplugin
//! ```

use std::sync::Arc;

use modular_vfs::{MapFS, Result, SchemeRegistry};

fn init(registry: &mut SchemeRegistry, status: &mut Result<()>) {
    *status = registry.register("memplugin", Arc::new(MapFS::new()));
}

modular_vfs::export_plugin!(init);
