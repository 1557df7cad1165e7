//! A file system module whose initialisation fails after it already registered
//! a backend for `partial`. The loader must leave the registry untouched.

use std::sync::Arc;

use modular_vfs::{Code, MapFS, Result, SchemeRegistry, Status};

fn init(registry: &mut SchemeRegistry, status: &mut Result<()>) {
    if let Err(e) = registry.register("partial", Arc::new(MapFS::new())) {
        *status = Err(e);
        return;
    }
    *status = Err(Status::new(Code::Internal, "backend credentials are missing"));
}

modular_vfs::export_plugin!(init);
