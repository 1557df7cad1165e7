//! A shared library that opens fine but declares no file system plugin.

#[unsafe(no_mangle)]
pub extern "C" fn vfs_module_revision() -> u32 {
    1
}
