//! Synthetic module images and directory trees for integration tests.
#![allow(dead_code)]

use icon_scanner::testutil::pe_image;
use std::fs;
use std::path::Path;

/// PE32+ image listing `names` entries under each `(type_id, names)` pair.
/// An empty slice produces an image without a resource directory.
pub fn module(types: &[(u16, u16)]) -> Vec<u8> {
    pe_image(true, types)
}

/// Image with one icon and its group entry
pub fn module_with_icon() -> Vec<u8> {
    module(&[(3, 1), (14, 1)])
}

/// Image with string and version resources only
pub fn module_with_strings() -> Vec<u8> {
    module(&[(6, 2), (16, 1)])
}

/// Image without any resources
pub fn module_without_resources() -> Vec<u8> {
    module(&[])
}

/// Write `bytes` at `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Build the reference tree:
///
/// ```text
/// root/
///   a.dll      (has an icon)
///   b.dll      (no resources at all)
///   c.txt      (not a module)
///   sub/
///     d.dll    (corrupt header)
/// ```
pub fn build_reference_tree(root: &Path) {
    write_file(root, "a.dll", &module_with_icon());
    write_file(root, "b.dll", &module_without_resources());
    write_file(root, "c.txt", b"plain text");
    write_file(root, "sub/d.dll", b"MZ but nothing else worth loading");
}
