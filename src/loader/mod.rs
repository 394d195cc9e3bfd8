//! Module loading backends
//!
//! A backend opens a file as a resource-only module image and answers
//! existence queries against its resource directory. Nothing in the image
//! is executed; the view is released when it is dropped.

pub mod pe;
#[cfg(windows)]
pub mod system;

use std::path::Path;

use crate::error::ErrorCode;
use crate::models::ResourceType;

pub use pe::{PeLoader, PeView};
#[cfg(windows)]
pub use system::{SystemLoader, SystemView};

/// Opens files as resource-only module images
pub trait ModuleLoader {
    /// Open image handle; releasing it unloads the module
    type View: ResourceView;

    /// Load `path` in data-file mode
    fn open_resource_view(&self, path: &Path) -> Result<Self::View, ErrorCode>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// A loaded module's resource directory
pub trait ResourceView {
    /// Whether at least one resource of `kind` exists.
    ///
    /// Stops at the first matching entry. A module without resources of
    /// `kind`, or without any resources at all, answers `Ok(false)`.
    fn has_resource_of_type(&mut self, kind: ResourceType) -> Result<bool, ErrorCode>;
}
