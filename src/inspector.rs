//! Per-file module inspection

use log::debug;
use std::path::Path;

use crate::loader::{ModuleLoader, ResourceView};
use crate::models::{InspectionResult, ResourceType};

/// Answers "does this module embed a resource of type X" for one file at a time.
///
/// Stateless across calls; each call loads and releases its own image.
#[derive(Debug, Clone)]
pub struct ModuleInspector<L> {
    loader: L,
    resource_type: ResourceType,
}

impl<L: ModuleLoader> ModuleInspector<L> {
    /// Create an inspector looking for `resource_type`
    pub fn new(loader: L, resource_type: ResourceType) -> Self {
        Self {
            loader,
            resource_type,
        }
    }

    /// Create an inspector looking for icons
    pub fn icons(loader: L) -> Self {
        Self::new(loader, ResourceType::ICON)
    }

    /// The backend in use
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Inspect a single file. Never fails: every problem becomes a verdict.
    pub fn inspect(&self, path: &Path) -> InspectionResult {
        let mut view = match self.loader.open_resource_view(path) {
            Ok(view) => view,
            Err(code) => {
                debug!(
                    "{}: load failed with {} ({})",
                    path.display(),
                    code,
                    code.name().unwrap_or("unknown")
                );
                return InspectionResult::LoadFailed(code);
            }
        };

        let result = match view.has_resource_of_type(self.resource_type) {
            Ok(true) => InspectionResult::HasIcon,
            Ok(false) => InspectionResult::NoIcon,
            Err(code) if code.means_absent() => InspectionResult::NoIcon,
            Err(code) => InspectionResult::QueryFailed(code),
        };
        drop(view);

        debug!("{}: {}", path.display(), result.as_str());
        result
    }
}
