//! Finds loadable modules that embed icon resources
//!
//! This library walks a directory tree, opens every module file as a
//! resource-only image and reports whether it carries at least one icon.

pub mod config;
pub mod error;
pub mod inspector;
pub mod loader;
pub mod models;
pub mod report;
pub mod scanner;
#[doc(hidden)]
pub mod testutil;

pub use config::{Backend, OutputFormat, ScanConfig};
pub use error::{ErrorCode, ScanError, ScanErrorKind};
pub use inspector::ModuleInspector;
pub use loader::{ModuleLoader, PeLoader, ResourceView};
#[cfg(windows)]
pub use loader::SystemLoader;
pub use models::{InspectionResult, ResourceType, ScanRecord, ScanSummary};
pub use report::{JsonReport, ReportSink, TextReport};
pub use scanner::{candidates, run_scan, scan};
