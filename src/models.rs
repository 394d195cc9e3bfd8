//! Core data models for the icon scanner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ErrorCode, ScanError};

/// Integer resource type identifier (`RT_*` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(pub u16);

impl ResourceType {
    pub const CURSOR: ResourceType = ResourceType(1);
    pub const BITMAP: ResourceType = ResourceType(2);
    pub const ICON: ResourceType = ResourceType(3);
    pub const STRING: ResourceType = ResourceType(6);
    pub const GROUP_ICON: ResourceType = ResourceType(14);
    pub const VERSION: ResourceType = ResourceType(16);

    /// Numeric id as stored in the resource directory
    pub fn id(self) -> u16 {
        self.0
    }
}

impl Default for ResourceType {
    fn default() -> Self {
        Self::ICON
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CURSOR => write!(f, "RT_CURSOR"),
            Self::BITMAP => write!(f, "RT_BITMAP"),
            Self::ICON => write!(f, "RT_ICON"),
            Self::STRING => write!(f, "RT_STRING"),
            Self::GROUP_ICON => write!(f, "RT_GROUP_ICON"),
            Self::VERSION => write!(f, "RT_VERSION"),
            other => write!(f, "#{}", other.0),
        }
    }
}

/// Verdict for a single inspected module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "code", rename_all = "snake_case")]
pub enum InspectionResult {
    /// At least one resource of the queried type exists
    HasIcon,
    /// The module loaded but holds no resource of the queried type
    NoIcon,
    /// The file could not be opened as a module image
    LoadFailed(ErrorCode),
    /// The resource directory could not be queried
    QueryFailed(ErrorCode),
}

impl InspectionResult {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionResult::HasIcon => "has_icon",
            InspectionResult::NoIcon => "no_icon",
            InspectionResult::LoadFailed(_) => "load_failed",
            InspectionResult::QueryFailed(_) => "query_failed",
        }
    }

    /// Failure code, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            InspectionResult::LoadFailed(code) | InspectionResult::QueryFailed(code) => {
                Some(*code)
            }
            _ => None,
        }
    }
}

/// One inspected file and its verdict, in traversal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Path of the module as produced by the directory walk
    pub path: PathBuf,
    /// Verdict for the module
    pub result: InspectionResult,
}

impl ScanRecord {
    /// Create a new record
    pub fn new(path: PathBuf, result: InspectionResult) -> Self {
        Self { path, result }
    }
}

/// Counters collected over a scan run
#[derive(Debug, Default, Serialize)]
pub struct ScanSummary {
    /// Directories visited, root included
    pub dirs_visited: u64,
    /// Candidate modules inspected
    pub inspected: u64,
    /// Modules with at least one icon
    pub with_icon: u64,
    /// Modules without icons
    pub without_icon: u64,
    /// Modules that could not be loaded
    pub load_failures: u64,
    /// Modules whose resources could not be queried
    pub query_failures: u64,
    /// Traversal errors that were skipped
    #[serde(skip)]
    pub errors: Vec<ScanError>,
    /// Total scan duration in milliseconds
    pub duration_ms: u64,
}

impl ScanSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one inspection outcome
    pub fn record(&mut self, result: &InspectionResult) {
        self.inspected += 1;
        match result {
            InspectionResult::HasIcon => self.with_icon += 1,
            InspectionResult::NoIcon => self.without_icon += 1,
            InspectionResult::LoadFailed(_) => self.load_failures += 1,
            InspectionResult::QueryFailed(_) => self.query_failures += 1,
        }
    }

    /// Get the number of traversal errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
