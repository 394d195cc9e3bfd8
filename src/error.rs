//! Error types for the icon scanner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that can occur during a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Scan root does not exist or is not a directory
    PathNotFound,
    /// Permission denied when reading a directory entry
    PermissionDenied,
    /// I/O error during traversal
    IoError,
    /// Writing a report line failed
    Output,
}

/// Represents a run-level error that occurred during scanning
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a path-not-found error for the scan root
    pub fn path_not_found(path: PathBuf) -> Self {
        Self::new(
            ScanErrorKind::PathNotFound,
            Some(path.clone()),
            format!("Path does not exist: {:?}", path),
        )
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::Output, None, message)
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorKind::PermissionDenied,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let kind = if err.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied)
        {
            ScanErrorKind::PermissionDenied
        } else {
            ScanErrorKind::IoError
        };
        Self::new(kind, path, err.to_string())
    }
}

/// Platform-style failure code reported for a single module.
///
/// Values follow the Windows system error numbering so that both loader
/// backends print the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const FILE_NOT_FOUND: ErrorCode = ErrorCode(2);
    pub const ACCESS_DENIED: ErrorCode = ErrorCode(5);
    pub const INVALID_DATA: ErrorCode = ErrorCode(13);
    pub const READ_FAULT: ErrorCode = ErrorCode(30);
    pub const SHARING_VIOLATION: ErrorCode = ErrorCode(32);
    pub const BAD_EXE_FORMAT: ErrorCode = ErrorCode(193);
    pub const RESOURCE_DATA_NOT_FOUND: ErrorCode = ErrorCode(1812);
    pub const RESOURCE_TYPE_NOT_FOUND: ErrorCode = ErrorCode(1813);
    pub const RESOURCE_ENUM_USER_STOP: ErrorCode = ErrorCode(15106);

    /// Whether the code only says the module has no resources of the queried type
    pub fn means_absent(self) -> bool {
        self == Self::RESOURCE_TYPE_NOT_FOUND || self == Self::RESOURCE_DATA_NOT_FOUND
    }

    /// Short symbolic name for well-known codes
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            2 => Some("ERROR_FILE_NOT_FOUND"),
            5 => Some("ERROR_ACCESS_DENIED"),
            13 => Some("ERROR_INVALID_DATA"),
            30 => Some("ERROR_READ_FAULT"),
            32 => Some("ERROR_SHARING_VIOLATION"),
            193 => Some("ERROR_BAD_EXE_FORMAT"),
            1812 => Some("ERROR_RESOURCE_DATA_NOT_FOUND"),
            1813 => Some("ERROR_RESOURCE_TYPE_NOT_FOUND"),
            15106 => Some("ERROR_RESOURCE_ENUM_USER_STOP"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&std::io::Error> for ErrorCode {
    fn from(err: &std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) if cfg!(windows) => ErrorCode(code as u32),
            // errno values overlap the Windows numbering, so map by kind
            Some(_) => match err.kind() {
                std::io::ErrorKind::NotFound => Self::FILE_NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => Self::ACCESS_DENIED,
                _ => Self::READ_FAULT,
            },
            // Short reads surface as UnexpectedEof without an OS code
            None if err.kind() == std::io::ErrorKind::UnexpectedEof => Self::BAD_EXE_FORMAT,
            None => Self::INVALID_DATA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display_is_numeric() {
        assert_eq!(ErrorCode::BAD_EXE_FORMAT.to_string(), "193");
        assert_eq!(ErrorCode(5).to_string(), "5");
    }

    #[test]
    fn test_means_absent() {
        assert!(ErrorCode::RESOURCE_TYPE_NOT_FOUND.means_absent());
        assert!(ErrorCode::RESOURCE_DATA_NOT_FOUND.means_absent());
        assert!(!ErrorCode::SHARING_VIOLATION.means_absent());
        assert!(!ErrorCode::INVALID_DATA.means_absent());
    }

    #[test]
    fn test_io_error_conversion() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(ErrorCode::from(&eof), ErrorCode::BAD_EXE_FORMAT);
    }

    #[cfg(windows)]
    #[test]
    fn test_os_error_passes_through() {
        let os = std::io::Error::from_raw_os_error(32);
        assert_eq!(ErrorCode::from(&os), ErrorCode::SHARING_VIOLATION);
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_is_mapped_to_windows_numbering() {
        // EACCES is 13, which must not read as ERROR_INVALID_DATA
        let denied = ErrorCode::from(&std::io::Error::from_raw_os_error(13));
        assert_eq!(denied, ErrorCode::ACCESS_DENIED);
        assert_eq!(denied.name(), Some("ERROR_ACCESS_DENIED"));

        let missing = ErrorCode::from(&std::io::Error::from_raw_os_error(2));
        assert_eq!(missing, ErrorCode::FILE_NOT_FOUND);

        // EIO
        let io = ErrorCode::from(&std::io::Error::from_raw_os_error(5));
        assert_eq!(io, ErrorCode::READ_FAULT);
    }

    #[test]
    fn test_error_code_names() {
        assert_eq!(ErrorCode(32).name(), Some("ERROR_SHARING_VIOLATION"));
        assert_eq!(ErrorCode(1813).name(), Some("ERROR_RESOURCE_TYPE_NOT_FOUND"));
        assert_eq!(ErrorCode(7).name(), None);
    }

    #[test]
    fn test_path_not_found() {
        let err = ScanError::path_not_found(PathBuf::from("/missing"));
        assert_eq!(err.kind, ScanErrorKind::PathNotFound);
        assert_eq!(err.path, Some(PathBuf::from("/missing")));
    }

    #[test]
    fn test_from_io_error_kind() {
        let err: ScanError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(err.kind, ScanErrorKind::PermissionDenied);
        assert!(err.path.is_none());
    }
}
