//! Configuration for the icon scanner

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::ResourceType;

/// Default module extension
pub const DEFAULT_EXTENSION: &str = "dll";

/// Default number of inspection workers (sequential)
pub const DEFAULT_JOBS: usize = 1;

/// Report format written to standard output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per reported module
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Which module loader inspects candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The operating system loader where one exists, otherwise the PE parser
    #[default]
    Native,
    /// The built-in PE resource parser on every platform
    Portable,
}

/// Configuration for the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Module extensions to inspect (lowercase, without dot)
    pub extensions: HashSet<String>,

    /// Resource type whose presence is reported
    pub resource_type: ResourceType,

    /// Whether to descend into symlinked directories
    pub follow_links: bool,

    /// Number of inspection workers
    /// 0 means one per available CPU
    pub jobs: usize,

    /// Whether modules without the resource get a report line
    pub report_missing: bool,

    /// Output format
    pub format: OutputFormat,

    /// Loader backend
    pub backend: Backend,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            extensions: Self::default_extensions(),
            resource_type: ResourceType::ICON,
            follow_links: false,
            jobs: DEFAULT_JOBS,
            report_missing: false,
            format: OutputFormat::Text,
            backend: Backend::Native,
        }
    }
}

impl ScanConfig {
    /// Create a new config for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// Get the default module extensions
    pub fn default_extensions() -> HashSet<String> {
        [DEFAULT_EXTENSION].iter().map(|s| s.to_string()).collect()
    }

    /// Check if an extension identifies a module (case-insensitive)
    pub fn should_include_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext.to_lowercase())
    }

    /// Get the effective number of workers
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1)
        } else {
            self.jobs
        }
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Replace the extension list; entries are normalised to lowercase
    /// without a leading dot. An empty list keeps the default.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalised: HashSet<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if !normalised.is_empty() {
            self.config.extensions = normalised;
        }
        self
    }

    /// Set the resource type to look for
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.config.resource_type = resource_type;
        self
    }

    /// Enable or disable following symlinked directories
    pub fn follow_links(mut self, enabled: bool) -> Self {
        self.config.follow_links = enabled;
        self
    }

    /// Set the number of workers
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    /// Enable or disable reporting of modules without the resource
    pub fn report_missing(mut self, enabled: bool) -> Self {
        self.config.report_missing = enabled;
        self
    }

    /// Set the output format
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Set the loader backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}
