//! Scanner module - walks the tree and inspects every module file

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::inspector::ModuleInspector;
use crate::loader::ModuleLoader;
use crate::models::{ScanRecord, ScanSummary};
use crate::report::ReportSink;

/// Candidates handed to the worker pool at once in parallel mode
pub const PARALLEL_BATCH_SIZE: usize = 256;

/// Lazily walks the scan root and yields module files in traversal order.
///
/// Directories are entered after the files next to them; within each group
/// entries are sorted by name, so two walks of an unchanged tree agree.
pub struct Candidates<'a> {
    config: &'a ScanConfig,
    walker: walkdir::IntoIter,
    dirs_visited: u64,
    errors: Vec<ScanError>,
}

impl<'a> Candidates<'a> {
    fn new(config: &'a ScanConfig) -> Self {
        let walker = WalkDir::new(&config.root)
            .follow_links(config.follow_links)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter();

        Self {
            config,
            walker,
            dirs_visited: 0,
            errors: Vec::new(),
        }
    }

    /// Directories entered so far, root included
    pub fn dirs_visited(&self) -> u64 {
        self.dirs_visited
    }

    /// Traversal errors skipped so far
    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    /// Take the skipped traversal errors
    pub fn take_errors(&mut self) -> Vec<ScanError> {
        std::mem::take(&mut self.errors)
    }
}

impl Iterator for Candidates<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.walker.by_ref() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        self.dirs_visited += 1;
                        continue;
                    }
                    if is_module_file(&entry, self.config) {
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    let error = ScanError::from(e);
                    warn!("Skipping unreadable entry: {}", error.message);
                    self.errors.push(error);
                }
            }
        }
        None
    }
}

/// Lazy sequence of inspection records; finite and not restartable
pub struct Scan<'a, L> {
    candidates: Candidates<'a>,
    inspector: &'a ModuleInspector<L>,
}

impl<'a, L: ModuleLoader> Scan<'a, L> {
    /// The underlying walk
    pub fn candidates(&self) -> &Candidates<'a> {
        &self.candidates
    }

    /// Consume the scan, returning the walk state
    pub fn into_candidates(self) -> Candidates<'a> {
        self.candidates
    }
}

impl<L: ModuleLoader> Iterator for Scan<'_, L> {
    type Item = ScanRecord;

    fn next(&mut self) -> Option<ScanRecord> {
        let path = self.candidates.next()?;
        let result = self.inspector.inspect(&path);
        Some(ScanRecord::new(path, result))
    }
}

/// Start walking the configured root.
///
/// Fails before touching any file when the root is missing, not a
/// directory, or cannot be listed.
pub fn candidates(config: &ScanConfig) -> Result<Candidates<'_>, ScanError> {
    check_root(&config.root)?;
    Ok(Candidates::new(config))
}

/// Start a lazy scan: walk and inspect one file per `next()`
pub fn scan<'a, L: ModuleLoader>(
    config: &'a ScanConfig,
    inspector: &'a ModuleInspector<L>,
) -> Result<Scan<'a, L>, ScanError> {
    Ok(Scan {
        candidates: candidates(config)?,
        inspector,
    })
}

/// Scan the configured root and forward every record to `sink`.
///
/// Runs sequentially unless more than one job is configured; records reach
/// the sink in traversal order either way.
pub fn run_scan<L, S>(
    config: &ScanConfig,
    inspector: &ModuleInspector<L>,
    sink: &mut S,
) -> Result<ScanSummary, ScanError>
where
    L: ModuleLoader + Sync,
    S: ReportSink + ?Sized,
{
    let start = Instant::now();
    let mut candidates = candidates(config)?;
    let mut summary = ScanSummary::new();
    let jobs = config.effective_jobs();

    info!(
        "Scanning {} with the {} loader ({} job(s))",
        config.root.display(),
        inspector.loader().name(),
        jobs
    );
    sink.begin(config).map_err(output_error)?;

    if jobs <= 1 {
        for path in candidates.by_ref() {
            let record = ScanRecord::new(path.clone(), inspector.inspect(&path));
            emit(sink, &mut summary, &record)?;
        }
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => loop {
                let batch: Vec<PathBuf> =
                    candidates.by_ref().take(PARALLEL_BATCH_SIZE).collect();
                if batch.is_empty() {
                    break;
                }
                debug!("Inspecting batch of {} modules", batch.len());
                let records: Vec<ScanRecord> = pool.install(|| {
                    batch
                        .into_par_iter()
                        .map(|path| {
                            let result = inspector.inspect(&path);
                            ScanRecord::new(path, result)
                        })
                        .collect()
                });
                for record in &records {
                    emit(sink, &mut summary, record)?;
                }
            },
            Err(e) => {
                warn!("Failed to build worker pool, scanning sequentially: {}", e);
                for path in candidates.by_ref() {
                    let record = ScanRecord::new(path.clone(), inspector.inspect(&path));
                    emit(sink, &mut summary, &record)?;
                }
            }
        }
    }

    summary.dirs_visited = candidates.dirs_visited();
    summary.errors = candidates.take_errors();
    summary.duration_ms = start.elapsed().as_millis() as u64;
    sink.finish(&summary).map_err(output_error)?;

    Ok(summary)
}

fn emit<S: ReportSink + ?Sized>(
    sink: &mut S,
    summary: &mut ScanSummary,
    record: &ScanRecord,
) -> Result<(), ScanError> {
    summary.record(&record.result);
    sink.record(record).map_err(output_error)
}

fn output_error(err: std::io::Error) -> ScanError {
    ScanError::output(format!("Failed to write report: {}", err))
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    if root.as_os_str().is_empty() || !root.is_dir() {
        return Err(ScanError::path_not_found(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|e| {
        let mut error = ScanError::from(e);
        error.path = Some(root.to_path_buf());
        error
    })?;
    Ok(())
}

/// Whether a walked entry is a regular file carrying a module extension.
///
/// A symlink counts when its target is a regular file.
fn is_module_file(entry: &DirEntry, config: &ScanConfig) -> bool {
    let matches_extension = entry
        .path()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| config.should_include_extension(e))
        .unwrap_or(false);
    if !matches_extension {
        return false;
    }

    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink()
        && fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ScanErrorKind};
    use crate::loader::ResourceView;
    use crate::models::{InspectionResult, ResourceType};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Loads anything; the verdict comes from the file name
    #[derive(Default)]
    struct NameLoader {
        opened: Mutex<Vec<PathBuf>>,
    }

    struct NameView(String);

    impl ModuleLoader for NameLoader {
        type View = NameView;

        fn open_resource_view(&self, path: &Path) -> Result<NameView, ErrorCode> {
            self.opened.lock().unwrap().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_string_lossy().to_lowercase();
            if name.starts_with("corrupt") {
                return Err(ErrorCode::BAD_EXE_FORMAT);
            }
            Ok(NameView(name))
        }

        fn name(&self) -> &'static str {
            "name"
        }
    }

    impl ResourceView for NameView {
        fn has_resource_of_type(&mut self, _kind: ResourceType) -> Result<bool, ErrorCode> {
            if self.0.starts_with("broken") {
                return Err(ErrorCode::INVALID_DATA);
            }
            Ok(self.0.starts_with("icon"))
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn relative(root: &Path, records: &[ScanRecord]) -> Vec<(String, InspectionResult)> {
        records
            .iter()
            .map(|r| {
                let rel = r.path.strip_prefix(root).unwrap();
                (rel.to_string_lossy().replace('\\', "/"), r.result)
            })
            .collect()
    }

    #[test]
    fn test_missing_root_performs_no_inspection() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::new(dir.path().join("absent"));
        let inspector = ModuleInspector::icons(NameLoader::default());

        let err = scan(&config, &inspector).err().unwrap();
        assert_eq!(err.kind, ScanErrorKind::PathNotFound);
        assert!(inspector.loader().opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "icon.dll");
        let config = ScanConfig::new(dir.path().join("icon.dll"));
        let err = candidates(&config).err().unwrap();
        assert_eq!(err.kind, ScanErrorKind::PathNotFound);
    }

    #[test]
    fn test_files_before_subdirectories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/icon_nested.dll");
        touch(dir.path(), "z_plain.dll");
        touch(dir.path(), "icon_top.DLL");
        touch(dir.path(), "notes.txt");

        let config = ScanConfig::new(dir.path());
        let found: Vec<PathBuf> = candidates(&config).unwrap().collect();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["icon_top.DLL", "z_plain.dll", "icon_nested.dll"]);
    }

    #[test]
    fn test_failures_do_not_stop_the_scan() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "corrupt.dll");
        touch(dir.path(), "icon.dll");
        touch(dir.path(), "sub/broken.dll");
        touch(dir.path(), "sub/plain.dll");

        let config = ScanConfig::new(dir.path());
        let inspector = ModuleInspector::icons(NameLoader::default());
        let mut scan = scan(&config, &inspector).unwrap();
        let records: Vec<ScanRecord> = scan.by_ref().collect();
        assert_eq!(scan.candidates().dirs_visited(), 2);
        assert!(scan.into_candidates().errors().is_empty());

        assert_eq!(
            relative(dir.path(), &records),
            vec![
                ("corrupt.dll".to_string(), InspectionResult::LoadFailed(ErrorCode::BAD_EXE_FORMAT)),
                ("icon.dll".to_string(), InspectionResult::HasIcon),
                ("sub/broken.dll".to_string(), InspectionResult::QueryFailed(ErrorCode::INVALID_DATA)),
                ("sub/plain.dll".to_string(), InspectionResult::NoIcon),
            ]
        );
    }

    #[test]
    fn test_run_scan_summary() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "icon.dll");
        touch(dir.path(), "plain.dll");
        touch(dir.path(), "readme.md");
        touch(dir.path(), "x/y/corrupt.dll");

        let config = ScanConfig::new(dir.path());
        let inspector = ModuleInspector::icons(NameLoader::default());
        let mut records: Vec<ScanRecord> = Vec::new();
        let summary = run_scan(&config, &inspector, &mut records).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(summary.inspected, 3);
        assert_eq!(summary.with_icon, 1);
        assert_eq!(summary.without_icon, 1);
        assert_eq!(summary.load_failures, 1);
        assert_eq!(summary.dirs_visited, 3);
        assert_eq!(summary.error_count(), 0);
    }

    #[test]
    fn test_parallel_preserves_traversal_order() {
        let dir = TempDir::new().unwrap();
        for i in 0..(PARALLEL_BATCH_SIZE + 40) {
            let name = if i % 3 == 0 { "icon" } else { "plain" };
            touch(dir.path(), &format!("d{}/{}_{:04}.dll", i % 7, name, i));
        }

        let sequential_config = ScanConfig::new(dir.path());
        let parallel_config = ScanConfig::builder().root(dir.path()).jobs(4).build();
        let inspector = ModuleInspector::icons(NameLoader::default());

        let mut sequential: Vec<ScanRecord> = Vec::new();
        run_scan(&sequential_config, &inspector, &mut sequential).unwrap();
        let mut parallel: Vec<ScanRecord> = Vec::new();
        let summary = run_scan(&parallel_config, &inspector, &mut parallel).unwrap();

        assert_eq!(sequential.len(), PARALLEL_BATCH_SIZE + 40);
        assert_eq!(sequential, parallel);
        assert_eq!(summary.inspected, (PARALLEL_BATCH_SIZE + 40) as u64);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_is_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "icon.dll");
        touch(dir.path(), "sub/plain.dll");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("a_dangling.dll"))
            .unwrap();

        let config = ScanConfig::builder().root(dir.path()).follow_links(true).build();
        let inspector = ModuleInspector::icons(NameLoader::default());
        let mut records: Vec<ScanRecord> = Vec::new();
        let summary = run_scan(&config, &inspector, &mut records).unwrap();

        assert_eq!(
            relative(dir.path(), &records),
            vec![
                ("icon.dll".to_string(), InspectionResult::HasIcon),
                ("sub/plain.dll".to_string(), InspectionResult::NoIcon),
            ]
        );
        assert_eq!(summary.error_count(), 1);
        assert_eq!(summary.errors[0].kind, ScanErrorKind::IoError);
        assert_eq!(
            summary.errors[0].path.as_deref(),
            Some(dir.path().join("a_dangling.dll").as_path())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "real/icon.dll");
        std::os::unix::fs::symlink(dir.path().join("real/icon.dll"), dir.path().join("link.dll"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("linked_dir.dll"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.dll"), dir.path().join("dangling.dll"))
            .unwrap();

        let config = ScanConfig::new(dir.path());
        let found: Vec<PathBuf> = candidates(&config).unwrap().collect();
        assert_eq!(
            found,
            vec![dir.path().join("link.dll"), dir.path().join("real/icon.dll")]
        );
    }
}
