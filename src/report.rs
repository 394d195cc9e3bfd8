//! Report sinks for scan outcomes
//!
//! The text sink prints one line per reportable outcome. The JSON sink
//! prints one object per line with a `_t` type tag and a sequence number,
//! bracketed by a `start` and a `done` message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Instant;

use crate::config::ScanConfig;
use crate::error::ErrorCode;
use crate::models::{InspectionResult, ScanRecord, ScanSummary};

/// Receives scan outcomes in traversal order
pub trait ReportSink {
    /// Called once before the first record
    fn begin(&mut self, _config: &ScanConfig) -> io::Result<()> {
        Ok(())
    }

    /// Called once per inspected module
    fn record(&mut self, record: &ScanRecord) -> io::Result<()>;

    /// Called once after the last record
    fn finish(&mut self, _summary: &ScanSummary) -> io::Result<()> {
        Ok(())
    }
}

/// Collects every record, reportable or not
impl ReportSink for Vec<ScanRecord> {
    fn record(&mut self, record: &ScanRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Whether an outcome produces output.
///
/// Modules without the resource are silent unless `report_missing` is set.
pub fn is_reported(result: &InspectionResult, report_missing: bool) -> bool {
    match result {
        InspectionResult::NoIcon => report_missing,
        InspectionResult::QueryFailed(code) => !code.means_absent() || report_missing,
        _ => true,
    }
}

/// Render the text line for a record, if it has one
pub fn format_line(record: &ScanRecord, report_missing: bool) -> Option<String> {
    if !is_reported(&record.result, report_missing) {
        return None;
    }
    let path = record.path.display();
    let line = match record.result {
        InspectionResult::HasIcon => format!("{} contains at least one icon.", path),
        InspectionResult::LoadFailed(code) => format!("Error loading {}: {}", path, code),
        InspectionResult::QueryFailed(code) if !code.means_absent() => {
            format!("Error enumerating resources in {}: {}", path, code)
        }
        InspectionResult::NoIcon | InspectionResult::QueryFailed(_) => {
            format!("{} does not contain any icons.", path)
        }
    };
    Some(line)
}

/// Plain text report
pub struct TextReport<W> {
    writer: W,
    report_missing: bool,
}

impl<W: Write> TextReport<W> {
    /// Create a text report writing to `writer`
    pub fn new(writer: W, report_missing: bool) -> Self {
        Self {
            writer,
            report_missing,
        }
    }

    /// Get the writer back
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn record(&mut self, record: &ScanRecord) -> io::Result<()> {
        if let Some(line) = format_line(record, self.report_missing) {
            writeln!(self.writer, "{}", line)?;
        }
        Ok(())
    }

    fn finish(&mut self, _summary: &ScanSummary) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Start message sent when the scan begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Milliseconds since the report was created
    pub ts: u64,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Scan root
    pub root: String,
    /// Module extensions, sorted
    pub extensions: Vec<String>,
    /// Resource type id searched for
    pub resource_type: u16,
    /// Worker count
    pub jobs: usize,
}

/// One reported module
#[derive(Debug, Clone, Serialize)]
pub struct RecordMessage {
    /// Message type identifier ("r" for record)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Milliseconds since the report was created
    pub ts: u64,
    /// Module path
    pub path: String,
    /// Outcome name
    pub outcome: &'static str,
    /// Failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// Done message sent when the scan completes
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage<'a> {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Milliseconds since the report was created
    pub ts: u64,
    /// Final counters
    #[serde(flatten)]
    pub summary: &'a ScanSummary,
    /// Number of skipped traversal errors
    pub error_count: usize,
}

/// JSON lines report
pub struct JsonReport<W> {
    writer: W,
    report_missing: bool,
    seq: u64,
    start_time: Instant,
}

impl<W: Write> JsonReport<W> {
    /// Create a JSON report writing to `writer`
    pub fn new(writer: W, report_missing: bool) -> Self {
        Self {
            writer,
            report_missing,
            seq: 0,
            start_time: Instant::now(),
        }
    }

    /// Get the writer back
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn write_message<T: Serialize>(&mut self, msg: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, msg)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn begin(&mut self, config: &ScanConfig) -> io::Result<()> {
        let mut extensions: Vec<String> = config.extensions.iter().cloned().collect();
        extensions.sort();

        let msg = StartMessage {
            msg_type: "start",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            started_at: Utc::now(),
            root: config.root.to_string_lossy().to_string(),
            extensions,
            resource_type: config.resource_type.id(),
            jobs: config.effective_jobs(),
        };
        self.write_message(&msg)
    }

    fn record(&mut self, record: &ScanRecord) -> io::Result<()> {
        if !is_reported(&record.result, self.report_missing) {
            return Ok(());
        }
        let msg = RecordMessage {
            msg_type: "r",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            path: record.path.to_string_lossy().to_string(),
            outcome: record.result.as_str(),
            code: record.result.code(),
        };
        self.write_message(&msg)
    }

    fn finish(&mut self, summary: &ScanSummary) -> io::Result<()> {
        let msg = DoneMessage {
            msg_type: "done",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            summary,
            error_count: summary.error_count(),
        };
        self.write_message(&msg)?;
        self.writer.flush()
    }
}
