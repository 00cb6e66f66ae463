//! Plan records and their JSON / JSON Lines writer.
//!
//! Every command produces a plan: one record per target photo, duplicate
//! group or folder. Nothing is applied; the records say what would change.
//! JSONL streams records as they are produced; JSON collects them and emits a
//! single array on [`PlanWriter::finish`].

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::duplicates::DuplicateGroup;
use crate::inference::Estimate;
use crate::merge::{recovery_path, MergeDecision, Recommendation};
use crate::pipeline::ExtractionFailure;
use crate::types::{PhotoId, ProcessingStats};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Inferred metadata for one target photo.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreRecord {
    pub target: PhotoId,
    /// Date the target already carries, if any
    pub existing_date: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub estimate: Estimate,
}

/// Decision for one duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct DedupeRecord {
    pub label: String,
    #[serde(flatten)]
    pub group: DuplicateGroup,
    /// Where the superseded members belong
    pub recovery_path: PathBuf,
    pub recommendation: Recommendation,
    pub decision: MergeDecision,
}

impl DedupeRecord {
    pub fn new(
        group: DuplicateGroup,
        recovery_dir: &Path,
        recommendation: Recommendation,
        decision: MergeDecision,
    ) -> Self {
        Self {
            label: group.label(),
            recovery_path: recovery_path(recovery_dir, &group),
            group,
            recommendation,
            decision,
        }
    }
}

/// A photo that could not be fingerprinted.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub error: String,
}

impl From<&ExtractionFailure> for FailureRecord {
    fn from(failure: &ExtractionFailure) -> Self {
        Self {
            path: failure.path.clone(),
            error: failure.error.to_string(),
        }
    }
}

/// Closing record of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: ProcessingStats,
    pub failures: Vec<FailureRecord>,
    pub cancelled: bool,
}

/// Serializes plan records in the chosen format.
pub struct PlanWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<serde_json::Value>,
    records_written: usize,
}

impl<W: Write> PlanWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            records_written: 0,
        }
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.pending
                    .push(serde_json::to_value(record).map_err(io::Error::other)?);
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.records_written += 1;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> io::Result<()> {
        records.iter().try_for_each(|r| self.write(r))
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Emit buffered JSON, flush, and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            let pending = std::mem::take(&mut self.pending);
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &pending)
            } else {
                serde_json::to_writer(&mut self.writer, &pending)
            }
            .map_err(io::Error::other)?;
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{ContentChecksum, MatchKind};
    use crate::inference::NoEstimateReason;
    use crate::merge::{MergeStrategy, RecommendationReason};

    fn no_estimate(target: &str) -> RestoreRecord {
        RestoreRecord {
            target: PhotoId::new(target),
            existing_date: None,
            estimate: Estimate::NoEstimate {
                reason: NoEstimateReason::InsufficientCandidates,
                considered: 3,
            },
        }
    }

    #[test]
    fn test_jsonl_streams_one_line_per_record() {
        let mut writer = PlanWriter::new(Vec::new(), OutputFormat::JsonLines, true);
        writer.write(&no_estimate("a.jpg")).unwrap();
        writer.write(&no_estimate("b.jpg")).unwrap();
        assert_eq!(writer.records_written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["target"], "a.jpg");
        assert_eq!(first["outcome"], "no_estimate");
    }

    #[test]
    fn test_json_emits_single_array_on_finish() {
        let mut writer = PlanWriter::new(Vec::new(), OutputFormat::Json, false);
        writer
            .write_all(&[no_estimate("a.jpg"), no_estimate("b.jpg")])
            .unwrap();
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_empty_json_is_empty_array() {
        let writer = PlanWriter::new(Vec::new(), OutputFormat::Json, false);
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(output.trim(), "[]");
    }

    #[test]
    fn test_dedupe_record_fields() {
        let checksum = ContentChecksum::of_bytes(b"photo");
        let group = DuplicateGroup {
            kind: MatchKind::Exact {
                checksum: checksum.clone(),
            },
            members: vec![PhotoId::new("a.jpg"), PhotoId::new("b.jpg")],
        };
        let record = DedupeRecord::new(
            group,
            Path::new("/backup"),
            Recommendation {
                strategy: MergeStrategy::SmartMerge,
                reason: RecommendationReason::Mixed,
            },
            MergeDecision::KeepAll,
        );
        assert_eq!(
            record.recovery_path,
            PathBuf::from(format!("/backup/group_{}", checksum.short()))
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"]["type"], "exact");
        assert_eq!(value["members"][1], "b.jpg");
        assert_eq!(value["decision"]["decision"], "keep_all");
        assert_eq!(value["recommendation"]["strategy"], "smart_merge");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!(
            "JSONL".parse::<OutputFormat>(),
            Ok(OutputFormat::JsonLines)
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
