//! Report output in JSON and JSONL, plus a running tally of outcomes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::types::EventReport;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array written at the end
    Json,
    /// One JSON object per line, written as events finish
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes items to JSON or JSONL.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch: an array for JSON, one line each for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Outcome counts over a run, with quarantines broken down by class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportTally {
    pub published: usize,
    pub quarantined: usize,
    pub derivatives_written: usize,
    pub by_kind: BTreeMap<String, usize>,
}

impl ReportTally {
    pub fn record(&mut self, report: &EventReport) {
        self.derivatives_written += report.derivatives.len();
        match report.failure_kind() {
            None => self.published += 1,
            Some(kind) => {
                self.quarantined += 1;
                *self.by_kind.entry(kind.to_string()).or_default() += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.published + self.quarantined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::types::{EventOutcome, ImageRecordUpdate, PipelineStage};

    fn published(key: &str) -> EventReport {
        EventReport {
            key: format!("staging/{key}.jpg"),
            slug: Some(key.to_string()),
            stage: PipelineStage::Published,
            outcome: EventOutcome::Published {
                object_key: format!("2024/{key}.jpg"),
                record: ImageRecordUpdate {
                    slug: key.to_string(),
                    width: 10,
                    height: 10,
                    size: 100,
                    capture_date: String::new(),
                    object_key: format!("2024/{key}.jpg"),
                },
            },
            rotation: Some(0),
            derivatives: vec![format!("2024/{key}_blur.jpg")],
            elapsed_ms: 3,
        }
    }

    fn quarantined(kind: FailureKind) -> EventReport {
        EventReport {
            key: "staging/bad".to_string(),
            slug: None,
            stage: PipelineStage::Received,
            outcome: EventOutcome::Quarantined {
                kind,
                reason: "bad".to_string(),
            },
            rotation: None,
            derivatives: vec![],
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_write_jsonl_reports() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write(&published("a")).unwrap();
        writer.write(&quarantined(FailureKind::MalformedKey)).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "published");
        assert_eq!(lines[1]["kind"], "malformed_key");
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&[published("a"), published("b")]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), None);
    }

    #[test]
    fn test_tally_groups_quarantines_by_kind() {
        let mut tally = ReportTally::default();
        tally.record(&published("a"));
        tally.record(&quarantined(FailureKind::DecodeFailure));
        tally.record(&quarantined(FailureKind::DecodeFailure));
        tally.record(&quarantined(FailureKind::StorageFailure));

        assert_eq!(tally.total(), 4);
        assert_eq!(tally.published, 1);
        assert_eq!(tally.derivatives_written, 1);
        assert_eq!(tally.by_kind["DecodeFailure"], 2);
        assert_eq!(tally.by_kind["StorageFailure"], 1);
    }
}
