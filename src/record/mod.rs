// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Provenance of a protocol run.
//!
//! A [`RecordBuilder`] is created when the run starts and collects entries as activities
//! complete or fail. [`RecordBuilder::finish`] turns it into an immutable
//! [`ExecutionRecord`] once `Final` is reached or the run stops.

mod entry;
mod timestamp;

pub use entry::{Failure, Outcome, RecordEntry, RunStatus, RunWarning};
pub use timestamp::{TimeMode, Timestamp};

use crate::graph::Outputs;
use crate::resources::ResourceSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunHeader {
    pub execution_id: String,
    pub protocol: String,
    pub agent: String,
    pub time_mode: TimeMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RunWarning>,
    pub outputs: Outputs,
    pub resources: ResourceSnapshot,
    /// Rendered artifacts keyed by specialization name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    header: RunHeader,
    entries: Vec<RecordEntry>,
    footer: Footer,
}

impl ExecutionRecord {
    pub fn header(&self) -> &RunHeader {
        &self.header
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn status(&self) -> RunStatus {
        self.footer.status
    }

    /// First entry recorded for an activity path.
    pub fn entry(&self, activity: &str) -> Option<&RecordEntry> {
        self.entries.iter().find(|entry| entry.activity == activity)
    }

    pub fn artifact(&self, specialization: &str) -> Option<&str> {
        self.footer.artifacts.get(specialization).map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Accumulates a record while the run is in progress.
#[derive(Debug)]
pub struct RecordBuilder {
    header: RunHeader,
    entries: Vec<RecordEntry>,
    failures: Vec<Failure>,
    warnings: Vec<RunWarning>,
}

impl RecordBuilder {
    pub fn new(header: RunHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: RecordEntry) {
        self.entries.push(entry);
    }

    pub fn fail(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn warn(&mut self, warning: RunWarning) {
        self.warnings.push(warning);
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn finish(
        self,
        status: RunStatus,
        outputs: Outputs,
        resources: ResourceSnapshot,
        artifacts: BTreeMap<String, String>,
    ) -> ExecutionRecord {
        ExecutionRecord {
            header: self.header,
            entries: self.entries,
            footer: Footer {
                status,
                failures: self.failures,
                warnings: self.warnings,
                outputs,
                resources,
                artifacts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, ExecutionError};
    use crate::graph::{ActivityKind, NodeId, Value};

    fn header() -> RunHeader {
        RunHeader {
            execution_id: "run-1".into(),
            protocol: "toy".into(),
            agent: "tester".into(),
            time_mode: TimeMode::OrdinalTime,
        }
    }

    #[test]
    fn test_builder_collects_entries_and_failures() {
        let mut builder = RecordBuilder::new(header());
        builder.push(RecordEntry::control(
            NodeId(0),
            "initial",
            ActivityKind::Initial,
            Timestamp::Ordinal(1),
            Timestamp::Ordinal(2),
        ));
        let error = ExecutionError::Internal {
            message: "boom".into(),
        };
        builder.fail(Failure::from(&error));
        builder.warn(RunWarning::JoinBlocked {
            join: "join".into(),
        });
        assert_eq!(builder.failure_count(), 1);

        let mut outputs = Outputs::new();
        outputs.insert("volume".into(), Value::microliters(5.0));
        let record = builder.finish(
            RunStatus::Failed,
            outputs,
            ResourceSnapshot::new(),
            BTreeMap::new(),
        );

        assert_eq!(record.status(), RunStatus::Failed);
        assert_eq!(record.entries().len(), 1);
        assert!(record.entry("initial").unwrap().is_completed());
        assert_eq!(record.footer().failures[0].kind, ErrorKind::Internal);
        assert_eq!(record.footer().failures[0].activity, None);
        assert_eq!(record.artifact("script"), None);
    }

    #[test]
    fn test_json_shape() {
        let mut builder = RecordBuilder::new(header());
        builder.push(RecordEntry::control(
            NodeId(3),
            "fork",
            ActivityKind::Fork,
            Timestamp::Ordinal(4),
            Timestamp::Ordinal(4),
        ));
        let record = builder.finish(
            RunStatus::Completed,
            Outputs::new(),
            ResourceSnapshot::new(),
            BTreeMap::new(),
        );

        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["header"]["time_mode"], "ordinal_time");
        assert_eq!(json["entries"][0]["node"], 3);
        assert_eq!(json["entries"][0]["kind"], "fork");
        assert_eq!(json["entries"][0]["outcome"]["status"], "completed");
        assert!(json["entries"][0].get("inputs").is_none());
        assert_eq!(json["footer"]["status"], "completed");
        assert!(json["footer"].get("failures").is_none());
    }
}
