//! Audit rows emitted while matching and remodeling.
//!
//! The engine only calls [`ReportSink::report`]; formatting and persistence
//! belong to the sink. Two sinks ship with the crate: [`TracingReport`]
//! logs each row, [`MemoryReport`] keeps them for later serialisation.

use std::io::Write;

use serde::Serialize;
use snomed_types::{Concept, SctId};
use tracing::{info, warn};

/// How serious a report row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational.
    None,
    /// Routine change.
    Low,
    /// Needs a look.
    Medium,
    /// Needs attention.
    High,
    /// Blocks the concept.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// What happened to a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportActionType {
    /// General information.
    Info,
    /// Stated form already matches its template.
    Aligned,
    /// Concept does not match, or could not be brought into line.
    Misaligned,
    /// Concept skipped by an exclusion rule.
    Excluded,
    /// Stated form was remodelled.
    Remodelled,
    /// A stated relationship was added.
    RelationshipAdded,
    /// A stated relationship was removed.
    RelationshipRemoved,
    /// A stated relationship moved to a different group.
    RelationshipGroupModified,
    /// Per-concept validation failure; the concept was skipped.
    ValidationError,
}

impl std::fmt::Display for ReportActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Info => "INFO",
            Self::Aligned => "ALIGNED",
            Self::Misaligned => "MISALIGNED",
            Self::Excluded => "EXCLUDED",
            Self::Remodelled => "REMODELLED",
            Self::RelationshipAdded => "RELATIONSHIP_ADDED",
            Self::RelationshipRemoved => "RELATIONSHIP_REMOVED",
            Self::RelationshipGroupModified => "RELATIONSHIP_GROUP_MODIFIED",
            Self::ValidationError => "VALIDATION_ERROR",
        };
        f.write_str(name)
    }
}

/// Receives audit rows.
pub trait ReportSink {
    /// Records one row against a concept.
    fn report(
        &mut self,
        concept: &Concept,
        severity: Severity,
        action: ReportActionType,
        details: &str,
    );
}

impl<A: ReportSink, B: ReportSink> ReportSink for (A, B) {
    fn report(
        &mut self,
        concept: &Concept,
        severity: Severity,
        action: ReportActionType,
        details: &str,
    ) {
        self.0.report(concept, severity, action, details);
        self.1.report(concept, severity, action, details);
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn report(
        &mut self,
        concept: &Concept,
        severity: Severity,
        action: ReportActionType,
        details: &str,
    ) {
        (**self).report(concept, severity, action, details);
    }
}

/// Logs every row through `tracing`: validation errors and high severities
/// at `warn`, the rest at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReport;

impl ReportSink for TracingReport {
    fn report(
        &mut self,
        concept: &Concept,
        severity: Severity,
        action: ReportActionType,
        details: &str,
    ) {
        if action == ReportActionType::ValidationError || severity >= Severity::High {
            warn!(concept_id = concept.id, %severity, %action, "{}", details);
        } else {
            info!(concept_id = concept.id, %severity, %action, "{}", details);
        }
    }
}

/// One collected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Concept the row is about.
    pub concept_id: SctId,
    /// FSN at the time of reporting.
    pub fsn: Option<String>,
    /// Severity.
    pub severity: Severity,
    /// Action.
    pub action: ReportActionType,
    /// Free-text details.
    pub details: String,
}

/// Collects rows in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReport {
    rows: Vec<ReportRow>,
}

impl MemoryReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in the order they were reported.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Number of rows with the given action.
    pub fn count(&self, action: ReportActionType) -> usize {
        self.rows.iter().filter(|r| r.action == action).count()
    }

    /// Rows reported against one concept.
    pub fn rows_for(&self, concept_id: SctId) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.concept_id == concept_id)
    }

    /// Writes one JSON object per line.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for row in &self.rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl ReportSink for MemoryReport {
    fn report(
        &mut self,
        concept: &Concept,
        severity: Severity,
        action: ReportActionType,
        details: &str,
    ) {
        self.rows.push(ReportRow {
            concept_id: concept.id,
            fsn: concept.fsn.clone(),
            severity,
            action,
            details: details.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_report_collects_rows() {
        let concept = Concept::new(125605004).with_fsn("Fracture of bone (disorder)");
        let mut report = MemoryReport::new();
        report.report(&concept, Severity::Low, ReportActionType::Aligned, "A");
        report.report(&concept, Severity::High, ReportActionType::ValidationError, "oops");

        assert_eq!(report.rows().len(), 2);
        assert_eq!(report.count(ReportActionType::Aligned), 1);
        assert_eq!(report.rows_for(125605004).count(), 2);
        assert_eq!(report.rows_for(1).count(), 0);
    }

    #[test]
    fn test_json_lines() {
        let concept = Concept::new(125605004).with_fsn("Fracture of bone (disorder)");
        let mut report = MemoryReport::new();
        report.report(&concept, Severity::Medium, ReportActionType::Misaligned, "A 0 found");

        let mut out = Vec::new();
        report.write_json_lines(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["conceptId"], 125605004);
        assert_eq!(value["severity"], "MEDIUM");
        assert_eq!(value["action"], "MISALIGNED");
        assert_eq!(value["fsn"], "Fracture of bone (disorder)");
    }

    #[test]
    fn test_pair_sink_fans_out() {
        let concept = Concept::new(1);
        let mut sink = (MemoryReport::new(), MemoryReport::new());
        sink.report(&concept, Severity::None, ReportActionType::Info, "hello");
        assert_eq!(sink.0.rows(), sink.1.rows());
        assert_eq!(sink.0.rows()[0].details, "hello");
    }

    #[test]
    fn test_display_matches_serialised_names() {
        assert_eq!(ReportActionType::RelationshipGroupModified.to_string(), "RELATIONSHIP_GROUP_MODIFIED");
        assert_eq!(
            serde_json::to_value(ReportActionType::RelationshipGroupModified).unwrap(),
            "RELATIONSHIP_GROUP_MODIFIED"
        );
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
        assert!(Severity::Critical > Severity::Low);
    }
}
