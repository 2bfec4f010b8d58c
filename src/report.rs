//! Report Model
//!
//! Serializable representation of a reconciliation result. A report is
//! created once by the reconciliation engine, persisted as JSON, and
//! never mutated afterwards; `reformat` only changes its rendering.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spec::LabelSpec;

/// A label as currently stored by the target repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedLabel {
    /// Label name
    pub name: String,

    /// Label color (6-digit hexadecimal, without #)
    pub color: String,

    /// Label description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A label attribute that can differ between spec and observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Color,
    Description,
}

/// Classification of a single label comparison outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Disposition {
    /// Spec and observed state agree on all enforced fields
    Unchanged,

    /// Spec present, no observed match
    Create,

    /// Matched by canonical name but attributes differ
    Modify { fields: Vec<Field> },

    /// Observed present, no spec match
    Delete,

    /// Observed name matches a spec alias; attribute differences
    /// ride along as a secondary modify facet
    Rename {
        from: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Field>,
    },

    /// Nothing to do and nothing to enforce
    Skip { reason: String },
}

/// The pairing of zero-or-one spec to zero-or-one observed label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Canonical name (observed name for deletions)
    pub name: String,

    /// Outcome of the comparison
    pub disposition: Disposition,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<LabelSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedLabel>,
}

/// Flags that were in effect when a report was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFlags {
    /// Optional labels were treated as required
    pub optional: bool,

    /// Alias matches were treated as renames
    pub alias: bool,
}

/// Reconciliation result for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Repository namespace (owner or organization)
    pub namespace: String,

    /// Repository name
    pub repository: String,

    /// Specification source paths the desired set was merged from
    pub sources: Vec<String>,

    /// Flags used during reconciliation
    pub flags: ReportFlags,

    /// Ordered comparison results, ascending by name (case-insensitive)
    pub entries: Vec<ReportEntry>,

    /// Warning notes attached during reconciliation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Report {
    /// Full target identifier in "namespace/repo" form
    pub fn target(&self) -> String {
        format!("{}/{}", self.namespace, self.repository)
    }

    fn count(&self, matches: impl Fn(&Disposition) -> bool) -> usize {
        self.entries.iter().filter(|e| matches(&e.disposition)).count()
    }

    pub fn unchanged(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Unchanged))
    }

    pub fn created(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Create))
    }

    pub fn modified(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Modify { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Delete))
    }

    pub fn renamed(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Rename { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|d| matches!(d, Disposition::Skip { .. }))
    }

    /// Whether applying this report would change the repository
    pub fn has_changes(&self) -> bool {
        self.created() + self.modified() + self.deleted() + self.renamed() > 0
    }
}

/// Serialize reports for persistence or JSON output
///
/// A single report serializes as one object, multiple reports as an
/// array. [`parse_reports`] accepts both shapes.
pub fn to_json(reports: &[Report]) -> Result<String> {
    if reports.len() == 1 {
        Ok(serde_json::to_string(&reports[0])?)
    } else {
        Ok(serde_json::to_string(reports)?)
    }
}

/// Parse one report or an array of reports from a JSON string
pub fn parse_reports(content: &str) -> Result<Vec<Report>> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

/// Load reports from a JSON file written by the `report` command
pub fn load_reports<P: AsRef<Path>>(path: P) -> Result<Vec<Report>> {
    let content = std::fs::read_to_string(path)?;
    parse_reports(&content)
}

/// Write reports to a JSON file
pub fn save_reports<P: AsRef<Path>>(path: P, reports: &[Report]) -> Result<()> {
    std::fs::write(path, to_json(reports)?).map_err(Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        Report {
            namespace: "octo".into(),
            repository: "widgets".into(),
            sources: vec!["labels.json".into()],
            flags: ReportFlags {
                optional: false,
                alias: true,
            },
            entries: vec![
                ReportEntry {
                    name: "bug".into(),
                    disposition: Disposition::Unchanged,
                    spec: Some(LabelSpec {
                        name: "bug".into(),
                        description: None,
                        color: Some("d73a4a".into()),
                        optional: false,
                        aliases: Vec::new(),
                    }),
                    observed: Some(ObservedLabel {
                        name: "bug".into(),
                        color: "D73A4A".into(),
                        description: None,
                    }),
                },
                ReportEntry {
                    name: "enhancement".into(),
                    disposition: Disposition::Rename {
                        from: "feature".into(),
                        fields: vec![Field::Color],
                    },
                    spec: Some(LabelSpec {
                        name: "enhancement".into(),
                        description: None,
                        color: Some("a2eeef".into()),
                        optional: false,
                        aliases: vec!["feature".into()],
                    }),
                    observed: Some(ObservedLabel {
                        name: "feature".into(),
                        color: "cccccc".into(),
                        description: None,
                    }),
                },
                ReportEntry {
                    name: "wontfix".into(),
                    disposition: Disposition::Delete,
                    spec: None,
                    observed: Some(ObservedLabel {
                        name: "wontfix".into(),
                        color: "ffffff".into(),
                        description: None,
                    }),
                },
            ],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let report = sample_report();
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.renamed(), 1);
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.created(), 0);
        assert!(report.has_changes());
    }

    #[test]
    fn test_unchanged_only_report_has_no_changes() {
        let mut report = sample_report();
        report.entries.retain(|e| e.disposition == Disposition::Unchanged);
        assert!(!report.has_changes());
    }

    #[test]
    fn test_single_report_round_trip() {
        let report = sample_report();
        let json = to_json(std::slice::from_ref(&report)).unwrap();
        let parsed = parse_reports(&json).unwrap();
        assert_eq!(parsed, vec![report]);
    }

    #[test]
    fn test_multi_report_round_trip() {
        let reports = vec![sample_report(), sample_report()];
        let json = to_json(&reports).unwrap();
        let parsed = parse_reports(&json).unwrap();
        assert_eq!(parsed, reports);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let reports = vec![sample_report()];
        save_reports(&path, &reports).unwrap();
        assert_eq!(load_reports(&path).unwrap(), reports);
    }

    #[test]
    fn test_disposition_tags_are_stable() {
        let json = serde_json::to_value(Disposition::Modify {
            fields: vec![Field::Description],
        })
        .unwrap();
        assert_eq!(json["kind"], "modify");
        assert_eq!(json["fields"][0], "description");

        let json = serde_json::to_value(Disposition::Skip {
            reason: "absent optional label".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "skip");
    }
}
