//! Report Rendering
//!
//! Converts reports into Markdown, summary tables, and per-action
//! terminal lines. JSON rendering lives with the report model itself.

use crate::report::{Disposition, Field, Report, ReportEntry};

/// Build a width-aligned Markdown table
fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();

    for (header, width) in headers.iter().zip(&widths) {
        out.push_str(&format!("| {:>width$} ", header, width = *width));
    }
    out.push_str("|\n");

    for width in &widths {
        out.push('|');
        out.push_str(&"-".repeat(width + 2));
    }
    out.push_str("|\n");

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            out.push_str(&format!("| {:>width$} ", cell, width = *width));
        }
        out.push_str("|\n");
    }

    out
}

/// Render per-repository counts as a Markdown summary table
pub fn summary_table(reports: &[Report]) -> String {
    let headers = [
        "Repository",
        "Unchanged",
        "Create",
        "Delete",
        "Modify",
        "Rename",
        "Skip",
    ];

    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|report| {
            vec![
                report.repository.clone(),
                report.unchanged().to_string(),
                report.created().to_string(),
                report.deleted().to_string(),
                report.modified().to_string(),
                report.renamed().to_string(),
                report.skipped().to_string(),
            ]
        })
        .collect();

    markdown_table(&headers, &rows)
}

fn observed_color(entry: &ReportEntry) -> &str {
    entry.observed.as_ref().map(|o| o.color.as_str()).unwrap_or("(none)")
}

fn observed_description(entry: &ReportEntry) -> &str {
    entry
        .observed
        .as_ref()
        .and_then(|o| o.description.as_deref())
        .unwrap_or("(none)")
}

fn spec_color(entry: &ReportEntry) -> String {
    entry
        .spec
        .as_ref()
        .and_then(|s| s.normalized_color())
        .unwrap_or_else(|| "(none)".to_string())
}

fn spec_description(entry: &ReportEntry) -> &str {
    entry
        .spec
        .as_ref()
        .and_then(|s| s.description.as_deref())
        .unwrap_or("(none)")
}

/// Attribute change clauses for a modify or rename facet
fn change_lines(entry: &ReportEntry, fields: &[Field]) -> Vec<String> {
    let mut lines = Vec::new();
    if fields.contains(&Field::Color) {
        lines.push(format!(
            "Change color from '{}' to '{}'",
            observed_color(entry),
            spec_color(entry)
        ));
    }
    if fields.contains(&Field::Description) {
        lines.push(format!(
            "Change description from '{}' to '{}'",
            observed_description(entry),
            spec_description(entry)
        ));
    }
    lines
}

fn description_suffix(description: Option<&str>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!(": {d}"),
        _ => String::new(),
    }
}

/// Render one report as a Markdown document
pub fn markdown_report(report: &Report) -> String {
    let mut out = format!("## Repository: {}\n", report.repository);

    if !report.has_changes() {
        out.push_str("\nNothing to change!\n");
        return out;
    }

    let creates: Vec<&ReportEntry> = report
        .entries
        .iter()
        .filter(|e| matches!(e.disposition, Disposition::Create))
        .collect();
    if !creates.is_empty() {
        out.push_str("\n### Missing Labels (Create)\n\n");
        for entry in creates {
            let description = entry.spec.as_ref().and_then(|s| s.description.as_deref());
            out.push_str(&format!(
                "- {}{}\n",
                entry.name,
                description_suffix(description)
            ));
        }
    }

    let deletes: Vec<&ReportEntry> = report
        .entries
        .iter()
        .filter(|e| matches!(e.disposition, Disposition::Delete))
        .collect();
    if !deletes.is_empty() {
        out.push_str("\n### Extra Labels (Delete)\n\n");
        for entry in deletes {
            let description = entry
                .observed
                .as_ref()
                .and_then(|o| o.description.as_deref());
            out.push_str(&format!(
                "- {}{}\n",
                entry.name,
                description_suffix(description)
            ));
        }
    }

    let modifies: Vec<&ReportEntry> = report
        .entries
        .iter()
        .filter(|e| matches!(e.disposition, Disposition::Modify { .. }))
        .collect();
    if !modifies.is_empty() {
        out.push_str("\n### Different Labels (Modify)\n\n");
        for entry in modifies {
            out.push_str(&format!("- {}\n", entry.name));
            if let Disposition::Modify { fields } = &entry.disposition {
                for line in change_lines(entry, fields) {
                    out.push_str(&format!("  - {line}\n"));
                }
            }
        }
    }

    let renames: Vec<&ReportEntry> = report
        .entries
        .iter()
        .filter(|e| matches!(e.disposition, Disposition::Rename { .. }))
        .collect();
    if !renames.is_empty() {
        out.push_str("\n### Renamed Labels (Rename)\n\n");
        for entry in renames {
            out.push_str(&format!("- {}\n", entry.name));
            if let Disposition::Rename { from, fields } = &entry.disposition {
                out.push_str(&format!(
                    "  - Rename from '{}' to '{}'\n",
                    from, entry.name
                ));
                for line in change_lines(entry, fields) {
                    out.push_str(&format!("  - {line}\n"));
                }
            }
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\n### Warnings\n\n");
        for warning in &report.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }

    out
}

/// One-line description of an actionable entry for terminal prompts
///
/// Returns `None` for entries nothing will be done about.
pub fn describe_action(report: &Report, entry: &ReportEntry) -> Option<String> {
    let target = report.target();

    match &entry.disposition {
        Disposition::Create => {
            let description = entry
                .spec
                .as_ref()
                .and_then(|s| s.description.as_deref())
                .unwrap_or("");
            Some(format!("{}: create '{}' ({})", target, entry.name, description))
        }
        Disposition::Delete => Some(format!("{}: delete '{}'", target, entry.name)),
        Disposition::Modify { fields } => {
            let changes: Vec<String> = change_lines(entry, fields)
                .into_iter()
                .map(|line| line.to_lowercase())
                .collect();
            Some(format!("{}: {} of '{}'", target, changes.join(", "), entry.name))
        }
        Disposition::Rename { from, fields } => {
            let mut changes = vec![format!("rename from '{}' to '{}'", from, entry.name)];
            changes.extend(change_lines(entry, fields).into_iter().map(|l| l.to_lowercase()));
            Some(format!("{}: {}", target, changes.join(", ")))
        }
        Disposition::Unchanged | Disposition::Skip { .. } => None,
    }
}
