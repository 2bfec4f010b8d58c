//! Reconciliation Engine
//!
//! Pure comparison of a merged desired set against the observed label
//! set of one repository, producing an ordered [`Report`].

use std::collections::{HashMap, HashSet};

use crate::report::{Disposition, Field, ObservedLabel, Report, ReportEntry, ReportFlags};
use crate::spec::{normalize_color, LabelSpec};

/// Engine configuration, passed explicitly so the engine stays pure
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Treat optional labels as required (emit `Create` when absent)
    pub optional_as_required: bool,

    /// Recognize observed labels under a spec alias and emit `Rename`
    /// instead of a `Delete` + `Create` pair
    pub aliases_as_renames: bool,
}

/// Compare the attributes of a spec against an observed label
///
/// An unset spec field is not enforced, and neither is a spec field whose
/// observed counterpart is absent. Colors compare case-insensitively.
fn field_deltas(spec: &LabelSpec, observed: &ObservedLabel) -> Vec<Field> {
    let mut fields = Vec::new();

    if let Some(want) = spec.normalized_color() {
        if want != normalize_color(&observed.color) {
            fields.push(Field::Color);
        }
    }

    if let (Some(want), Some(have)) = (&spec.description, &observed.description) {
        if want != have {
            fields.push(Field::Description);
        }
    }

    fields
}

/// Reconcile a desired label set against the observed labels of a repository
///
/// # Arguments
/// - `desired`: Merged label specifications
/// - `observed`: Labels currently stored by the repository
/// - `namespace` / `repository`: Target identifier, recorded as metadata
/// - `sources`: Specification source paths, recorded as metadata
/// - `options`: Alias and optional handling
///
/// # Returns
/// A report with entries sorted ascending by name, case-insensitive.
/// Reconciling the same inputs twice yields identical reports.
pub fn reconcile(
    desired: &[LabelSpec],
    observed: &[ObservedLabel],
    namespace: &str,
    repository: &str,
    sources: &[String],
    options: ReconcileOptions,
) -> Report {
    let mut warnings = Vec::new();

    // Case-insensitive observed index; a duplicate name from the adapter
    // is not a hard failure, the first occurrence wins.
    let mut observed_index: HashMap<String, &ObservedLabel> = HashMap::new();
    for label in observed {
        let key = label.name.to_lowercase();
        if observed_index.contains_key(&key) {
            warnings.push(format!(
                "repository returned duplicate label '{}'; keeping the first occurrence",
                label.name
            ));
        } else {
            observed_index.insert(key, label);
        }
    }

    // Secondary alias index, only consulted in alias mode
    let alias_owner: HashMap<String, &str> = if options.aliases_as_renames {
        desired
            .iter()
            .flat_map(|spec| {
                spec.aliases
                    .iter()
                    .map(|alias| (alias.to_lowercase(), spec.name.as_str()))
            })
            .collect()
    } else {
        HashMap::new()
    };

    let mut entries = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for spec in desired {
        let key = spec.name.to_lowercase();

        if let Some(current) = observed_index.get(&key).copied() {
            claimed.insert(key);
            let fields = field_deltas(spec, current);
            let disposition = if fields.is_empty() {
                Disposition::Unchanged
            } else {
                Disposition::Modify { fields }
            };
            entries.push(ReportEntry {
                name: spec.name.clone(),
                disposition,
                spec: Some(spec.clone()),
                observed: Some(current.clone()),
            });
            continue;
        }

        if options.aliases_as_renames {
            let alias_match = spec
                .aliases
                .iter()
                .filter_map(|alias| observed_index.get(&alias.to_lowercase()).copied())
                .find(|current| !claimed.contains(&current.name.to_lowercase()));

            if let Some(current) = alias_match {
                claimed.insert(current.name.to_lowercase());
                // An attribute mismatch under the old name still converges,
                // regardless of optionality.
                let fields = field_deltas(spec, current);
                entries.push(ReportEntry {
                    name: spec.name.clone(),
                    disposition: Disposition::Rename {
                        from: current.name.clone(),
                        fields,
                    },
                    spec: Some(spec.clone()),
                    observed: Some(current.clone()),
                });
                continue;
            }
        }

        if spec.optional && !options.optional_as_required {
            entries.push(ReportEntry {
                name: spec.name.clone(),
                disposition: Disposition::Skip {
                    reason: "absent optional label".to_string(),
                },
                spec: Some(spec.clone()),
                observed: None,
            });
        } else {
            entries.push(ReportEntry {
                name: spec.name.clone(),
                disposition: Disposition::Create,
                spec: Some(spec.clone()),
                observed: None,
            });
        }
    }

    // Observed labels with no desired match at all are deleted. In alias
    // mode a label under a known alias is never deleted, even when its
    // canonical label already exists.
    let mut seen: HashSet<String> = HashSet::new();
    for label in observed {
        let key = label.name.to_lowercase();
        if !seen.insert(key.clone()) || claimed.contains(&key) {
            continue;
        }

        if let Some(owner) = alias_owner.get(&key) {
            warnings.push(format!(
                "label '{}' matches an alias of '{}', which already exists; leaving it untouched",
                label.name, owner
            ));
            continue;
        }

        entries.push(ReportEntry {
            name: label.name.clone(),
            disposition: Disposition::Delete,
            spec: None,
            observed: Some(label.clone()),
        });
    }

    entries.sort_by_key(|entry| entry.name.to_lowercase());

    Report {
        namespace: namespace.to_string(),
        repository: repository.to_string(),
        sources: sources.to_vec(),
        flags: ReportFlags {
            optional: options.optional_as_required,
            alias: options.aliases_as_renames,
        },
        entries,
        warnings,
    }
}
