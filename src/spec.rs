//! Specification Loading and Merging
//!
//! Parses label specification documents, validates them against the
//! embedded schema, and merges multiple sources into one desired set.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JSON Schema every specification document must satisfy
const LABELS_SCHEMA: &str = r##"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "type": "object",
    "additionalProperties": false,
    "required": ["labels"],
    "properties": {
        "labels": {
            "type": "array",
            "items": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "description": {"type": "string"},
                    "color": {"type": "string", "pattern": "^#?[0-9a-fA-F]{6}$"},
                    "optional": {"type": "boolean"},
                    "alias": {
                        "type": "array",
                        "items": {"type": "string", "minLength": 1},
                        "uniqueItems": true
                    }
                }
            }
        }
    }
}"##;

/// Label Specification
///
/// One desired label: the canonical name it should bear plus the
/// attributes that are enforced when set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelSpec {
    /// Canonical label name
    pub name: String,

    /// Label description (unset means not enforced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Label color, 6-digit hex (unset means not enforced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Optional labels are not required to exist, but their attributes
    /// are still enforced when they do
    #[serde(default)]
    pub optional: bool,

    /// Alternate names an existing label may currently bear
    #[serde(default, rename = "alias", skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Top-level specification document
#[derive(Debug, Deserialize)]
struct SpecDocument {
    labels: Vec<LabelSpec>,
}

impl LabelSpec {
    /// Validate a single label specification
    ///
    /// # Errors
    /// - If the name is empty
    /// - If the color is set but not a 6-digit hex string
    /// - If any alias is empty or duplicated within this label
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_spec(
                self.name.clone(),
                "label name cannot be empty",
            ));
        }

        if let Some(color) = &self.color {
            if !is_valid_hex_color(&normalize_color(color)) {
                return Err(Error::InvalidLabelColor(color.clone()));
            }
        }

        let mut seen = HashMap::new();
        for alias in &self.aliases {
            if alias.trim().is_empty() {
                return Err(Error::invalid_spec(
                    self.name.clone(),
                    "aliases cannot be empty strings",
                ));
            }
            if seen.insert(alias.to_lowercase(), ()).is_some() {
                return Err(Error::AliasConflict {
                    alias: alias.clone(),
                    first: self.name.clone(),
                    second: self.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Color with any leading '#' stripped and lowercased, if set
    pub fn normalized_color(&self) -> Option<String> {
        self.color.as_deref().map(normalize_color)
    }
}

/// Normalize a color (remove # and convert to lowercase)
pub fn normalize_color(color: &str) -> String {
    color.trim_start_matches('#').to_lowercase()
}

/// Validate a hex color code (6 digits, without #)
fn is_valid_hex_color(color: &str) -> bool {
    color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate a parsed document against [`LABELS_SCHEMA`]
///
/// # Arguments
/// - `value`: Parsed document
/// - `path`: Source path, used in error messages
///
/// # Errors
/// Returns `InvalidSpecFormat` naming the source and the first violations
fn validate_schema(value: &serde_json::Value, path: &str) -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(LABELS_SCHEMA).expect("embedded schema is valid JSON");
    let compiled = jsonschema::JSONSchema::compile(&schema)
        .expect("embedded schema compiles");

    if let Err(errors) = compiled.validate(value) {
        let detail = errors
            .map(|e| {
                if e.instance_path.to_string().is_empty() {
                    e.to_string()
                } else {
                    format!("{} (at {})", e, e.instance_path)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::invalid_spec(path, detail));
    }

    Ok(())
}

/// Parse a specification document from a content string
///
/// The format is chosen by the file extension of `path` (.json, .yaml
/// or .yml). The document is schema-validated before deserialization.
///
/// # Errors
/// If parsing, schema validation, or per-label validation fails
pub fn parse_spec(content: &str, path: &str) -> Result<Vec<LabelSpec>> {
    let ext = path.rsplit('.').next().unwrap_or("");

    let value: serde_json::Value = match ext {
        "json" => serde_json::from_str(content)
            .map_err(|e| Error::invalid_spec(path, e.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(content)
            .map_err(|e| Error::invalid_spec(path, e.to_string()))?,
        _ => {
            return Err(Error::invalid_spec(
                path,
                "specification file must be .json, .yaml, or .yml",
            ));
        }
    };

    validate_schema(&value, path)?;

    let document: SpecDocument =
        serde_json::from_value(value).map_err(|e| Error::invalid_spec(path, e.to_string()))?;

    for label in &document.labels {
        label.validate().map_err(|e| match e {
            conflict @ Error::AliasConflict { .. } => conflict,
            other => Error::invalid_spec(path, other.to_string()),
        })?;
    }

    Ok(document.labels)
}

/// Load a specification document from a file
///
/// # Errors
/// If file reading, parsing, or validation fails
pub fn load_spec_file<P: AsRef<Path>>(path: P) -> Result<Vec<LabelSpec>> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Specification file not found: {}", path.display()),
        )
        .into());
    }

    let content = std::fs::read_to_string(path)?;
    parse_spec(&content, &path.display().to_string())
}

/// Merge specification sets from multiple sources into one desired set
///
/// Later sources override earlier ones when canonical names collide
/// (case-insensitive): description, color and optionality take the last
/// writer's values, alias lists are unioned. The merged set is then
/// checked for the global alias invariant.
///
/// # Errors
/// Returns `AliasConflict` if an alias equals a canonical name or appears
/// under two different canonical names
pub fn merge_specs(sources: Vec<Vec<LabelSpec>>) -> Result<Vec<LabelSpec>> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, LabelSpec> = HashMap::new();

    for source in sources {
        for spec in source {
            let key = spec.name.to_lowercase();
            match merged.get_mut(&key) {
                Some(existing) => {
                    let mut aliases = existing.aliases.clone();
                    for alias in &spec.aliases {
                        if !aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
                            aliases.push(alias.clone());
                        }
                    }
                    *existing = LabelSpec { aliases, ..spec };
                }
                None => {
                    order.push(key.clone());
                    merged.insert(key, spec);
                }
            }
        }
    }

    let result: Vec<LabelSpec> = order
        .iter()
        .map(|key| merged[key].clone())
        .collect();

    validate_aliases(&result)?;
    Ok(result)
}

/// Check the global alias invariant over a merged desired set
fn validate_aliases(specs: &[LabelSpec]) -> Result<()> {
    let canonical: HashMap<String, &str> = specs
        .iter()
        .map(|s| (s.name.to_lowercase(), s.name.as_str()))
        .collect();

    let mut claimed: HashMap<String, &str> = HashMap::new();

    for spec in specs {
        for alias in &spec.aliases {
            let key = alias.to_lowercase();

            if let Some(name) = canonical.get(&key) {
                return Err(Error::AliasConflict {
                    alias: alias.clone(),
                    first: (*name).to_string(),
                    second: spec.name.clone(),
                });
            }

            if let Some(owner) = claimed.insert(key, spec.name.as_str()) {
                if !owner.eq_ignore_ascii_case(&spec.name) {
                    return Err(Error::AliasConflict {
                        alias: alias.clone(),
                        first: owner.to_string(),
                        second: spec.name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Load and merge specification documents from the given paths
///
/// # Errors
/// If any file fails to load or the merged set violates the alias invariant
pub fn load_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LabelSpec>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(load_spec_file(path)?);
    }
    merge_specs(sources)
}
