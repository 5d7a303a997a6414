//! Manifest operations - grouping, merging, loading and saving
//!
//! A manifest holds the per-unit results of one or more analysis runs. Units
//! are independent: merging two manifests is plain concatenation, with a
//! re-analyzed unit replacing its earlier result.

use crate::diagnostics::Diagnostic;
use crate::errors::ManifestError;
use crate::types::ExportRecord;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

// =============================================================================
// UNIT EXPORTS - The result of analyzing one unit
// =============================================================================

/// Ordered records and diagnostics produced for a single analyzed unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitExports {
    pub file_path: String,
    #[serde(default)]
    pub records: Vec<ExportRecord>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitExports {
    pub fn new(file_path: impl Into<String>) -> Self {
        UnitExports {
            file_path: file_path.into(),
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// True when the unit was analyzed without any recorded diagnostic
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn overload_sets(&self) -> Vec<OverloadSet<'_>> {
        group_overloads(&self.records)
    }
}

// =============================================================================
// OVERLOAD SETS
// =============================================================================

/// Callables sharing a script-visible name on the same owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadSet<'a> {
    pub owner_type: &'a str,
    pub script_name: &'a str,
    pub records: Vec<&'a ExportRecord>,
}

impl OverloadSet<'_> {
    pub fn is_overloaded(&self) -> bool {
        self.records.len() > 1
    }
}

/// Group callable records by `(owner_type, script_name)` in first-seen order
pub fn group_overloads<'a, I>(records: I) -> Vec<OverloadSet<'a>>
where
    I: IntoIterator<Item = &'a ExportRecord>,
{
    let mut groups: IndexMap<(&'a str, &'a str), Vec<&'a ExportRecord>> = IndexMap::new();
    for record in records {
        if !record.kind.is_callable() {
            continue;
        }
        groups
            .entry((record.owner_type.as_str(), record.script_name.as_str()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((owner_type, script_name), records)| OverloadSet {
            owner_type,
            script_name,
            records,
        })
        .collect()
}

// =============================================================================
// EXPORT MANIFEST
// =============================================================================

/// Top-level collection handed to the registration code generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub version: String,
    pub generated_at: String,
    #[serde(default)]
    pub units: Vec<UnitExports>,

    /// Runtime only - rebuilt on load for O(1) unit lookup
    #[serde(skip)]
    unit_index: AHashMap<String, usize>,
}

impl Default for ExportManifest {
    fn default() -> Self {
        ExportManifest {
            version: "1.0".to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            units: Vec::new(),
            unit_index: AHashMap::new(),
        }
    }
}

impl ExportManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild_indexes(&mut self) {
        self.unit_index = self
            .units
            .iter()
            .enumerate()
            .map(|(idx, unit)| (unit.file_path.clone(), idx))
            .collect();
    }

    /// Add the result of one unit, replacing an earlier result for the same file
    pub fn add_unit(&mut self, unit: UnitExports) {
        if let Some(&idx) = self.unit_index.get(&unit.file_path) {
            debug!("Replacing exports for unit: {}", unit.file_path);
            self.units[idx] = unit;
            return;
        }
        self.unit_index.insert(unit.file_path.clone(), self.units.len());
        self.units.push(unit);
    }

    pub fn unit(&self, file_path: &str) -> Option<&UnitExports> {
        self.unit_index.get(file_path).map(|&idx| &self.units[idx])
    }

    /// Concatenate the units of another, independently produced manifest
    pub fn merge(&mut self, other: ExportManifest) {
        for unit in other.units {
            self.add_unit(unit);
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &ExportRecord> {
        self.units.iter().flat_map(|unit| unit.records.iter())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.units.iter().flat_map(|unit| {
            unit.diagnostics
                .iter()
                .map(move |diagnostic| (unit.file_path.as_str(), diagnostic))
        })
    }

    pub fn record_count(&self) -> usize {
        self.units.iter().map(|unit| unit.records.len()).sum()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.units.iter().map(|unit| unit.diagnostics.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn overload_sets(&self) -> Vec<OverloadSet<'_>> {
        group_overloads(self.records())
    }

    /// Load a manifest; the format follows the file extension
    pub fn load_from_path(path: &Path) -> Result<Self, ManifestError> {
        debug!("Reading export manifest from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut manifest: ExportManifest = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        manifest.rebuild_indexes();
        info!(
            "Loaded manifest with {} units, {} records",
            manifest.units.len(),
            manifest.record_count()
        );
        Ok(manifest)
    }

    /// Save with an atomic write; `.toml` paths get TOML, anything else JSON
    pub fn save_to_path(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            self.to_json_string()?
        };

        let temp_path = path.with_extension("tmp");
        {
            let file = std::fs::File::create(&temp_path)?;
            let mut writer = std::io::BufWriter::with_capacity(64 * 1024, file);
            writer.write_all(content.as_bytes())?;
            writer.flush()?;
        }
        std::fs::rename(&temp_path, path)?;

        info!(
            "Manifest written to {:?} ({} records)",
            path,
            self.record_count()
        );
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::types::ExportKind;
    use tempfile::TempDir;

    fn method(owner: &str, name: &str, params: &[&str]) -> ExportRecord {
        let mut record = ExportRecord::new(ExportKind::Method, name, format!("{owner}::{name}"));
        record.owner_type = owner.to_string();
        record.parameter_types = params.iter().map(|p| (*p).to_string()).collect();
        record
    }

    fn unit(path: &str, records: Vec<ExportRecord>) -> UnitExports {
        UnitExports {
            file_path: path.to_string(),
            records,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_group_overloads_by_owner_and_script_name() {
        let records = vec![
            method("Calc", "add", &["int", "int"]),
            method("Calc", "reset", &[]),
            method("Calc", "add", &["int", "int", "int"]),
            method("Other", "add", &["int"]),
            ExportRecord::new(ExportKind::Class, "Calc", "Calc"),
        ];
        let sets = group_overloads(&records);

        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].owner_type, "Calc");
        assert_eq!(sets[0].script_name, "add");
        assert!(sets[0].is_overloaded());
        assert_eq!(sets[0].records[1].parameter_types.len(), 3);
        assert_eq!(sets[1].script_name, "reset");
        assert_eq!(sets[2].owner_type, "Other");
    }

    #[test]
    fn test_add_unit_replaces_same_file() {
        let mut manifest = ExportManifest::new();
        manifest.add_unit(unit("a.h", vec![method("A", "f", &[])]));
        manifest.add_unit(unit("b.h", vec![method("B", "g", &[])]));
        manifest.add_unit(unit("a.h", Vec::new()));

        assert_eq!(manifest.units.len(), 2);
        assert_eq!(manifest.record_count(), 1);
        assert!(manifest.unit("a.h").is_some_and(|u| u.records.is_empty()));
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let mut left = ExportManifest::new();
        left.add_unit(unit("a.h", vec![method("A", "f", &[])]));
        let mut right = ExportManifest::new();
        right.add_unit(unit("b.h", vec![method("B", "g", &[])]));
        let mut diag_unit = unit("c.h", Vec::new());
        diag_unit.diagnostics.push(Diagnostic::new(
            DiagnosticKind::InvalidRecord,
            "empty name",
            None,
        ));
        right.add_unit(diag_unit);

        left.merge(right);

        let names: Vec<_> = left.records().map(|r| r.owner_type.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(left.diagnostic_count(), 1);
        assert_eq!(left.diagnostics().next().map(|(file, _)| file), Some("c.h"));
    }

    #[test]
    fn test_save_and_load_json() -> Result<(), ManifestError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("exports.json");

        let mut manifest = ExportManifest::new();
        manifest.add_unit(unit("calc.h", vec![method("Calc", "add", &["int", "int"])]));
        manifest.save_to_path(&path)?;

        let loaded = ExportManifest::load_from_path(&path)?;
        assert_eq!(loaded.units, manifest.units);
        assert!(loaded.unit("calc.h").is_some());
        Ok(())
    }

    #[test]
    fn test_save_toml_by_extension() -> Result<(), ManifestError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("exports.toml");

        let mut manifest = ExportManifest::new();
        manifest.add_unit(unit("calc.h", vec![method("Calc", "add", &["int"])]));
        manifest.save_to_path(&path)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("[[units]]"));
        assert!(content.contains("file_path = \"calc.h\""));
        Ok(())
    }
}
