//! Subcommands and the analysis pipeline they share

pub mod analyze;
pub mod check;
pub mod config;

use crate::errors::CliError;
use anyhow::{Context, Result};
use luaexport_ast::{AnalysisOptions, Driver, TranslationUnit};
use luaexport_config::{Config, DiagnosticsConfig};
use luaexport_logger::{self as logger, DiagnosticsSink, FileSink};
use luaexport_manifest::{Diagnostic, ExportManifest, UnitExports};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Settings for one analysis run after merging config and flags
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub options: AnalysisOptions,
    /// `Some` when the debug-event and type statistics logs are written
    pub diagnostics: Option<DiagnosticsConfig>,
}

impl RunSettings {
    pub fn from_config(config: &Config, force_diagnostics: bool) -> Self {
        let diagnostics = (config.diagnostics.enabled || force_diagnostics)
            .then(|| config.diagnostics.clone());
        RunSettings {
            options: AnalysisOptions::from(config),
            diagnostics,
        }
    }
}

/// Expand files and directories into the sorted list of `.json` tree dumps
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(CliError::MissingInput(path.clone()));
        }
        if path.is_file() {
            inputs.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|file| is_tree_dump(file))
            .collect();
        found.sort();
        debug!("Found {} tree dumps under {}", found.len(), path.display());
        inputs.extend(found);
    }

    if inputs.is_empty() {
        let searched: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(CliError::NoInputs(searched.join(", ")));
    }
    Ok(inputs)
}

fn is_tree_dump(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load and analyze every input, merged into one manifest in input order
///
/// Without diagnostics logging each unit gets its own driver on the rayon
/// pool. With it, units run in order against one shared file sink so the
/// event log stays readable.
pub fn analyze_inputs(inputs: &[PathBuf], settings: &RunSettings) -> Result<ExportManifest> {
    let units: Vec<(PathBuf, TranslationUnit)> = inputs
        .par_iter()
        .map(|path| {
            TranslationUnit::load(path)
                .map(|unit| (path.clone(), unit))
                .with_context(|| format!("Failed to load tree dump {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let exports: Vec<UnitExports> = match &settings.diagnostics {
        None => units
            .par_iter()
            .map(|(path, unit)| {
                Driver::new(unit, &settings.options)
                    .map(Driver::run)
                    .map_err(|source| CliError::Analysis {
                        path: path.clone(),
                        source,
                    })
            })
            .collect::<Result<_, CliError>>()?,
        Some(config) => {
            let mut sink = FileSink::create(&config.event_log_path(), &config.stats_log_path())
                .with_context(|| {
                    format!(
                        "Failed to open diagnostics logs {}",
                        config.event_log_path().display()
                    )
                })?;
            let exports = analyze_with_sink(&units, &settings.options, &mut sink)?;
            sink.finish().map_err(CliError::DiagnosticsLog)?;
            info!(
                "Diagnostics written to {} and {}",
                config.event_log_path().display(),
                config.stats_log_path().display()
            );
            exports
        }
    };

    let mut manifest = ExportManifest::new();
    for unit in exports {
        manifest.add_unit(unit);
    }
    Ok(manifest)
}

fn analyze_with_sink<S: DiagnosticsSink>(
    units: &[(PathBuf, TranslationUnit)],
    options: &AnalysisOptions,
    sink: &mut S,
) -> Result<Vec<UnitExports>, CliError> {
    units
        .iter()
        .map(|(path, unit)| {
            Driver::with_sink(unit, options, &mut *sink)
                .map(Driver::run)
                .map_err(|source| CliError::Analysis {
                    path: path.clone(),
                    source,
                })
        })
        .collect()
}

/// Print every diagnostic as a warning; returns how many there were
pub fn report_diagnostics(manifest: &ExportManifest) -> usize {
    let mut count = 0;
    for (file, diagnostic) in manifest.diagnostics() {
        logger::warn(&render_diagnostic(file, diagnostic));
        count += 1;
    }
    count
}

fn render_diagnostic(file: &str, diagnostic: &Diagnostic) -> String {
    if diagnostic.location.is_some() {
        diagnostic.to_string()
    } else {
        format!("{}: {}", file, diagnostic)
    }
}
