use super::{analyze_inputs, collect_inputs, report_diagnostics, RunSettings};
use crate::errors::CliError;
use crate::GlobalOpts;
use anyhow::{Context, Result};
use clap::Args;
use luaexport_config::Config;
use luaexport_logger as logger;
use luaexport_manifest::ExportManifest;
use std::path::PathBuf;

/// Manifest path used when `--out` is not given
pub const DEFAULT_MANIFEST: &str = "luaexport-manifest.json";

#[derive(Args, Debug, Clone)]
pub struct AnalyzeCommand {
    /// Tree dumps (*.json) or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Manifest to write; a `.toml` extension selects TOML
    #[arg(short, long, default_value = DEFAULT_MANIFEST)]
    pub out: PathBuf,

    /// Merge into an existing manifest instead of replacing it
    #[arg(long)]
    pub merge: bool,

    /// Exit with an error when any diagnostic is reported
    #[arg(long)]
    pub strict: bool,

    /// Write the debug-event and type statistics logs even if disabled in config
    #[arg(long)]
    pub diagnostics: bool,

    /// Override the configured annotation prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn handle_analyze(cmd: AnalyzeCommand, opts: &GlobalOpts) -> Result<()> {
    let config = Config::load().map_err(CliError::Config)?;
    let mut settings = RunSettings::from_config(&config, cmd.diagnostics);
    if let Some(prefix) = cmd.prefix {
        settings.options.annotation_prefix = prefix;
    }

    let inputs = collect_inputs(&cmd.inputs)?;
    logger::spinner_start(&format!("Analyzing {} translation units", inputs.len()));
    let analyzed = analyze_inputs(&inputs, &settings);
    logger::spinner_stop();
    let fresh = analyzed?;

    let diagnostics = report_diagnostics(&fresh);
    let records = fresh.record_count();
    let units = fresh.units.len();

    let manifest = if cmd.merge && cmd.out.exists() {
        let mut existing = ExportManifest::load_from_path(&cmd.out)
            .with_context(|| format!("Failed to read {}", cmd.out.display()))?;
        existing.merge(fresh);
        existing
    } else {
        fresh
    };

    if cmd.strict && diagnostics > 0 {
        return Err(CliError::StrictDiagnostics(diagnostics).into());
    }

    manifest.save_to_path(&cmd.out).map_err(CliError::Manifest)?;
    if !opts.quiet {
        logger::success(&format!(
            "{} records from {} units written to {}",
            records,
            units,
            cmd.out.display()
        ));
    }
    Ok(())
}
