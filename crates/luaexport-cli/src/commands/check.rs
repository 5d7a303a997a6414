use super::{analyze_inputs, collect_inputs, report_diagnostics, RunSettings};
use crate::errors::CliError;
use crate::GlobalOpts;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use luaexport_config::Config;
use luaexport_manifest::ExportManifest;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    /// Tree dumps (*.json) or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print the manifest as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Exit with an error when any diagnostic is reported
    #[arg(long)]
    pub strict: bool,
}

/// Analyze without writing a manifest
pub fn handle_check(cmd: CheckCommand, opts: &GlobalOpts) -> Result<()> {
    let config = Config::load().map_err(CliError::Config)?;
    let settings = RunSettings::from_config(&config, false);
    let inputs = collect_inputs(&cmd.inputs)?;
    let manifest = analyze_inputs(&inputs, &settings)?;
    let diagnostics = report_diagnostics(&manifest);

    if cmd.json {
        println!("{}", manifest.to_json_string().map_err(CliError::Manifest)?);
    } else {
        print_summary(&manifest, opts);
    }

    if cmd.strict && diagnostics > 0 {
        return Err(CliError::StrictDiagnostics(diagnostics).into());
    }
    Ok(())
}

fn print_summary(manifest: &ExportManifest, opts: &GlobalOpts) {
    for unit in &manifest.units {
        println!(
            "{} {} records, {} diagnostics",
            unit.file_path.bold(),
            unit.records.len(),
            unit.diagnostics.len()
        );
        if opts.verbosity_level() > 0 {
            for record in &unit.records {
                println!("  {} {}", record.kind.as_str().cyan(), record.qualified_name);
            }
        }
    }

    let overloaded = manifest
        .overload_sets()
        .iter()
        .filter(|set| set.is_overloaded())
        .count();
    println!(
        "{} {} records, {} overloaded names, {} diagnostics",
        "Total:".green().bold(),
        manifest.record_count(),
        overloaded,
        manifest.diagnostic_count()
    );
}
