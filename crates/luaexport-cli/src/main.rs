use clap::{Parser, Subcommand};
use luaexport::commands::{analyze, check, config};
use luaexport::{init_tracing, GlobalOpts};
use luaexport_config::Config;
use luaexport_logger as logger;

#[derive(Parser)]
#[command(name = "luaexport")]
#[command(version)]
#[command(
    about = "Lua export analysis for annotated C++",
    long_about = "luaexport reads semantic tree dumps of annotated C++ headers and writes the export manifest a Lua binding generator consumes."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze tree dumps and write the export manifest
    Analyze(analyze::AnalyzeCommand),
    /// Analyze tree dumps and report without writing anything
    Check(check::CheckCommand),
    /// Configure luaexport
    #[command(subcommand_required = true, arg_required_else_help = true)]
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    // The run log sits next to the config file so isolated runs stay isolated.
    let log_file = Config::path()
        .parent()
        .map(|dir| dir.join("luaexport.log"));
    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), log_file) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    if let Some(path) = logger::get_log_path() {
        logger::info(&format!("Run log: {}", path.display()));
    }

    let result = match cli.command {
        Commands::Analyze(cmd) => analyze::handle_analyze(cmd, &cli.global),
        Commands::Check(cmd) => check::handle_check(cmd, &cli.global),
        Commands::Config { action } => config::handle_config(action, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
