//! luaexport library - expose the command layer for the binary and tests

pub mod commands;
pub mod errors;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a `tracing` filter, e.g. `luaexport_ast=debug`
pub const LOG_ENV_VAR: &str = "LUAEXPORT_LOG";

#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Only report errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

impl GlobalOpts {
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            // 0 = warn only, 1 = debug (-v), 2 = trace (-vv)
            self.verbose
        }
    }

    fn default_filter(&self) -> &'static str {
        if self.quiet {
            return "luaexport=error";
        }
        match self.verbose {
            0 => "luaexport=warn",
            1 => "luaexport=debug",
            _ => "luaexport=trace",
        }
    }
}

/// Install the global `tracing` subscriber
///
/// `LUAEXPORT_LOG` wins over the verbosity flags. The `luaexport` target
/// prefix covers every crate of the workspace.
pub fn init_tracing(opts: &GlobalOpts) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(opts.default_filter()));
    // A second install (tests driving several commands) keeps the first one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 0);
        assert_eq!(opts.default_filter(), "luaexport=error");
    }

    #[test]
    fn test_verbose_raises_filter() {
        let debug = GlobalOpts {
            quiet: false,
            verbose: 1,
        };
        let trace = GlobalOpts {
            quiet: false,
            verbose: 3,
        };
        assert_eq!(debug.default_filter(), "luaexport=debug");
        assert_eq!(trace.default_filter(), "luaexport=trace");
        assert_eq!(GlobalOpts::default().default_filter(), "luaexport=warn");
    }
}
