//! Oni CLI - Command-line interface for the Oni ReDoS scanner
//!
//! Finds regular expressions vulnerable to catastrophic backtracking and
//! proves them exploitable with sandboxed adversarial inputs.

mod commands;
mod logging;
mod output;

use clap::Parser;
use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "oni",
    author,
    version,
    about = "Dynamic ReDoS scanner for Python regex usage",
    long_about = "Oni scans AST dumps of Python code for regular expressions with\n\
                  catastrophic-backtracking potential, then confirms suspects by\n\
                  running adversarial inputs against a backtracking matcher in a\n\
                  killable worker process."
)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Scan(args) => args.run(),
        Commands::Init(args) => args.run(),
        Commands::Explain(args) => args.run(),
        Commands::Probe(args) => args.run(),
    }
}
