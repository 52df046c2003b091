//! CLI command implementations

pub mod explain;
pub mod init;
pub mod probe;
pub mod scan;

pub use explain::ExplainArgs;
pub use init::InitArgs;
pub use probe::ProbeArgs;
pub use scan::ScanArgs;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan AST dumps for catastrophic-backtracking regexes
    Scan(ScanArgs),

    /// Initialize Oni configuration in current directory
    Init(InitArgs),

    /// Show detailed explanation for a specific rule
    Explain(ExplainArgs),

    /// Internal probe worker entry point
    #[command(hide = true)]
    Probe(ProbeArgs),
}
