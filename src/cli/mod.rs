// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, KindArg};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// On bad arguments or `--help`, clap prints its message and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
