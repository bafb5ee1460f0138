//! Command line interface for the bundle assembler.

mod args;

pub use args::Args;

use clap::CommandFactory;

use crate::bundle::{Assembler, Invocation};
use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();

    // The trailing flat list swallows hyphen values, so a leading help or
    // version flag is handled here instead of by clap's flag matching.
    match args.args.first().map(String::as_str) {
        Some("--help" | "-h") => {
            let mut command = Args::command();
            command.print_long_help()?;
            return Ok(0);
        }
        Some("--version" | "-V") => {
            print!("{}", Args::command().render_version());
            return Ok(0);
        }
        _ => {}
    }

    let invocation = Invocation::parse(&args.args)?;
    let output = Assembler::new(invocation).assemble().await?;
    log::info!("Bundle archive ready at {}", output.display());
    Ok(0)
}
