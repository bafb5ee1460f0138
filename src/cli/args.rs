//! Command line argument parsing and validation.
//!
//! The assembler keeps the build-system calling convention: one flat
//! argument list split into four groups by the reserved `__DELIM__` token.
//! clap only collects the raw list; the grouping itself is validated by
//! [`Invocation::parse`](crate::bundle::Invocation::parse).

use clap::Parser;

/// Application bundle assembler
#[derive(Parser, Debug)]
#[command(
    name = "appbundle",
    version,
    about = "Assembles a signed .app bundle archive from build artifacts",
    long_about = "Merges plist fragments, links precompiled interface layouts, installs \
resources, signs the assembled tree and writes one deployable bundle archive.

Usage:
  appbundle <output.tar> <app_name> <module_dir> __DELIM__ <inputs...> __DELIM__ <binaries...> __DELIM__ <layout flags...>

Exit code 0 = bundle archive guaranteed to exist at the output path."
)]
pub struct Args {
    /// Flat argument list: fixed group of 3, then inputs, then candidate
    /// binaries, then layout-compiler flags, separated by `__DELIM__`
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
