//! appbundle - application bundle assembler.
//!
//! This binary merges plist fragments, links precompiled interface layouts,
//! installs resources, signs the assembled tree and produces a single
//! deployable bundle archive.

mod bundle;
mod cli;
mod error;

use std::process;

#[tokio::main]
async fn main() {
    // Warnings from the classifier must always reach stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
