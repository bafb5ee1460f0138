//! External tool execution.
//!
//! Every external collaborator (plutil, xcrun/ibtool, codesign) runs
//! through one scoped wrapper so failures are reported consistently:
//! captured exit code plus stderr, regardless of which stage invoked the
//! tool. A non-zero exit is always fatal to the pipeline.

use std::ffi::OsStr;
use std::path::PathBuf;

use crate::bundle::error::{Error, Result};

/// Manifest binary-encoding converter.
pub const PLUTIL: &str = "plutil";
/// Toolchain launcher used to reach the interface-layout compiler.
pub const XCRUN: &str = "xcrun";
/// Code-signing tool.
pub const CODESIGN: &str = "codesign";

/// A resolved external tool.
#[derive(Debug, Clone)]
pub struct Tool {
    name: String,
    path: PathBuf,
}

impl Tool {
    /// Resolve a tool by name.
    ///
    /// Resolution order: `APPBUNDLE_<NAME>` environment override, then
    /// `PATH` lookup, then the conventional `/usr/bin` location. The
    /// override exists so hermetic builds and tests can substitute stubs.
    pub fn resolve(name: &str) -> Self {
        let env_key = format!("APPBUNDLE_{}", name.to_uppercase());
        let path = match std::env::var_os(&env_key) {
            Some(p) => PathBuf::from(p),
            None => match which::which(name) {
                Ok(p) => p,
                Err(_) => PathBuf::from(format!("/usr/bin/{name}")),
            },
        };
        log::debug!("Resolved {} to {}", name, path.display());
        Self {
            name: name.to_string(),
            path,
        }
    }

    /// Run the tool to completion with the given arguments, capturing
    /// output. Launch failures and non-zero exits both surface as
    /// [`Error::ExternalTool`] with whatever stderr was produced.
    pub async fn run<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().collect();
        log::debug!(
            "Running {} {}",
            self.path.display(),
            args.iter()
                .map(|a| a.as_ref().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = tokio::process::Command::new(&self.path)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::ExternalTool {
                tool: self.name.clone(),
                code: None,
                stderr: format!("failed to launch {}: {e}", self.path.display()),
            })?;

        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: self.name.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
