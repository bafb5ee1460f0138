//! Pipeline orchestration.
//!
//! [`Invocation`] is the parsed, immutable form of the delimiter-grouped
//! argument list; [`Assembler`] runs the stages strictly in order, each
//! one completing (or failing fatally) before the next starts. Later
//! stages read the cumulative state left by earlier ones, so there is no
//! overlap and no isolation between stages.

use std::path::{Path, PathBuf};

use crate::bundle::error::{Error, Result};
use crate::bundle::exec::{self, Tool};
use crate::bundle::{archiver, artifact::Artifacts, fs, layout, manifest, resources, sign};
use crate::bundle::resources::PostProcess;
use crate::bundle::template::TemplateContext;

/// Reserved token separating the four argument groups.
pub const GROUP_DELIMITER: &str = "__DELIM__";

/// Bundle directory extension.
pub const BUNDLE_EXTENSION: &str = "app";

/// One parsed invocation. Immutable for the lifetime of the run; the
/// bundle directory derived from it is owned exclusively by this run.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Where the final bundle archive is written
    pub output: PathBuf,
    /// Bundle name; the tree is rooted at `<app_name>.app`
    pub app_name: String,
    /// Directory the bundle tree is assembled under
    pub module_dir: PathBuf,
    /// Raw input artifact paths, order-significant
    pub inputs: Vec<PathBuf>,
    /// Candidate binary paths
    pub binaries: Vec<PathBuf>,
    /// Free-form flags forwarded to the layout compiler
    pub layout_flags: Vec<String>,
}

impl Invocation {
    /// Split the flat argument list on [`GROUP_DELIMITER`] into exactly
    /// four groups: `(output, app_name, module_dir)`, inputs, binaries,
    /// layout-compiler flags. Anything else is a [`Error::BadInvocation`].
    pub fn parse(args: &[String]) -> Result<Self> {
        if args.is_empty() {
            return Err(Error::BadInvocation {
                reason: "empty argument list".to_string(),
            });
        }

        let mut groups: Vec<Vec<&String>> = vec![Vec::new()];
        for arg in args {
            if arg == GROUP_DELIMITER {
                groups.push(Vec::new());
            } else if let Some(group) = groups.last_mut() {
                group.push(arg);
            }
        }

        if groups.len() != 4 {
            return Err(Error::BadInvocation {
                reason: format!("expected 4 delimiter-separated groups, got {}", groups.len()),
            });
        }
        let [fixed, inputs, binaries, layout_flags] = groups.as_slice() else {
            unreachable!("length checked above");
        };
        let [output, app_name, module_dir] = fixed.as_slice() else {
            return Err(Error::BadInvocation {
                reason: format!(
                    "first group must be <output> <app_name> <module_dir>, got {} argument(s)",
                    fixed.len()
                ),
            });
        };

        Ok(Self {
            output: PathBuf::from(output.as_str()),
            app_name: app_name.to_string(),
            module_dir: PathBuf::from(module_dir.as_str()),
            inputs: inputs.iter().map(|s| PathBuf::from(s.as_str())).collect(),
            binaries: binaries.iter().map(|s| PathBuf::from(s.as_str())).collect(),
            layout_flags: layout_flags.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Bundle directory this invocation assembles into.
    pub fn bundle_dir(&self) -> PathBuf {
        self.module_dir
            .join(format!("{}.{BUNDLE_EXTENSION}", self.app_name))
    }
}

/// Runs the whole assembly pipeline for one invocation.
pub struct Assembler {
    invocation: Invocation,
    plutil: Tool,
    xcrun: Tool,
    codesign: Tool,
}

impl Assembler {
    /// Create an assembler, resolving the external tools once up front.
    pub fn new(invocation: Invocation) -> Self {
        Self {
            invocation,
            plutil: Tool::resolve(exec::PLUTIL),
            xcrun: Tool::resolve(exec::XCRUN),
            codesign: Tool::resolve(exec::CODESIGN),
        }
    }

    /// Run the pipeline to completion and return the output archive path.
    ///
    /// Classification runs before any filesystem mutation, so a fatal
    /// classification error leaves no bundle directory behind.
    pub async fn assemble(&self) -> Result<PathBuf> {
        let inv = &self.invocation;
        let artifacts = Artifacts::classify(&inv.inputs, &inv.binaries)?;
        let context = TemplateContext::build(
            &inv.app_name,
            artifacts.main_binary.as_deref(),
            &artifacts.overrides,
        )?;

        let bundle_dir = inv.bundle_dir();
        log::info!("Assembling {}", bundle_dir.display());
        fs::ensure_dir(&bundle_dir).await?;

        layout::install_layout_objects(&artifacts.layout_objects, &inv.module_dir, &bundle_dir)
            .await?;
        manifest::install(&artifacts.manifests, &context, &bundle_dir, &self.plutil).await?;
        layout::link_layout_archives(
            &artifacts.layout_archives,
            &inv.app_name,
            &bundle_dir,
            &inv.layout_flags,
            &self.xcrun,
        )
        .await?;

        resources::install(
            &artifacts.resource_archives,
            PostProcess::None,
            &bundle_dir,
            &self.plutil,
            &self.codesign,
        )
        .await?;
        resources::install(
            &artifacts.signed_resource_archives,
            PostProcess::SignEach,
            &bundle_dir,
            &self.plutil,
            &self.codesign,
        )
        .await?;
        resources::install(
            &artifacts.strings_archives,
            PostProcess::ConvertStrings,
            &bundle_dir,
            &self.plutil,
            &self.codesign,
        )
        .await?;

        self.install_binaries(&artifacts.binaries, &bundle_dir).await?;

        let entitlements = sign::resolve_entitlements(
            artifacts.entitlements.as_deref(),
            &inv.module_dir,
            &inv.app_name,
        )
        .await?;
        sign::sign_bundle(&self.codesign, &entitlements, &bundle_dir).await?;

        // Terminal step: nothing may write to the bundle tree after this
        archiver::archive_bundle(&bundle_dir, &inv.output).await?;
        Ok(inv.output.clone())
    }

    /// Copy every candidate binary into the bundle root under its file
    /// name, before whole-bundle signing so the signature covers them.
    async fn install_binaries(&self, binaries: &[PathBuf], bundle_dir: &Path) -> Result<()> {
        for binary in binaries {
            let Some(name) = binary.file_name() else {
                crate::bail!("candidate binary {binary:?} has no file name");
            };
            fs::copy_file(binary, &bundle_dir.join(name)).await?;
        }
        Ok(())
    }
}
