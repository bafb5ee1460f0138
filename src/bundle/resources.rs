//! Resource installation.
//!
//! Resource archives come in three kinds: plain, localized-strings
//! (every extracted entry is converted to binary plist form) and
//! pre-signed (every extracted entry is signed individually). The first
//! external-tool failure aborts the remaining entries.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::bundle::archive;
use crate::bundle::error::Result;
use crate::bundle::exec::Tool;
use crate::bundle::sign;

/// Per-entry post-processing applied after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Plain resources, extracted as-is
    None,
    /// Strings files are plist-encoded and converted to binary form
    ConvertStrings,
    /// Each entry receives an individual ad-hoc signature
    SignEach,
}

/// Extract each archive into the bundle tree and apply the kind's
/// per-entry step.
pub async fn install(
    archives: &[PathBuf],
    post: PostProcess,
    bundle_dir: &Path,
    converter: &Tool,
    codesign: &Tool,
) -> Result<()> {
    for arc in archives {
        log::debug!("Installing resources from {}", arc.display());
        let entries = archive::unpack_tar_checked(arc, bundle_dir).await?;
        for relative in entries {
            let extracted = bundle_dir.join(&relative);
            match post {
                PostProcess::None => {}
                PostProcess::ConvertStrings => {
                    converter
                        .run([
                            OsStr::new("-convert"),
                            OsStr::new("binary1"),
                            extracted.as_os_str(),
                        ])
                        .await?;
                }
                PostProcess::SignEach => sign::sign_file(codesign, &extracted).await?,
            }
        }
    }
    Ok(())
}
