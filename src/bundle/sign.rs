//! Code signing.
//!
//! One external tool contract, two invocation shapes: the whole bundle
//! tree is signed once with an entitlements descriptor (supplied, or a
//! synthesized minimal default), and individual resource files are signed
//! without one. Identity is always ad-hoc, timestamps disabled, existing
//! signatures overwritten.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};

use crate::bundle::error::{Context, Result};
use crate::bundle::exec::Tool;

/// The single capability granted by the synthesized default descriptor.
const DEBUG_ENTITLEMENT: &str = "com.apple.security.get-task-allow";

/// Resolve the entitlements descriptor for whole-bundle signing.
///
/// When none was supplied, a minimal default granting only the debug
/// capability is written to `<module_dir>/<app_name>.xcent`.
pub async fn resolve_entitlements(
    supplied: Option<&Path>,
    module_dir: &Path,
    app_name: &str,
) -> Result<PathBuf> {
    if let Some(descriptor) = supplied {
        return Ok(descriptor.to_path_buf());
    }

    let descriptor = module_dir.join(format!("{app_name}.xcent"));
    let mut capabilities = Dictionary::new();
    capabilities.insert(DEBUG_ENTITLEMENT.to_string(), Value::Boolean(true));
    Value::Dictionary(capabilities)
        .to_file_xml(&descriptor)
        .map_err(crate::bundle::Error::Plist)
        .with_context(|| format!("writing default entitlements to {}", descriptor.display()))?;
    log::debug!("Synthesized default entitlements at {}", descriptor.display());
    Ok(descriptor)
}

/// Sign the whole bundle tree with the given entitlements descriptor.
pub async fn sign_bundle(
    codesign: &Tool,
    entitlements: &Path,
    bundle_dir: &Path,
) -> Result<()> {
    log::info!("Signing {}", bundle_dir.display());
    codesign
        .run([
            OsStr::new("--force"),
            OsStr::new("--sign"),
            OsStr::new("-"),
            OsStr::new("--entitlements"),
            entitlements.as_os_str(),
            OsStr::new("--timestamp=none"),
            bundle_dir.as_os_str(),
        ])
        .await
}

/// Sign a single extracted file; no entitlements argument in this shape.
pub async fn sign_file(codesign: &Tool, path: &Path) -> Result<()> {
    codesign
        .run([
            OsStr::new("--force"),
            OsStr::new("--sign"),
            OsStr::new("-"),
            path.as_os_str(),
        ])
        .await
}
