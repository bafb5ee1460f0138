//! Interface-layout linking.
//!
//! Precompiled layout archives are unpacked next to themselves (the
//! archive extension becomes the compiled-object suffix) and then handed
//! to the external layout compiler in one invocation that links everything
//! into the bundle. Already-compiled layout objects are copied into the
//! bundle directly.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::bundle::archive;
use crate::bundle::error::Result;
use crate::bundle::exec::Tool;
use crate::bundle::fs;

/// Unpack each layout archive and run the layout compiler once over all of
/// the unpacked directories. Skipped entirely when no archives are present
/// (the classifier already warned about that).
pub async fn link_layout_archives(
    archives: &[PathBuf],
    app_name: &str,
    bundle_dir: &Path,
    user_flags: &[String],
    xcrun: &Tool,
) -> Result<()> {
    if archives.is_empty() {
        return Ok(());
    }

    let mut unpacked = Vec::with_capacity(archives.len());
    for arc in archives {
        let dir = compiled_dir_for(arc);
        archive::unpack_tar_checked(arc, &dir).await?;
        unpacked.push(dir);
    }

    log::info!("Linking {} interface-layout archive(s)", unpacked.len());
    let mut args: Vec<OsString> = vec!["ibtool".into()];
    args.extend(user_flags.iter().map(OsString::from));
    args.extend(["--module".into(), app_name.into()]);
    args.extend(["--link".into(), bundle_dir.as_os_str().to_owned()]);
    args.extend(
        ["--errors", "--warnings", "--notices", "--output-format", "human-readable-text"]
            .map(OsString::from),
    );
    args.extend(unpacked.iter().map(|d| d.as_os_str().to_owned()));
    xcrun.run(args).await
}

/// Copy compiled layout objects into the bundle, preserving their path
/// relative to the module directory. Objects from outside the module
/// directory land at the bundle root under their file name.
pub async fn install_layout_objects(
    objects: &[PathBuf],
    module_dir: &Path,
    bundle_dir: &Path,
) -> Result<()> {
    for object in objects {
        let relative = object
            .strip_prefix(module_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(object.file_name().unwrap_or(object.as_os_str())));
        fs::copy_file(object, &bundle_dir.join(relative)).await?;
    }
    Ok(())
}

/// Sibling directory a layout archive unpacks into: the archive extension
/// is replaced by the compiled-object suffix (`Main.compiled_storyboard_tar`
/// unpacks into `Mainc`).
fn compiled_dir_for(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .unwrap_or(archive.as_os_str())
        .to_string_lossy();
    archive.with_file_name(format!("{stem}c"))
}
