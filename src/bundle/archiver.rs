//! Final bundle archiving.
//!
//! The terminal, irreversible pipeline step: the fully assembled bundle
//! tree is walked in sorted order and every regular file is appended to
//! one uncompressed tar, with entry names rooted at the bundle's own name
//! instead of the source path. The archive's SHA-256 is computed for the
//! completion log.

use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::bundle::error::{Error, ErrorExt, Result};

/// Write the output archive for `bundle_dir` at `output` and return the
/// archive's hex-encoded SHA-256.
pub async fn archive_bundle(bundle_dir: &Path, output: &Path) -> Result<String> {
    let bundle_dir = bundle_dir.to_path_buf();
    let output_path = output.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&bundle_dir, &output_path))
        .await
        .map_err(|e| Error::Generic(format!("archiving task panicked: {e}")))??;

    let checksum = file_sha256(output).await?;
    log::info!("✓ Wrote {} (sha256 {})", output.display(), checksum);
    Ok(checksum)
}

fn write_archive(bundle_dir: &Path, output: &Path) -> Result<()> {
    let root: PathBuf = bundle_dir
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::Generic(format!("invalid bundle directory {bundle_dir:?}")))?;

    let file = File::create(output).fs_context("creating output archive", output)?;
    let mut builder = tar::Builder::new(file);

    // Sorted traversal keeps the archive layout repeatable
    for entry in walkdir::WalkDir::new(bundle_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Generic(format!("walking bundle tree: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(bundle_dir)
            .map_err(|e| Error::Generic(format!("computing archive entry name: {e}")))?;
        builder
            .append_path_with_name(entry.path(), root.join(relative))
            .fs_context("appending archive entry", entry.path())?;
    }

    builder.finish().fs_context("finishing output archive", output)
}

/// SHA-256 of a single file, read in 8KB chunks.
async fn file_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening archive for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading archive for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut tar = tar::Archive::new(File::open(archive).unwrap());
        tar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn entries_are_rooted_at_the_bundle_name() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("Demo.app");
        std::fs::create_dir_all(bundle.join("Assets")).unwrap();
        std::fs::write(bundle.join("Info.plist"), b"manifest").unwrap();
        std::fs::write(bundle.join("Assets/logo.png"), b"png").unwrap();

        let output = tmp.path().join("Demo.tar");
        let checksum = archive_bundle(&bundle, &output).await.unwrap();
        assert_eq!(checksum.len(), 64);

        let names = entry_names(&output);
        assert_eq!(names, vec!["Demo.app/Assets/logo.png", "Demo.app/Info.plist"]);
    }

    #[tokio::test]
    async fn archive_layout_is_repeatable() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("Demo.app");
        std::fs::create_dir_all(&bundle).unwrap();
        for name in ["b.txt", "a.txt", "c.txt"] {
            std::fs::write(bundle.join(name), name.as_bytes()).unwrap();
        }

        let first = tmp.path().join("first.tar");
        let second = tmp.path().join("second.tar");
        archive_bundle(&bundle, &first).await.unwrap();
        archive_bundle(&bundle, &second).await.unwrap();
        assert_eq!(entry_names(&first), entry_names(&second));
        assert_eq!(
            entry_names(&first),
            vec!["Demo.app/a.txt", "Demo.app/b.txt", "Demo.app/c.txt"]
        );
    }
}
