//! Containment-checked tar extraction.
//!
//! Every nested archive the assembler touches goes through this module.
//! The invariant is fail-closed: the full member list is validated against
//! the canonicalized destination before a single byte is extracted, so a
//! crafted archive can never write outside its target directory. Member
//! names must be plain relative paths (no root, no parent segments); link
//! entries additionally have their targets checked for containment, which
//! closes the symlink-then-write-through-it escape. Extraction itself goes
//! through the component-checked [`tar::Entry::unpack_in`] as a backstop
//! against writing through a symlinked path component.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use path_absolutize::Absolutize;

use crate::bundle::error::{Error, ErrorExt, Result};
use crate::bundle::fs;

/// Extract `archive` into `dest`, creating `dest` as needed.
///
/// Returns the relative paths of the extracted regular files in archive
/// order, so callers can post-process entries individually.
pub async fn unpack_tar_checked(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    fs::ensure_dir(dest).await?;

    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_sync(&archive, &dest))
        .await
        .map_err(|e| Error::Generic(format!("archive extraction task panicked: {e}")))?
}

fn unpack_sync(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let canonical_dest = dest
        .canonicalize()
        .fs_context("canonicalizing extraction destination", dest)?;

    // Pass 1: validate every member before any extraction side effect.
    let file = File::open(archive_path).fs_context("opening archive", archive_path)?;
    let mut tar = tar::Archive::new(file);
    for entry in tar.entries().fs_context("reading archive", archive_path)? {
        let entry = entry.fs_context("reading archive member", archive_path)?;
        let name = entry
            .path()
            .fs_context("reading archive member name", archive_path)?
            .into_owned();
        validate_member_name(&canonical_dest, &name)?;

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name()
                .fs_context("reading archive link target", archive_path)?
                .ok_or_else(|| {
                    Error::Generic(format!("archive link entry {name:?} has no target"))
                })?;
            // A symlink target resolves relative to the link's own
            // directory; a hard link target is archive-root relative.
            let resolved = if kind.is_symlink() {
                name.parent().unwrap_or(Path::new("")).join(&target)
            } else {
                target.into_owned()
            };
            checked_join(&canonical_dest, &resolved).map_err(|_| Error::PathTraversal {
                entry: name.clone(),
                dest: canonical_dest.clone(),
            })?;
        }
    }

    // Pass 2: extract through the component-checked unpacker.
    let file = File::open(archive_path).fs_context("opening archive", archive_path)?;
    let mut tar = tar::Archive::new(file);
    let mut extracted = Vec::new();
    for entry in tar.entries().fs_context("reading archive", archive_path)? {
        let mut entry = entry.fs_context("reading archive member", archive_path)?;
        let name = entry
            .path()
            .fs_context("reading archive member name", archive_path)?
            .into_owned();
        let is_file = entry.header().entry_type().is_file();
        let written = entry
            .unpack_in(&canonical_dest)
            .fs_context("extracting archive member", &canonical_dest)?;
        if !written {
            return Err(Error::PathTraversal {
                entry: name,
                dest: canonical_dest.clone(),
            });
        }
        if is_file {
            extracted.push(name);
        }
    }
    Ok(extracted)
}

/// Member names must be plain relative paths: no root, no prefix, no
/// parent segments. Parent segments are rejected outright (even ones that
/// would stay inside lexically), because a `..` after a symlinked
/// component resolves somewhere the lexical view cannot predict.
fn validate_member_name(canonical_dest: &Path, member: &Path) -> Result<()> {
    let plain = !member.is_absolute()
        && member
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if plain {
        Ok(())
    } else {
        Err(Error::PathTraversal {
            entry: member.to_path_buf(),
            dest: canonical_dest.to_path_buf(),
        })
    }
}

/// Join a link target onto the canonical destination, rejecting absolute
/// targets and any lexical escape above the destination. Parent segments
/// are legal here as long as they stay inside.
fn checked_join(canonical_dest: &Path, target: &Path) -> Result<PathBuf> {
    if target.is_absolute() {
        return Err(Error::PathTraversal {
            entry: target.to_path_buf(),
            dest: canonical_dest.to_path_buf(),
        });
    }
    target
        .absolutize_virtually(canonical_dest)
        .map(|p| p.into_owned())
        .map_err(|_| Error::PathTraversal {
            entry: target.to_path_buf(),
            dest: canonical_dest.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct TarFixture {
        builder: tar::Builder<Cursor<Vec<u8>>>,
    }

    impl TarFixture {
        fn new() -> Self {
            Self {
                builder: tar::Builder::new(Cursor::new(Vec::new())),
            }
        }

        fn file(mut self, name: &str, data: &[u8]) -> Self {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            // Write the name bytes directly: `set_path` refuses `..`
            // segments, which these fixtures need to exercise.
            let name_bytes = name.as_bytes();
            header.as_gnu_mut().unwrap().name[..name_bytes.len()].copy_from_slice(name_bytes);
            header.set_cksum();
            self.builder.append(&header, data).unwrap();
            self
        }

        fn symlink(mut self, name: &str, target: &str) -> Self {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_cksum();
            self.builder.append_link(&mut header, name, target).unwrap();
            self
        }

        fn write(self, path: &Path) {
            std::fs::write(path, self.builder.into_inner().unwrap().into_inner()).unwrap();
        }
    }

    #[tokio::test]
    async fn extracts_nested_members_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let arc = tmp.path().join("res.tar");
        TarFixture::new()
            .file("a.txt", b"alpha")
            .file("sub/b.txt", b"beta")
            .write(&arc);

        let dest = tmp.path().join("out");
        let extracted = unpack_tar_checked(&arc, &dest).await.unwrap();
        assert_eq!(
            extracted,
            vec![PathBuf::from("a.txt"), PathBuf::from("sub/b.txt")]
        );
        assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dest.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[tokio::test]
    async fn traversal_member_aborts_before_any_extraction() {
        let tmp = tempfile::tempdir().unwrap();
        // The benign member comes first; fail-closed means it still must
        // not be extracted.
        let arc = tmp.path().join("evil.tar");
        TarFixture::new()
            .file("ok.txt", b"fine")
            .file("../escape.txt", b"evil")
            .write(&arc);

        let dest = tmp.path().join("out");
        let err = unpack_tar_checked(&arc, &dest).await.unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!dest.join("ok.txt").exists());
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn parent_segments_are_rejected_even_when_lexically_inside() {
        let tmp = tempfile::tempdir().unwrap();
        let arc = tmp.path().join("odd.tar");
        TarFixture::new().file("sub/../c.txt", b"gamma").write(&arc);

        let dest = tmp.path().join("out");
        let err = unpack_tar_checked(&arc, &dest).await.unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!dest.join("c.txt").exists());
    }

    #[tokio::test]
    async fn deep_escape_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let arc = tmp.path().join("deep.tar");
        TarFixture::new().file("a/../../../etc/x", b"evil").write(&arc);

        let dest = tmp.path().join("out");
        let err = unpack_tar_checked(&arc, &dest).await.unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
    }

    #[tokio::test]
    async fn symlink_chain_cannot_write_outside_the_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();

        // Symlink pointing out of the destination, then a regular file
        // addressed through it.
        let arc = tmp.path().join("chain.tar");
        TarFixture::new()
            .symlink("evil", outside.to_str().unwrap())
            .file("evil/payload", b"boom")
            .write(&arc);

        let dest = tmp.path().join("out");
        let err = unpack_tar_checked(&arc, &dest).await.unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!outside.join("payload").exists());
        assert!(!dest.join("evil").exists());
    }

    #[tokio::test]
    async fn relative_symlink_escape_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let arc = tmp.path().join("rel.tar");
        TarFixture::new()
            .symlink("evil", "../../somewhere")
            .file("evil/payload", b"boom")
            .write(&arc);

        let dest = tmp.path().join("out");
        let err = unpack_tar_checked(&arc, &dest).await.unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!dest.exists() || !dest.join("evil").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn internal_symlink_entries_are_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        let arc = tmp.path().join("link.tar");
        TarFixture::new()
            .file("sub/a.txt", b"alpha")
            .symlink("link", "sub/a.txt")
            .write(&arc);

        let dest = tmp.path().join("out");
        let extracted = unpack_tar_checked(&arc, &dest).await.unwrap();
        // Only regular files are reported for post-processing
        assert_eq!(extracted, vec![PathBuf::from("sub/a.txt")]);
        assert_eq!(std::fs::read(dest.join("link")).unwrap(), b"alpha");
    }
}
