//! Artifact classification.
//!
//! Build systems hand the assembler one flat, unordered list of output
//! files. Every path is sorted into exactly one [`ArtifactKind`] bucket by
//! filename suffix; downstream stages match on the kind exhaustively so a
//! new kind cannot be silently ignored.

use std::path::{Path, PathBuf};

use crate::bundle::error::{Error, Result};

/// Typed role of one input artifact, derived purely from its filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Primary manifest fragment (`.plist`)
    Manifest,
    /// Partial manifest fragment (`.partial_plist`)
    PartialManifest,
    /// Precompiled interface-layout archive (`.compiled_storyboard_tar`)
    LayoutArchive,
    /// Entitlements descriptor (`.xcent`)
    EntitlementsFile,
    /// Compiled layout object, already linked (`.nib`)
    LayoutCompiledObject,
    /// Plain resource archive (`.resource_tar`)
    ResourceArchive,
    /// Resource archive whose entries must be signed individually (`.signed_resource_tar`)
    SignedResourceArchive,
    /// Flat JSON key/value override for the template context (`.plist_json`)
    ManifestOverrideJson,
    /// Archive of plist-encoded localized strings (`.strings_tar`)
    LocalizedStringsArchive,
    /// Anything else; reported and ignored
    Unknown,
}

impl ArtifactKind {
    /// Classify a single path by suffix.
    ///
    /// `.partial_plist` is checked before `.plist` because the latter is a
    /// suffix of the former.
    pub fn of(path: &Path) -> Self {
        let name = path.to_string_lossy();
        if name.ends_with(".partial_plist") {
            Self::PartialManifest
        } else if name.ends_with(".plist") {
            Self::Manifest
        } else if name.ends_with(".compiled_storyboard_tar") {
            Self::LayoutArchive
        } else if name.ends_with(".xcent") {
            Self::EntitlementsFile
        } else if name.ends_with(".nib") {
            Self::LayoutCompiledObject
        } else if name.ends_with(".signed_resource_tar") {
            Self::SignedResourceArchive
        } else if name.ends_with(".resource_tar") {
            Self::ResourceArchive
        } else if name.ends_with(".plist_json") {
            Self::ManifestOverrideJson
        } else if name.ends_with(".strings_tar") {
            Self::LocalizedStringsArchive
        } else {
            Self::Unknown
        }
    }
}

/// Classified view of the input list.
///
/// Manifests keep their input order because merge order is significant;
/// the same holds for override sources and resource archives.
#[derive(Debug, Default)]
pub struct Artifacts {
    /// Manifest and partial-manifest fragments, in input order
    pub manifests: Vec<PathBuf>,
    /// Kinds of the manifest fragments, parallel to `manifests`
    pub manifest_kinds: Vec<ArtifactKind>,
    /// Precompiled layout archives
    pub layout_archives: Vec<PathBuf>,
    /// Supplied entitlements descriptor, if any
    pub entitlements: Option<PathBuf>,
    /// Compiled layout objects to copy verbatim
    pub layout_objects: Vec<PathBuf>,
    /// Plain resource archives
    pub resource_archives: Vec<PathBuf>,
    /// Resource archives whose entries are signed individually
    pub signed_resource_archives: Vec<PathBuf>,
    /// JSON override sources for the template context, in input order
    pub overrides: Vec<PathBuf>,
    /// Localized-strings archives
    pub strings_archives: Vec<PathBuf>,
    /// Candidate binaries as supplied
    pub binaries: Vec<PathBuf>,
    /// The binary designated as the bundle's executable, if any
    pub main_binary: Option<PathBuf>,
}

impl Artifacts {
    /// Partition `inputs` into kind buckets and pick the main binary among
    /// `binaries`.
    ///
    /// Fatal conditions: no manifest fragment at all, or more than one
    /// entitlements descriptor. Everything else (unknown inputs, empty
    /// layout set, no executable binary, several executable binaries) is
    /// reported as a warning and the run continues.
    pub fn classify(inputs: &[PathBuf], binaries: &[PathBuf]) -> Result<Self> {
        let mut artifacts = Self {
            binaries: binaries.to_vec(),
            ..Self::default()
        };
        let mut xcent_count = 0usize;

        for input in inputs {
            let kind = ArtifactKind::of(input);
            match kind {
                ArtifactKind::Manifest | ArtifactKind::PartialManifest => {
                    artifacts.manifests.push(input.clone());
                    artifacts.manifest_kinds.push(kind);
                }
                ArtifactKind::LayoutArchive => artifacts.layout_archives.push(input.clone()),
                ArtifactKind::EntitlementsFile => {
                    xcent_count += 1;
                    if artifacts.entitlements.is_none() {
                        artifacts.entitlements = Some(input.clone());
                    }
                }
                ArtifactKind::LayoutCompiledObject => {
                    artifacts.layout_objects.push(input.clone())
                }
                ArtifactKind::ResourceArchive => artifacts.resource_archives.push(input.clone()),
                ArtifactKind::SignedResourceArchive => {
                    artifacts.signed_resource_archives.push(input.clone())
                }
                ArtifactKind::ManifestOverrideJson => artifacts.overrides.push(input.clone()),
                ArtifactKind::LocalizedStringsArchive => {
                    artifacts.strings_archives.push(input.clone())
                }
                ArtifactKind::Unknown => {
                    log::warn!("Unknown input: {}, ignoring", input.display());
                }
            }
        }

        if artifacts.manifests.is_empty() {
            return Err(Error::MissingManifest);
        }
        if artifacts.manifest_kinds[0] != ArtifactKind::Manifest {
            // A pure partial_plist set usually means the inputs are misordered
            log::warn!("Main manifest may be defined incorrectly: first fragment is a partial");
        }
        if xcent_count > 1 {
            return Err(Error::TooManySigningDescriptors { count: xcent_count });
        }
        if artifacts.layout_archives.is_empty() {
            log::warn!("No interface-layout archives supplied");
        }
        if binaries.is_empty() {
            log::warn!("No binary files found in your application");
        }

        artifacts.main_binary = pick_main_binary(binaries);
        if artifacts.main_binary.is_none() && !binaries.is_empty() {
            log::warn!("No executable file found among the candidate binaries");
        }

        Ok(artifacts)
    }
}

/// First executable-permission-bearing candidate wins; the rest are named
/// in a warning. A bundle with no executable at all is legal (resource-only).
fn pick_main_binary(binaries: &[PathBuf]) -> Option<PathBuf> {
    let mut main_binary: Option<&PathBuf> = None;
    for binary in binaries {
        if !is_executable(binary) {
            continue;
        }
        match main_binary {
            None => main_binary = Some(binary),
            Some(chosen) => log::warn!(
                "Multiple executable files found, {} will be used and {} discarded",
                chosen.display(),
                binary.display()
            ),
        }
    }
    main_binary.cloned()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
