//! Binary-level tests for the assembler CLI.
//!
//! External tools (plutil, codesign) are substituted through the
//! `APPBUNDLE_*` environment overrides so the pipeline can run end to end
//! on any host.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const DELIM: &str = "__DELIM__";

fn cmd() -> Command {
    Command::cargo_bin("appbundle").unwrap()
}

/// A tool stub that always succeeds.
#[cfg(unix)]
fn write_stub(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let stub = dir.join("tool-stub");
    std::fs::write(&stub, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
    stub
}

fn write_plist(path: &Path, pairs: &[(&str, &str)]) {
    let mut dict = plist::Dictionary::new();
    for (k, v) in pairs {
        dict.insert((*k).to_string(), plist::Value::String((*v).to_string()));
    }
    plist::Value::Dictionary(dict).to_file_xml(path).unwrap();
}

fn tar_entries(archive: &Path) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;
    let mut tar = tar::Archive::new(std::fs::File::open(archive).unwrap());
    tar.entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}

#[test]
fn leading_help_flag_prints_help_instead_of_failing() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assembles"));
}

#[test]
fn leading_version_flag_prints_the_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn empty_invocation_fails() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad invocation"));
}

#[test]
fn malformed_grouping_fails() {
    cmd()
        .args(["out.tar", "Demo", "/tmp/mod", DELIM, "Info.plist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad invocation"));
}

#[test]
fn missing_manifest_fails_before_any_filesystem_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let module_dir = tmp.path().join("mod");
    std::fs::create_dir_all(&module_dir).unwrap();
    let out = tmp.path().join("out.tar");

    cmd()
        .args([
            out.to_str().unwrap(),
            "Demo",
            module_dir.to_str().unwrap(),
            DELIM,
            "res.resource_tar",
            DELIM,
            DELIM,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no manifest artifacts"));

    assert!(!module_dir.join("Demo.app").exists());
    assert!(!out.exists());
}

#[test]
fn two_entitlements_descriptors_fail_before_bundle_creation() {
    let tmp = tempfile::tempdir().unwrap();
    let module_dir = tmp.path().join("mod");
    std::fs::create_dir_all(&module_dir).unwrap();

    cmd()
        .args([
            tmp.path().join("out.tar").to_str().unwrap(),
            "Demo",
            module_dir.to_str().unwrap(),
            DELIM,
            "Info.plist",
            "a.xcent",
            "b.xcent",
            DELIM,
            DELIM,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too many signing descriptors"));

    assert!(!module_dir.join("Demo.app").exists());
}

#[cfg(unix)]
#[test]
fn assembles_a_minimal_bundle_end_to_end() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path());
    let module_dir = tmp.path().join("mod");
    std::fs::create_dir_all(&module_dir).unwrap();

    let manifest = tmp.path().join("Info.plist");
    write_plist(&manifest, &[("CFBundleName", "$(PRODUCT_NAME)")]);

    let binary = tmp.path().join("App");
    std::fs::write(&binary, b"#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

    let out = tmp.path().join("Demo.tar");
    cmd()
        .env("APPBUNDLE_PLUTIL", &stub)
        .env("APPBUNDLE_CODESIGN", &stub)
        .args([
            out.to_str().unwrap(),
            "Demo",
            module_dir.to_str().unwrap(),
            DELIM,
            manifest.to_str().unwrap(),
            DELIM,
            binary.to_str().unwrap(),
            DELIM,
        ])
        .assert()
        .success();

    // Synthesized entitlements descriptor sits next to the bundle
    assert!(module_dir.join("Demo.xcent").is_file());

    let entries = tar_entries(&out);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Demo.app/App", "Demo.app/Info.plist"]);

    // The placeholder resolved to the app name (the converter stub left
    // the manifest in XML form, so it can be read back directly)
    let manifest_bytes = &entries.iter().find(|(n, _)| n.ends_with("Info.plist")).unwrap().1;
    let value = plist::Value::from_reader(Cursor::new(manifest_bytes)).unwrap();
    assert_eq!(
        value.as_dictionary().unwrap().get("CFBundleName"),
        Some(&plist::Value::String("Demo".into()))
    );
}

#[cfg(unix)]
#[test]
fn round_trip_without_placeholders_or_resources() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path());
    let module_dir = tmp.path().join("mod");
    std::fs::create_dir_all(&module_dir).unwrap();

    let manifest = tmp.path().join("Info.plist");
    write_plist(&manifest, &[("CFBundleVersion", "1.2.3")]);

    let out = tmp.path().join("out.tar");
    cmd()
        .env("APPBUNDLE_PLUTIL", &stub)
        .env("APPBUNDLE_CODESIGN", &stub)
        .args([
            out.to_str().unwrap(),
            "Demo",
            module_dir.to_str().unwrap(),
            DELIM,
            manifest.to_str().unwrap(),
            DELIM,
            DELIM,
        ])
        .assert()
        .success();

    let entries = tar_entries(&out);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "Demo.app/Info.plist");

    let value = plist::Value::from_reader(Cursor::new(&entries[0].1)).unwrap();
    assert_eq!(
        value.as_dictionary().unwrap().get("CFBundleVersion"),
        Some(&plist::Value::String("1.2.3".into()))
    );
}

#[cfg(unix)]
#[test]
fn traversal_resource_archive_aborts_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let stub = write_stub(tmp.path());
    let module_dir = tmp.path().join("mod");
    std::fs::create_dir_all(&module_dir).unwrap();

    let manifest = tmp.path().join("Info.plist");
    write_plist(&manifest, &[("CFBundleName", "Demo")]);

    let evil = tmp.path().join("evil.resource_tar");
    let mut builder = tar::Builder::new(std::fs::File::create(&evil).unwrap());
    let mut header = tar::Header::new_gnu();
    header.set_size(4);
    header.set_mode(0o644);
    // Write the name bytes directly: `set_path` refuses `..` segments,
    // which this fixture needs to exercise.
    let name = b"../../escape.txt";
    header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
    header.set_cksum();
    builder.append(&header, &b"evil"[..]).unwrap();
    builder.finish().unwrap();

    let out = tmp.path().join("out.tar");
    cmd()
        .env("APPBUNDLE_PLUTIL", &stub)
        .env("APPBUNDLE_CODESIGN", &stub)
        .args([
            out.to_str().unwrap(),
            "Demo",
            module_dir.to_str().unwrap(),
            DELIM,
            manifest.to_str().unwrap(),
            evil.to_str().unwrap(),
            DELIM,
            DELIM,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("path traversal"));

    assert!(!tmp.path().join("escape.txt").exists());
    assert!(!out.exists());
}
