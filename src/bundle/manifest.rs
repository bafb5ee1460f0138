//! Manifest merging and placeholder substitution.
//!
//! All `.plist` / `.partial_plist` fragments are folded into one canonical
//! manifest: shallow top-level merge in input order (last writer wins per
//! key, nested structures replaced wholesale), followed by a pure recursive
//! substitution pass that resolves registered placeholder spellings.
//!
//! The canonical tree is written to `Info.plist` inside the bundle and then
//! handed to the external binary-encoding converter; a converter failure
//! aborts the whole run.

use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};

use crate::bundle::error::{Context, Result};
use crate::bundle::exec::Tool;
use crate::bundle::template::TemplateContext;

/// Name of the primary manifest inside the bundle.
pub const MANIFEST_NAME: &str = "Info.plist";

/// Merge the manifest fragments, resolve placeholders, write the result to
/// `<bundle_dir>/Info.plist` and convert it to binary form in place.
pub async fn install(
    fragments: &[PathBuf],
    context: &TemplateContext,
    bundle_dir: &Path,
    converter: &Tool,
) -> Result<PathBuf> {
    let merged = merge(fragments)?;
    let resolved = substitute_tree(&merged, context);

    let out = bundle_dir.join(MANIFEST_NAME);
    Value::Dictionary(resolved)
        .to_file_xml(&out)
        .map_err(crate::bundle::Error::Plist)
        .with_context(|| format!("writing merged manifest to {}", out.display()))?;

    log::debug!("Converting {} to binary form", out.display());
    converter
        .run([
            std::ffi::OsStr::new("-convert"),
            std::ffi::OsStr::new("binary1"),
            out.as_os_str(),
        ])
        .await?;
    Ok(out)
}

/// Shallow top-level merge of the fragment documents, in input order.
pub fn merge(fragments: &[PathBuf]) -> Result<Dictionary> {
    let mut united = Dictionary::new();
    for fragment in fragments {
        let value = Value::from_file(fragment)
            .map_err(crate::bundle::Error::Plist)
            .with_context(|| format!("reading manifest fragment {}", fragment.display()))?;
        let Some(dict) = value.into_dictionary() else {
            crate::bail!(
                "manifest fragment {} does not have a dictionary root",
                fragment.display()
            );
        };
        for (key, value) in dict {
            united.insert(key, value);
        }
    }
    Ok(united)
}

/// Pure recursive placeholder substitution over a manifest tree.
///
/// A string scalar (or string element of a sequence) that exactly equals a
/// registered spelling is replaced by the mapped value; dictionaries and
/// dictionary sequence elements recurse; everything else passes through
/// unchanged. The input tree is never mutated.
pub fn substitute_tree(doc: &Dictionary, context: &TemplateContext) -> Dictionary {
    let mut out = Dictionary::new();
    for (key, value) in doc {
        out.insert(key.clone(), substitute_value(value, context));
    }
    out
}

fn substitute_value(value: &Value, context: &TemplateContext) -> Value {
    match value {
        Value::Dictionary(dict) => Value::Dictionary(substitute_tree(dict, context)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Dictionary(dict) => Value::Dictionary(substitute_tree(dict, context)),
                    Value::String(s) => resolve_scalar(s, item, context),
                    other => other.clone(),
                })
                .collect(),
        ),
        Value::String(s) => resolve_scalar(s, value, context),
        other => other.clone(),
    }
}

fn resolve_scalar(spelling: &str, original: &Value, context: &TemplateContext) -> Value {
    match context.lookup(spelling) {
        Some(replacement) => replacement.clone(),
        None => original.clone(),
    }
}
