//! Placeholder substitution context.
//!
//! Manifest fragments arrive with build-system placeholders such as
//! `$(PRODUCT_NAME)` in scalar positions. The context maps every
//! registered placeholder spelling to its replacement value; it is built
//! once, in a fixed precedence order, and then threaded immutably through
//! the manifest merge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use plist::Value;

use crate::bundle::error::{Error, ErrorExt, Result};

/// Prefix used to synthesize `PRODUCT_BUNDLE_IDENTIFIER` when no override
/// supplies one.
pub const BUNDLE_ID_PREFIX: &str = "org.appbundle";

/// Development language recorded in fixed defaults.
const DEVELOPMENT_LANGUAGE: &str = "en";

/// Immutable mapping from placeholder spelling to replacement value.
///
/// Each key is registered under both delimiter conventions,
/// `$(KEY)` and `${KEY}`, pointing at the same value.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    spellings: HashMap<String, Value>,
}

impl TemplateContext {
    /// Build the context in precedence order: fixed defaults first, then
    /// each override source in input order, later writes overwriting
    /// earlier ones per key.
    pub fn build(
        app_name: &str,
        main_binary: Option<&Path>,
        overrides: &[PathBuf],
    ) -> Result<Self> {
        let executable_name = main_binary
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut parameters: HashMap<String, Value> = HashMap::from([
            (
                "DEVELOPMENT_LANGUAGE".to_string(),
                Value::String(DEVELOPMENT_LANGUAGE.to_string()),
            ),
            ("EXECUTABLE_NAME".to_string(), Value::String(executable_name)),
            (
                "PRODUCT_BUNDLE_IDENTIFIER".to_string(),
                Value::String(format!("{BUNDLE_ID_PREFIX}.{app_name}")),
            ),
            ("PRODUCT_NAME".to_string(), Value::String(app_name.to_string())),
        ]);

        for source in overrides {
            for (key, value) in load_override(source)? {
                parameters.insert(key, value);
            }
        }

        let mut spellings = HashMap::with_capacity(parameters.len() * 2);
        for (key, value) in parameters {
            spellings.insert(format!("$({key})"), value.clone());
            spellings.insert(format!("${{{key}}}"), value);
        }
        Ok(Self { spellings })
    }

    /// Replacement for an exact placeholder spelling, if registered.
    pub fn lookup(&self, spelling: &str) -> Option<&Value> {
        self.spellings.get(spelling)
    }
}

/// Parse one `.plist_json` override source as a flat JSON object.
fn load_override(path: &Path) -> Result<Vec<(String, Value)>> {
    let raw = std::fs::read_to_string(path).fs_context("reading override source", path)?;
    let parsed: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| Error::MalformedOverride {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let object = parsed.as_object().ok_or_else(|| Error::MalformedOverride {
        path: path.to_path_buf(),
        reason: "top-level value is not an object".to_string(),
    })?;

    object
        .iter()
        .map(|(key, value)| {
            let converted = json_to_plist(value).ok_or_else(|| Error::MalformedOverride {
                path: path.to_path_buf(),
                reason: format!("key {key:?} has a null value"),
            })?;
            Ok((key.clone(), converted))
        })
        .collect()
}

/// Convert a JSON value into its plist counterpart. Null has no plist
/// representation and is rejected by the caller.
fn json_to_plist(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Number(n) => Some(if let Some(i) = n.as_i64() {
            Value::Integer(i.into())
        } else {
            Value::Real(n.as_f64().unwrap_or(f64::NAN))
        }),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Array(items) => Some(Value::Array(
            items.iter().map(json_to_plist).collect::<Option<Vec<_>>>()?,
        )),
        serde_json::Value::Object(map) => {
            let mut dict = plist::Dictionary::new();
            for (k, v) in map {
                dict.insert(k.clone(), json_to_plist(v)?);
            }
            Some(Value::Dictionary(dict))
        }
    }
}
