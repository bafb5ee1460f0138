//! Application bundle assembly library.
//!
//! This library turns a flat list of independently built artifacts
//! (plist fragments, precompiled interface-layout archives, resource
//! archives, raw binaries, an entitlements descriptor) into one signed,
//! deployable `.app` bundle archive.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundle;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{AssemblerError, Result};
