//! Bundle assembly pipeline.
//!
//! This module hosts the whole artifact-to-archive pipeline:
//!
//! 1. [`artifact`] - classifies raw input paths into typed roles
//! 2. [`template`] - builds the placeholder substitution context
//! 3. [`manifest`] - merges plist fragments and resolves placeholders
//! 4. [`archive`] - containment-checked tar extraction
//! 5. [`layout`] - unpacks and links precompiled interface layouts
//! 6. [`resources`] - installs resource archives into the bundle tree
//! 7. [`sign`] - applies the code-signing tool to the tree or single files
//! 8. [`archiver`] - produces the final deterministic bundle archive
//!
//! [`pipeline::Assembler`] wires the stages together in that order; every
//! stage completes (or fails fatally) before the next one starts.

pub mod archive;
pub mod archiver;
pub mod artifact;
pub mod error;
pub mod exec;
pub mod fs;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod resources;
pub mod sign;
pub mod template;

pub use error::{Error, Result};
pub use pipeline::{Assembler, Invocation};
