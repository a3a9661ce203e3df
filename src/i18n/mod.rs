//! Internationalization (i18n) module for the two supported languages.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for supported languages and their metadata
//! - `language`: Type-safe, validated `Language` handle
//! - `script`: Character-to-script classification shared by detection and scoring

mod language;
mod registry;
mod script;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
pub use script::{classify, dominant_script, script_of, CharClass, Script, ScriptCounts};
