//! Output purity: detection, cleaning and validation.
//!
//! # Architecture
//!
//! - `rules`: Versioned rule snapshots and the pure detection algorithm
//! - `detector`: Holder of the current snapshot; publishes new versions
//! - `cleaner`: Removes findings until the text is clean
//! - `validator`: Script-share scoring and the pass/fail decision

mod cleaner;
mod detector;
mod rules;
mod validator;

pub use cleaner::{CleaningReport, ContentCleaner};
pub use detector::PatternDetector;
pub use rules::{
    LiteralRule, PatternKind, ProblematicPattern, RuleChange, RuleOrigin, RuleSet, Severity,
};
pub use validator::{
    effective_threshold, PurityScore, PurityValidator, DEFAULT_THRESHOLD, PURITY_FLOOR,
};
