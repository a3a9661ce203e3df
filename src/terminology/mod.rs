//! Legal terminology store.
//!
//! - `entry`: Entry, domain and versioned-record types
//! - `store`: Copy-on-write dictionary with longest-match-first substitution
//! - `dataset`: Reference datasets the store is seeded from

mod dataset;
mod entry;
mod store;

pub use dataset::{BuiltinDataset, JsonDataset, ReferenceDataset};
pub use entry::{LegalDomain, TerminologyEntry, VersionedEntry};
pub use store::{Dictionary, TerminologyStore};
