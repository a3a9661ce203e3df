//! Copy-on-write legal dictionary.
//!
//! A [`Dictionary`] is an immutable snapshot. Appends and rollbacks build a new
//! snapshot and swap it in, so a reader holding an `Arc<Dictionary>` never
//! observes a half-applied change.

use crate::error::TerminologyError;
use crate::i18n::Language;
use crate::purity::RuleOrigin;
use crate::terminology::entry::{TerminologyEntry, VersionedEntry};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    version: u64,
    records: Vec<VersionedEntry>,
    rolled_back: HashSet<Uuid>,
    /// Per pair: indices into `records` of the winning entries, longest source term first
    index: HashMap<(Language, Language), Vec<usize>>,
}

impl Dictionary {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[VersionedEntry] {
        &self.records
    }

    fn is_active(&self, record: &VersionedEntry) -> bool {
        match record.origin {
            RuleOrigin::Enhancement(id) => !self.rolled_back.contains(&id),
            _ => true,
        }
    }

    fn rebuild_index(&mut self) {
        let mut index: HashMap<(Language, Language), Vec<usize>> = HashMap::new();
        let mut seen: HashSet<(Language, Language, String)> = HashSet::new();

        // Newest first, so the latest active record for a term wins
        for (i, record) in self.records.iter().enumerate().rev() {
            if !self.is_active(record) {
                continue;
            }
            let entry = &record.entry;
            let pair = (entry.source_language, entry.target_language);
            let key = (pair.0, pair.1, entry.source_term.to_lowercase());
            if seen.insert(key) {
                index.entry(pair).or_default().push(i);
            }
        }

        for indices in index.values_mut() {
            indices.sort_by(|a, b| {
                let a = &self.records[*a].entry.source_term;
                let b = &self.records[*b].entry.source_term;
                b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b))
            });
        }
        self.index = index;
    }

    /// Winning entries for a pair, longest source term first.
    pub fn active_entries(&self, source: Language, target: Language) -> Vec<&TerminologyEntry> {
        self.index
            .get(&(source, target))
            .map(|indices| indices.iter().map(|i| &self.records[*i].entry).collect())
            .unwrap_or_default()
    }

    fn with_entry(&self, entry: TerminologyEntry, origin: RuleOrigin) -> Dictionary {
        let mut next = self.clone();
        next.version += 1;
        next.records.push(VersionedEntry {
            entry,
            version: next.version,
            origin,
        });
        next.rebuild_index();
        next
    }

    fn without_enhancement(&self, enhancement: Uuid) -> Dictionary {
        let mut next = self.clone();
        next.version += 1;
        next.rolled_back.insert(enhancement);
        next.rebuild_index();
        next
    }

    /// Whole-word, case-insensitive occurrences of the pair's terms, resolved
    /// longest term first. Returns `(start, end, entry)` sorted by position.
    fn find_spans<'a>(
        &'a self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Vec<(usize, usize, &'a TerminologyEntry)> {
        let mut claimed: Vec<(usize, usize, &TerminologyEntry)> = Vec::new();

        for entry in self.active_entries(source, target) {
            let Some(first) = entry.source_term.chars().next() else {
                continue;
            };
            for (start, c) in text.char_indices() {
                if !chars_eq_ignore_case(c, first) || !is_word_start(text, start) {
                    continue;
                }
                let Some(end) = match_at(text, start, &entry.source_term) else {
                    continue;
                };
                if !is_word_end(text, end) {
                    continue;
                }
                if claimed.iter().all(|(s, e, _)| end <= *s || start >= *e) {
                    claimed.push((start, end, entry));
                }
            }
        }

        claimed.sort_by_key(|(start, _, _)| *start);
        claimed
    }
}

/// Thread-safe handle to the current dictionary snapshot.
pub struct TerminologyStore {
    current: RwLock<Arc<Dictionary>>,
}

impl TerminologyStore {
    /// An empty store at version 0.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Dictionary::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<Dictionary> {
        Arc::clone(&self.current.read())
    }

    pub fn version(&self) -> u64 {
        self.current.read().version()
    }

    /// Translation of a single term, if the dictionary has one.
    pub fn lookup(&self, term: &str, source: Language, target: Language) -> Option<String> {
        let term = term.trim();
        self.snapshot()
            .active_entries(source, target)
            .into_iter()
            .find(|entry| eq_ignore_case(&entry.source_term, term))
            .map(|entry| entry.target_term.clone())
    }

    /// Substitute every known source term in `text` with its translation.
    ///
    /// Multi-word phrases are claimed before the words inside them, so a named
    /// code is translated as a unit rather than word by word.
    pub fn bulk_apply(&self, text: &str, source: Language, target: Language) -> String {
        let dictionary = self.snapshot();
        let spans = dictionary.find_spans(text, source, target);
        if spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end, entry) in &spans {
            out.push_str(&text[cursor..*start]);
            out.push_str(&entry.target_term);
            cursor = *end;
        }
        out.push_str(&text[cursor..]);
        debug!(substitutions = spans.len(), "Applied terminology");
        out
    }

    /// Entries whose source term occurs in `text`, in order of appearance.
    pub fn matching_entries(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Vec<TerminologyEntry> {
        self.snapshot()
            .find_spans(text, source, target)
            .into_iter()
            .map(|(_, _, entry)| entry.clone())
            .collect()
    }

    /// Append a new version of an entry. Earlier versions stay in the history.
    pub fn append(
        &self,
        entry: TerminologyEntry,
        origin: RuleOrigin,
    ) -> Result<u64, TerminologyError> {
        entry.validate()?;
        let mut current = self.current.write();
        let next = current.with_entry(entry, origin);
        let version = next.version();
        *current = Arc::new(next);
        Ok(version)
    }

    /// Append many entries as one snapshot swap per entry. Stops at the first invalid one.
    pub fn extend(
        &self,
        entries: impl IntoIterator<Item = TerminologyEntry>,
        origin: RuleOrigin,
    ) -> Result<u64, (usize, TerminologyError)> {
        let mut version = self.version();
        for (index, entry) in entries.into_iter().enumerate() {
            version = self.append(entry, origin).map_err(|e| (index, e))?;
        }
        Ok(version)
    }

    /// Mask every entry added by `enhancement`.
    pub fn rollback_enhancement(&self, enhancement: Uuid) -> u64 {
        let mut current = self.current.write();
        let next = current.without_enhancement(enhancement);
        let version = next.version();
        *current = Arc::new(next);
        info!(%enhancement, version, "Rolled back terminology enhancement");
        version
    }
}

impl Default for TerminologyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars().zip(b.chars()).all(|(x, y)| chars_eq_ignore_case(x, y))
}

/// End offset of `term` matched char-wise at `start`, if it matches.
fn match_at(text: &str, start: usize, term: &str) -> Option<usize> {
    let mut rest = text[start..].char_indices();
    for expected in term.chars() {
        let (_, actual) = rest.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
    }
    Some(rest.next().map_or(text.len(), |(offset, _)| start + offset))
}

fn is_word_start(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

fn is_word_end(text: &str, end: usize) -> bool {
    text[end..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::LegalDomain;

    fn en_ar(source: &str, target: &str) -> TerminologyEntry {
        TerminologyEntry::new(
            source,
            target,
            LegalDomain::Procedure,
            Language::ENGLISH,
            Language::ARABIC,
        )
    }

    fn store() -> TerminologyStore {
        let store = TerminologyStore::new();
        store
            .extend(
                vec![
                    en_ar("civil", "مدني"),
                    en_ar("code", "قانون"),
                    en_ar("civil procedure code", "قانون المسطرة المدنية"),
                    en_ar("court", "محكمة"),
                ],
                RuleOrigin::Seed,
            )
            .unwrap();
        store
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = store();
        assert_eq!(
            store.lookup("Court", Language::ENGLISH, Language::ARABIC),
            Some("محكمة".to_string())
        );
        assert_eq!(store.lookup("court", Language::ARABIC, Language::ENGLISH), None);
        assert_eq!(store.lookup("tribunal", Language::ENGLISH, Language::ARABIC), None);
    }

    // ==================== Bulk Apply Tests ====================

    #[test]
    fn test_longest_match_first() {
        let store = store();
        let out = store.bulk_apply(
            "under the Civil Procedure Code",
            Language::ENGLISH,
            Language::ARABIC,
        );
        assert_eq!(out, "under the قانون المسطرة المدنية");
    }

    #[test]
    fn test_word_level_after_phrase() {
        let store = store();
        let out = store.bulk_apply(
            "civil procedure code and civil code",
            Language::ENGLISH,
            Language::ARABIC,
        );
        assert_eq!(out, "قانون المسطرة المدنية and مدني قانون");
    }

    #[test]
    fn test_whole_word_only() {
        let store = store();
        let out = store.bulk_apply("the courthouse", Language::ENGLISH, Language::ARABIC);
        assert_eq!(out, "the courthouse");
    }

    #[test]
    fn test_matching_entries_in_order() {
        let store = store();
        let found = store.matching_entries(
            "The court applied the civil procedure code",
            Language::ENGLISH,
            Language::ARABIC,
        );
        let terms: Vec<&str> = found.iter().map(|e| e.source_term.as_str()).collect();
        assert_eq!(terms, vec!["court", "civil procedure code"]);
    }

    // ==================== Versioning Tests ====================

    #[test]
    fn test_append_keeps_history_and_latest_wins() {
        let store = store();
        let before = store.version();
        let id = Uuid::new_v4();
        store
            .append(en_ar("court", "المحكمة"), RuleOrigin::Enhancement(id))
            .unwrap();

        assert_eq!(store.version(), before + 1);
        assert_eq!(
            store.lookup("court", Language::ENGLISH, Language::ARABIC),
            Some("المحكمة".to_string())
        );
        let snapshot = store.snapshot();
        let history: Vec<&str> = snapshot
            .records()
            .iter()
            .filter(|r| r.entry.source_term == "court")
            .map(|r| r.entry.target_term.as_str())
            .collect();
        assert_eq!(history, vec!["محكمة", "المحكمة"]);

        store.rollback_enhancement(id);
        assert_eq!(
            store.lookup("court", Language::ENGLISH, Language::ARABIC),
            Some("محكمة".to_string())
        );
    }

    #[test]
    fn test_append_rejects_contaminated_target() {
        let store = store();
        let before = store.version();
        assert!(store
            .append(en_ar("appeal", "استئناف Pro"), RuleOrigin::Seed)
            .is_err());
        assert_eq!(store.version(), before);
    }

    #[test]
    fn test_snapshot_is_stable_across_append() {
        let store = store();
        let held = store.snapshot();
        store.append(en_ar("judgment", "حكم"), RuleOrigin::Seed).unwrap();
        assert!(held
            .active_entries(Language::ENGLISH, Language::ARABIC)
            .iter()
            .all(|e| e.source_term != "judgment"));
    }
}
