//! Versioned rule sets for contamination detection.
//!
//! A [`RuleSet`] is an immutable snapshot of the four rule families. Rules are
//! only ever appended; rolling an enhancement back produces a new snapshot that
//! masks the enhancement's rules instead of deleting them. Detection against a
//! snapshot is a pure function of `(rules, text, target)`.

use crate::i18n::{classify, CharClass, Language, LanguageRegistry};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use uuid::Uuid;

/// What kind of contamination a finding represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    /// Button labels, version markers, product and system names
    UiArtifact,
    /// A run of characters outside the target script with no target letters around it
    ForeignScript,
    /// A function word of the other language
    ForeignFragment,
    /// Foreign characters glued to target-script letters inside one token
    MixedScriptToken,
    /// Mojibake and leaked escape sequences
    EncodingCorruption,
}

impl PatternKind {
    /// Overlap resolution priority: higher wins.
    fn priority(self) -> u8 {
        match self {
            PatternKind::EncodingCorruption => 5,
            PatternKind::UiArtifact => 4,
            PatternKind::ForeignFragment => 3,
            PatternKind::MixedScriptToken => 2,
            PatternKind::ForeignScript => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Confidence lost by a cleaning pass for each removed pattern of this severity.
    pub fn confidence_penalty(self) -> f64 {
        match self {
            Severity::Low => 0.02,
            Severity::Medium => 0.05,
            Severity::High => 0.10,
            Severity::Critical => 0.20,
        }
    }
}

/// A positioned finding. `position` and `length` are byte offsets into the
/// scanned string and always fall on char boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblematicPattern {
    pub pattern: String,
    pub kind: PatternKind,
    pub position: usize,
    pub length: usize,
    pub severity: Severity,
}

impl ProblematicPattern {
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    fn overlaps(&self, other: &ProblematicPattern) -> bool {
        self.position < other.end() && other.position < self.end()
    }
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RuleOrigin {
    Builtin,
    Seed,
    Enhancement(Uuid),
}

impl RuleOrigin {
    fn enhancement(&self) -> Option<Uuid> {
        match self {
            RuleOrigin::Enhancement(id) => Some(*id),
            _ => None,
        }
    }
}

/// A literal matched verbatim against the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralRule {
    pub literal: String,
    pub severity: Severity,
    pub origin: RuleOrigin,
}

impl LiteralRule {
    fn builtin(literal: &str, severity: Severity) -> Self {
        Self {
            literal: literal.to_string(),
            severity,
            origin: RuleOrigin::Builtin,
        }
    }
}

/// A single addition to one rule family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleChange {
    AddUiArtifact { token: String, severity: Severity },
    AddCorruptionSequence { sequence: String },
    AddFunctionWord { language: Language, word: String },
}

/// Button labels, product and system names that must never reach output.
const BUILTIN_UI_ARTIFACTS: &[(&str, Severity)] = &[
    ("ChatGPT", Severity::Critical),
    ("OpenAI", Severity::Critical),
    ("GPT-4", Severity::Critical),
    ("GPT-4o", Severity::Critical),
    ("Claude", Severity::Critical),
    ("Gemini", Severity::Critical),
    ("Google Translate", Severity::Critical),
    ("DeepL", Severity::Critical),
    ("AUTO-TRANSLATE", Severity::High),
    ("Copy to clipboard", Severity::High),
    ("Regenerate response", Severity::High),
    ("Regenerate", Severity::High),
    ("Click here", Severity::High),
    ("Read more", Severity::High),
    ("Show more", Severity::High),
    ("Show less", Severity::High),
    ("Sign in", Severity::High),
    ("Log in", Severity::High),
    ("Upgrade to Pro", Severity::High),
    ("Pro", Severity::High),
    ("Premium", Severity::High),
    ("Beta", Severity::High),
    ("Translate this page", Severity::High),
    ("[object Object]", Severity::High),
    ("NaN", Severity::High),
    ("Lorem ipsum", Severity::High),
    ("ترجمة تلقائية", Severity::High),
    ("إعادة التوليد", Severity::High),
];

/// Mojibake and escape sequences left behind by broken encodings.
const BUILTIN_CORRUPTION: &[&str] = &[
    "\u{FFFD}", "\u{FEFF}", "Ã©", "Ã¨", "Ã¢", "Ã§", "Ã´", "Ã¯", "Ã«", "â€", "Ø§", "Ù„", "Ø¹",
    "Ù…", "&amp;", "&quot;", "&#39;", "&nbsp;",
];

static VERSION_MARKER: OnceLock<Regex> = OnceLock::new();

fn version_marker() -> &'static Regex {
    VERSION_MARKER.get_or_init(|| {
        Regex::new(r"\b[vV]\d+(?:\.\d+){0,2}\b").expect("version marker regex")
    })
}

/// Immutable, versioned snapshot of every detection rule.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: u64,
    ui_artifacts: Vec<LiteralRule>,
    corruption: Vec<LiteralRule>,
    function_words: Vec<(Language, LiteralRule)>,
    rolled_back: HashSet<Uuid>,
}

impl RuleSet {
    /// Version 1: the built-in rules plus every registry language's function words.
    pub fn builtin() -> Self {
        let function_words = LanguageRegistry::get()
            .list_enabled()
            .into_iter()
            .filter_map(|config| {
                Language::from_code(config.code)
                    .ok()
                    .map(|language| (language, config.function_words))
            })
            .flat_map(|(language, words)| {
                words
                    .iter()
                    .map(move |word| (language, LiteralRule::builtin(word, Severity::Medium)))
            })
            .collect();

        Self {
            version: 1,
            ui_artifacts: BUILTIN_UI_ARTIFACTS
                .iter()
                .map(|(token, severity)| LiteralRule::builtin(token, *severity))
                .collect(),
            corruption: BUILTIN_CORRUPTION
                .iter()
                .map(|seq| LiteralRule::builtin(seq, Severity::Critical))
                .collect(),
            function_words,
            rolled_back: HashSet::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn is_active(&self, rule: &LiteralRule) -> bool {
        rule.origin
            .enhancement()
            .map_or(true, |id| !self.rolled_back.contains(&id))
    }

    /// Active interface-artifact rules.
    pub fn ui_artifacts(&self) -> impl Iterator<Item = &LiteralRule> {
        self.ui_artifacts.iter().filter(|r| self.is_active(r))
    }

    /// Active encoding-corruption rules.
    pub fn corruption_sequences(&self) -> impl Iterator<Item = &LiteralRule> {
        self.corruption.iter().filter(|r| self.is_active(r))
    }

    /// Active function words that count as contamination when `target` is the output language.
    pub fn function_words_against(&self, target: Language) -> impl Iterator<Item = &LiteralRule> {
        self.function_words
            .iter()
            .filter(move |(lang, rule)| *lang != target && self.is_active(rule))
            .map(|(_, rule)| rule)
    }

    pub fn has_ui_artifact(&self, token: &str) -> bool {
        self.ui_artifacts().any(|r| r.literal == token)
    }

    pub fn has_corruption_sequence(&self, sequence: &str) -> bool {
        self.corruption_sequences().any(|r| r.literal == sequence)
    }

    pub fn has_function_word(&self, language: Language, word: &str) -> bool {
        self.function_words
            .iter()
            .any(|(lang, r)| *lang == language && self.is_active(r) && eq_ignore_case(&r.literal, word))
    }

    /// Whether the change would add nothing new.
    pub fn already_covers(&self, change: &RuleChange) -> bool {
        match change {
            RuleChange::AddUiArtifact { token, .. } => self.has_ui_artifact(token),
            RuleChange::AddCorruptionSequence { sequence } => self.has_corruption_sequence(sequence),
            RuleChange::AddFunctionWord { language, word } => self.has_function_word(*language, word),
        }
    }

    /// Next snapshot with `change` appended.
    pub fn with_change(&self, change: &RuleChange, origin: RuleOrigin) -> RuleSet {
        let mut next = self.clone();
        next.version += 1;
        match change {
            RuleChange::AddUiArtifact { token, severity } => next.ui_artifacts.push(LiteralRule {
                literal: token.clone(),
                severity: *severity,
                origin,
            }),
            RuleChange::AddCorruptionSequence { sequence } => next.corruption.push(LiteralRule {
                literal: sequence.clone(),
                severity: Severity::Critical,
                origin,
            }),
            RuleChange::AddFunctionWord { language, word } => next.function_words.push((
                *language,
                LiteralRule {
                    literal: word.clone(),
                    severity: Severity::Medium,
                    origin,
                },
            )),
        }
        next
    }

    /// Next snapshot with every rule added by `enhancement` masked out.
    pub fn without_enhancement(&self, enhancement: Uuid) -> RuleSet {
        let mut next = self.clone();
        next.version += 1;
        next.rolled_back.insert(enhancement);
        next
    }

    /// Scan `text` for contamination relative to `target`.
    ///
    /// Findings never overlap and are sorted by position.
    pub fn detect(&self, text: &str, target: Language) -> Vec<ProblematicPattern> {
        let mut candidates = Vec::new();

        for rule in self.corruption_sequences() {
            scan_literal(text, rule, PatternKind::EncodingCorruption, false, &mut candidates);
        }
        for rule in self.ui_artifacts() {
            scan_literal(text, rule, PatternKind::UiArtifact, true, &mut candidates);
        }
        for m in version_marker().find_iter(text) {
            candidates.push(ProblematicPattern {
                pattern: m.as_str().to_string(),
                kind: PatternKind::UiArtifact,
                position: m.start(),
                length: m.len(),
                severity: Severity::Medium,
            });
        }
        self.scan_scripts(text, target, &mut candidates);

        resolve_overlaps(candidates)
    }

    fn scan_scripts(&self, text: &str, target: Language, out: &mut Vec<ProblematicPattern>) {
        let target_script = target.script();
        let fragments: Vec<&LiteralRule> = self.function_words_against(target).collect();

        for (token_start, token) in tokens(text) {
            let mut has_target = false;
            let mut runs: Vec<(usize, usize)> = Vec::new();
            let mut current: Option<(usize, usize)> = None;

            for (i, c) in token.char_indices() {
                match classify(c) {
                    CharClass::Letter(script) if script == target_script => {
                        has_target = true;
                        if let Some(run) = current.take() {
                            runs.push(run);
                        }
                    }
                    CharClass::Letter(_) | CharClass::Other => {
                        let end = i + c.len_utf8();
                        current = Some(match current {
                            Some((start, _)) => (start, end),
                            None => (i, end),
                        });
                    }
                    // Neutral characters neither open nor close a foreign run
                    CharClass::Neutral | CharClass::Whitespace => {}
                }
            }
            if let Some(run) = current {
                runs.push(run);
            }

            for (start, end) in runs {
                let fragment = &token[start..end];
                let (kind, severity) =
                    match fragments.iter().find(|r| eq_ignore_case(&r.literal, fragment)) {
                        Some(rule) => (PatternKind::ForeignFragment, rule.severity),
                        None if has_target => (PatternKind::MixedScriptToken, Severity::Medium),
                        None if fragment
                            .chars()
                            .any(|c| matches!(classify(c), CharClass::Letter(_))) =>
                        {
                            (PatternKind::ForeignScript, Severity::High)
                        }
                        None => (PatternKind::ForeignScript, Severity::Low),
                    };
                out.push(ProblematicPattern {
                    pattern: fragment.to_string(),
                    kind,
                    position: token_start + start,
                    length: end - start,
                    severity,
                });
            }
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Whitespace-delimited tokens with their byte offsets.
fn tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut start: Option<usize> = None;
    let mut spans = Vec::new();
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..]));
    }
    spans.into_iter()
}

fn scan_literal(
    text: &str,
    rule: &LiteralRule,
    kind: PatternKind,
    whole_word: bool,
    out: &mut Vec<ProblematicPattern>,
) {
    if rule.literal.is_empty() {
        return;
    }
    for (position, matched) in text.match_indices(rule.literal.as_str()) {
        let end = position + matched.len();
        if whole_word && !is_word_bounded(text, position, end) {
            continue;
        }
        out.push(ProblematicPattern {
            pattern: matched.to_string(),
            kind,
            position,
            length: matched.len(),
            severity: rule.severity,
        });
    }
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.map_or(true, |c| !c.is_alphanumeric()) && after.map_or(true, |c| !c.is_alphanumeric())
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn resolve_overlaps(mut candidates: Vec<ProblematicPattern>) -> Vec<ProblematicPattern> {
    candidates.sort_by(|a, b| {
        b.kind
            .priority()
            .cmp(&a.kind.priority())
            .then(b.length.cmp(&a.length))
            .then(a.position.cmp(&b.position))
    });

    let mut accepted: Vec<ProblematicPattern> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if accepted.iter().all(|kept| !kept.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }
    accepted.sort_by_key(|p| p.position);
    accepted
}
