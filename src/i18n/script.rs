//! Script classification for purity scoring.
//!
//! Every character of a candidate string falls into one of four classes:
//! whitespace, neutral (digits and punctuation shared by both scripts),
//! a letter of a known script, or "other" (emoji, symbols, control and
//! format characters). The detector and the validator agree on this
//! classification, so a string the detector considers clean always scores
//! a target share of 1.0.

use serde::{Deserialize, Serialize};

/// Writing systems the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Latin,
    Arabic,
    Cyrillic,
    Greek,
    Hebrew,
    Cjk,
}

/// Classification of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Whitespace,
    /// Digits and punctuation: allowed in any target script
    Neutral,
    Letter(Script),
    /// Anything visible that is neither neutral nor a letter of a known script
    Other,
}

/// Punctuation outside ASCII that both scripts legitimately use.
const SHARED_PUNCTUATION: &[char] = &[
    '،', '؛', '؟', '٪', '٫', '٬', '«', '»', '‘', '’', '“', '”', '–', '—', '…', '•', '·', '§',
    '¶', '°', '€', '£', '¢', '¥',
];

/// Classify a character.
pub fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        return CharClass::Whitespace;
    }
    if c.is_numeric() || c.is_ascii_punctuation() || SHARED_PUNCTUATION.contains(&c) {
        return CharClass::Neutral;
    }
    match script_of(c) {
        Some(script) => CharClass::Letter(script),
        None => CharClass::Other,
    }
}

/// Script of a letter, if it belongs to one we know about.
pub fn script_of(c: char) -> Option<Script> {
    let cp = c as u32;
    match cp {
        0x0041..=0x005A | 0x0061..=0x007A => Some(Script::Latin),
        // Latin-1 supplement and extended blocks, minus × and ÷
        0x00C0..=0x024F if cp != 0x00D7 && cp != 0x00F7 => Some(Script::Latin),
        // Combining diacritics attach to the preceding Latin letter
        0x0300..=0x036F => Some(Script::Latin),
        0x1E00..=0x1EFF => Some(Script::Latin),
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Some(Script::Greek),
        0x0400..=0x052F => Some(Script::Cyrillic),
        0x0590..=0x05FF => Some(Script::Hebrew),
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => Some(Script::Arabic),
        // Presentation forms; U+FEFF is the byte-order mark, not a letter
        0xFB50..=0xFDFF | 0xFE70..=0xFEFC => Some(Script::Arabic),
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xAC00..=0xD7AF => {
            Some(Script::Cjk)
        }
        _ => None,
    }
}

/// Per-class character counts over the visible (non-whitespace) part of a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    pub target_letters: usize,
    pub neutral: usize,
    pub foreign_letters: usize,
    pub other: usize,
}

impl ScriptCounts {
    /// Count the characters of `text` relative to `target`.
    pub fn tally(text: &str, target: Script) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            match classify(c) {
                CharClass::Whitespace => {}
                CharClass::Neutral => counts.neutral += 1,
                CharClass::Letter(s) if s == target => counts.target_letters += 1,
                CharClass::Letter(_) => counts.foreign_letters += 1,
                CharClass::Other => counts.other += 1,
            }
        }
        counts
    }

    pub fn visible(&self) -> usize {
        self.target_letters + self.neutral + self.foreign_letters + self.other
    }
}

/// The script with the most letters in `text`, if any letters are present.
pub fn dominant_script(text: &str) -> Option<Script> {
    let mut latin = 0usize;
    let mut arabic = 0usize;
    let mut rest: Vec<(Script, usize)> = Vec::new();
    for c in text.chars() {
        match script_of(c) {
            Some(Script::Latin) => latin += 1,
            Some(Script::Arabic) => arabic += 1,
            Some(other) => match rest.iter_mut().find(|(s, _)| *s == other) {
                Some((_, n)) => *n += 1,
                None => rest.push((other, 1)),
            },
            None => {}
        }
    }
    let mut best: Option<(Script, usize)> = None;
    for candidate in [(Script::Latin, latin), (Script::Arabic, arabic)]
        .into_iter()
        .chain(rest)
    {
        if candidate.1 > best.map(|(_, n)| n).unwrap_or(0) {
            best = Some(candidate);
        }
    }
    best.map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== classify Tests ====================

    #[test]
    fn test_classify_ascii_letters_are_latin() {
        assert_eq!(classify('a'), CharClass::Letter(Script::Latin));
        assert_eq!(classify('Z'), CharClass::Letter(Script::Latin));
        assert_eq!(classify('é'), CharClass::Letter(Script::Latin));
    }

    #[test]
    fn test_classify_arabic_letters() {
        assert_eq!(classify('م'), CharClass::Letter(Script::Arabic));
        assert_eq!(classify('ي'), CharClass::Letter(Script::Arabic));
    }

    #[test]
    fn test_classify_arabic_punctuation_and_digits_are_neutral() {
        assert_eq!(classify('،'), CharClass::Neutral);
        assert_eq!(classify('؟'), CharClass::Neutral);
        assert_eq!(classify('٣'), CharClass::Neutral);
        assert_eq!(classify('7'), CharClass::Neutral);
        assert_eq!(classify('.'), CharClass::Neutral);
    }

    #[test]
    fn test_classify_cyrillic() {
        assert_eq!(classify('д'), CharClass::Letter(Script::Cyrillic));
    }

    #[test]
    fn test_classify_whitespace() {
        assert_eq!(classify(' '), CharClass::Whitespace);
        assert_eq!(classify('\n'), CharClass::Whitespace);
        assert_eq!(classify('\t'), CharClass::Whitespace);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify('😀'), CharClass::Other);
        assert_eq!(classify('©'), CharClass::Other);
        assert_eq!(classify('\u{FEFF}'), CharClass::Other);
        assert_eq!(classify('×'), CharClass::Other);
    }

    // ==================== ScriptCounts Tests ====================

    #[test]
    fn test_tally_mixed_text() {
        let counts = ScriptCounts::tally("ab محامي 12!", Script::Latin);
        assert_eq!(counts.target_letters, 2);
        assert_eq!(counts.foreign_letters, 5);
        assert_eq!(counts.neutral, 3);
        assert_eq!(counts.other, 0);
        assert_eq!(counts.visible(), 10);
    }

    #[test]
    fn test_tally_ignores_whitespace() {
        let counts = ScriptCounts::tally("  \n\t ", Script::Arabic);
        assert_eq!(counts.visible(), 0);
    }

    // ==================== dominant_script Tests ====================

    #[test]
    fn test_dominant_script_latin() {
        assert_eq!(dominant_script("The court ruled"), Some(Script::Latin));
    }

    #[test]
    fn test_dominant_script_arabic_with_noise() {
        assert_eq!(dominant_script("حكمت المحكمة Pro"), Some(Script::Arabic));
    }

    #[test]
    fn test_dominant_script_none_for_digits() {
        assert_eq!(dominant_script("123 456"), None);
    }
}
