//! Legal-domain intent classification over keyword signatures.

use crate::i18n::{Language, Script};
use crate::terminology::{LegalDomain, TerminologyEntry};

/// Below this score the text is treated as general legal content.
pub const MIN_INTENT_SCORE: f64 = 2.0;

/// Score at which classification confidence saturates.
const FULL_CONFIDENCE_SCORE: f64 = 6.0;

/// Weight a terminology hit adds to its entry's domain.
const TERMINOLOGY_WEIGHT: f64 = 1.5;

/// Keyword or phrase with its weight. Multi-word phrases weigh more.
type Signature = (&'static str, f64);

struct IntentSignatures {
    domain: LegalDomain,
    english: &'static [Signature],
    arabic: &'static [Signature],
}

const SIGNATURES: &[IntentSignatures] = &[
    IntentSignatures {
        domain: LegalDomain::Family,
        english: &[
            ("family code", 3.0),
            ("child support", 3.0),
            ("divorce", 2.0),
            ("custody", 2.0),
            ("alimony", 2.0),
            ("marriage", 2.0),
            ("inheritance", 2.0),
            ("guardianship", 2.0),
            ("spouse", 1.5),
            ("maintenance", 1.0),
            ("husband", 1.0),
            ("wife", 1.0),
        ],
        arabic: &[
            ("مدونة الأسرة", 3.0),
            ("طلاق", 2.0),
            ("حضانة", 2.0),
            ("نفقة", 2.0),
            ("زواج", 2.0),
            ("ميراث", 2.0),
            ("إرث", 2.0),
            ("الزوج", 1.5),
            ("الأسرة", 1.0),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Contract,
        english: &[
            ("breach of contract", 3.0),
            ("breach", 2.0),
            ("contract", 1.5),
            ("obligation", 1.5),
            ("damages", 1.5),
            ("agreement", 1.0),
            ("clause", 1.0),
            ("termination", 1.0),
        ],
        arabic: &[
            ("الإخلال", 2.0),
            ("فسخ", 2.0),
            ("التزام", 1.5),
            ("عقد", 1.0),
            ("بند", 1.0),
            ("تعويض", 1.0),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Procedure,
        english: &[
            ("civil procedure", 3.0),
            ("lawsuit", 2.0),
            ("appeal", 2.0),
            ("plaintiff", 2.0),
            ("summons", 2.0),
            ("hearing", 1.5),
            ("defendant", 1.5),
            ("judgment", 1.5),
            ("court", 1.0),
            ("jurisdiction", 1.0),
        ],
        arabic: &[
            ("المسطرة", 3.0),
            ("دعوى", 2.0),
            ("استئناف", 2.0),
            ("المدعي", 2.0),
            ("تبليغ", 2.0),
            ("جلسة", 1.5),
            ("الحكم", 1.5),
            ("محكمة", 1.0),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Criminal,
        english: &[
            ("public prosecutor", 3.0),
            ("criminal", 2.0),
            ("offence", 2.0),
            ("offense", 2.0),
            ("prosecutor", 2.0),
            ("theft", 2.0),
            ("fraud", 2.0),
            ("arrest", 2.0),
            ("crime", 2.0),
            ("police", 1.5),
            ("penalty", 1.0),
        ],
        arabic: &[
            ("النيابة العامة", 3.0),
            ("جنائي", 2.0),
            ("جريمة", 2.0),
            ("سرقة", 2.0),
            ("احتيال", 2.0),
            ("اعتقال", 2.0),
            ("عقوبة", 1.5),
            ("شكاية", 1.5),
            ("الشرطة", 1.5),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Labor,
        english: &[
            ("labor code", 3.0),
            ("working hours", 2.0),
            ("employer", 2.0),
            ("employee", 2.0),
            ("employment", 2.0),
            ("dismissal", 2.0),
            ("severance", 2.0),
            ("labour", 2.0),
            ("salary", 1.5),
            ("wage", 1.5),
        ],
        arabic: &[
            ("مدونة الشغل", 3.0),
            ("الفصل التعسفي", 3.0),
            ("المشغل", 2.0),
            ("الأجير", 2.0),
            ("الشغل", 2.0),
            ("الأجر", 1.5),
            ("العمال", 1.5),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Property,
        english: &[
            ("real estate", 3.0),
            ("title deed", 3.0),
            ("tenant", 2.0),
            ("landlord", 2.0),
            ("lease", 2.0),
            ("mortgage", 2.0),
            ("property", 1.5),
            ("land", 1.5),
            ("rent", 1.5),
            ("ownership", 1.5),
        ],
        arabic: &[
            ("التحفيظ", 3.0),
            ("عقار", 2.0),
            ("الكراء", 2.0),
            ("المكتري", 2.0),
            ("المكري", 2.0),
            ("رهن", 1.5),
            ("ملكية", 1.5),
            ("أرض", 1.5),
        ],
    },
    IntentSignatures {
        domain: LegalDomain::Commercial,
        english: &[
            ("commercial court", 3.0),
            ("bankruptcy", 2.5),
            ("commercial", 2.0),
            ("trader", 2.0),
            ("shareholder", 2.0),
            ("cheque", 2.0),
            ("company", 1.5),
            ("invoice", 1.5),
            ("business", 1.0),
        ],
        arabic: &[
            ("مدونة التجارة", 3.0),
            ("إفلاس", 2.5),
            ("تجاري", 2.0),
            ("التاجر", 2.0),
            ("المساهم", 2.0),
            ("شيك", 2.0),
            ("شركة", 1.5),
            ("فاتورة", 1.5),
        ],
    },
];

/// Winning intent of a classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentMatch {
    pub domain: LegalDomain,
    pub score: f64,
    /// 0.0 for the general fallback intent, 1.0 for a domain hint
    pub confidence: f64,
}

impl IntentMatch {
    fn general() -> Self {
        Self {
            domain: LegalDomain::General,
            score: 0.0,
            confidence: 0.0,
        }
    }

    pub fn from_hint(domain: LegalDomain) -> Self {
        Self {
            domain,
            score: f64::INFINITY,
            confidence: 1.0,
        }
    }
}

/// Score of every domain for `text` written in `language`.
pub fn score_domains(
    text: &str,
    language: Language,
    terminology_hits: &[TerminologyEntry],
) -> Vec<(LegalDomain, f64)> {
    let lowered = text.to_lowercase();
    let word_prefix = language.script() == Script::Latin;

    let mut scores: Vec<(LegalDomain, f64)> = SIGNATURES
        .iter()
        .map(|intent| {
            let signatures = if language == Language::ARABIC {
                intent.arabic
            } else {
                intent.english
            };
            let score: f64 = signatures
                .iter()
                .filter(|(keyword, _)| contains_keyword(&lowered, keyword, word_prefix))
                .map(|(_, weight)| weight)
                .sum();
            (intent.domain, score)
        })
        .collect();

    for entry in terminology_hits {
        if let Some((_, score)) = scores.iter_mut().find(|(d, _)| *d == entry.domain) {
            *score += TERMINOLOGY_WEIGHT;
        }
    }
    scores
}

/// Classify `text` into a legal domain.
///
/// The first domain with the highest score wins if it reaches
/// [`MIN_INTENT_SCORE`]; otherwise the general intent is returned.
pub fn classify(text: &str, language: Language, terminology_hits: &[TerminologyEntry]) -> IntentMatch {
    let mut best: Option<(LegalDomain, f64)> = None;
    for (domain, score) in score_domains(text, language, terminology_hits) {
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((domain, score));
        }
    }

    match best {
        Some((domain, score)) if score >= MIN_INTENT_SCORE => IntentMatch {
            domain,
            score,
            confidence: (score / FULL_CONFIDENCE_SCORE).min(1.0),
        },
        _ => IntentMatch::general(),
    }
}

/// Latin keywords must start a word (stems may continue it); Arabic keywords
/// match anywhere since articles and prepositions attach to the word.
fn contains_keyword(text: &str, keyword: &str, word_prefix: bool) -> bool {
    if !word_prefix {
        return text.contains(keyword);
    }
    text.match_indices(keyword).any(|(start, _)| {
        text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Keyword Matching Tests ====================

    #[test]
    fn test_latin_keywords_match_at_word_start() {
        assert!(contains_keyword("the rental agreement", "rent", true));
        assert!(!contains_keyword("the parent company", "rent", true));
    }

    #[test]
    fn test_arabic_keywords_match_with_clitics() {
        assert!(contains_keyword("وبالطلاق", "طلاق", false));
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_family_english() {
        let intent = classify(
            "My husband filed for divorce and wants custody of our children",
            Language::ENGLISH,
            &[],
        );
        assert_eq!(intent.domain, LegalDomain::Family);
        assert!(intent.confidence > 0.5);
    }

    #[test]
    fn test_classify_labor_arabic() {
        let intent = classify("قام المشغل بطرد الأجير دون سبب", Language::ARABIC, &[]);
        assert_eq!(intent.domain, LegalDomain::Labor);
    }

    #[test]
    fn test_classify_below_minimum_is_general() {
        let intent = classify("Please review the attached clause", Language::ENGLISH, &[]);
        assert_eq!(intent, IntentMatch::general());
    }

    #[test]
    fn test_terminology_hits_add_score() {
        let hit = TerminologyEntry::new(
            "hearing",
            "جلسة",
            LegalDomain::Procedure,
            Language::ENGLISH,
            Language::ARABIC,
        );
        // "hearing" alone scores 1.5; the terminology hit lifts it over the minimum
        assert_eq!(
            classify("the hearing", Language::ENGLISH, &[]).domain,
            LegalDomain::General
        );
        assert_eq!(
            classify("the hearing", Language::ENGLISH, &[hit]).domain,
            LegalDomain::Procedure
        );
    }

    #[test]
    fn test_confidence_saturates() {
        let intent = classify(
            "divorce custody alimony marriage inheritance under the family code",
            Language::ENGLISH,
            &[],
        );
        assert_eq!(intent.confidence, 1.0);
    }

    #[test]
    fn test_every_domain_but_general_has_signatures() {
        for domain in LegalDomain::ALL {
            let present = SIGNATURES.iter().any(|s| s.domain == domain);
            assert_eq!(present, domain != LegalDomain::General);
        }
    }
}
