//! Reference datasets the terminology store is bootstrapped from.

use crate::error::DatasetError;
use crate::i18n::Language;
use crate::purity::RuleOrigin;
use crate::terminology::entry::{LegalDomain, TerminologyEntry};
use crate::terminology::store::TerminologyStore;
use std::path::PathBuf;
use tracing::info;

/// Source of seed terminology, read once at startup.
pub trait ReferenceDataset: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self) -> Result<Vec<TerminologyEntry>, DatasetError>;
}

/// English term, Arabic term, domain. Each row yields one entry per direction.
const SEED_TERMS: &[(&str, &str, LegalDomain)] = &[
    ("civil procedure code", "قانون المسطرة المدنية", LegalDomain::Procedure),
    ("code of civil procedure", "قانون المسطرة المدنية", LegalDomain::Procedure),
    ("court of appeal", "محكمة الاستئناف", LegalDomain::Procedure),
    ("court of cassation", "محكمة النقض", LegalDomain::Procedure),
    ("court of first instance", "المحكمة الابتدائية", LegalDomain::Procedure),
    ("lawsuit", "دعوى", LegalDomain::Procedure),
    ("plaintiff", "المدعي", LegalDomain::Procedure),
    ("defendant", "المدعى عليه", LegalDomain::Procedure),
    ("judgment", "حكم", LegalDomain::Procedure),
    ("appeal", "استئناف", LegalDomain::Procedure),
    ("hearing", "جلسة", LegalDomain::Procedure),
    ("family code", "مدونة الأسرة", LegalDomain::Family),
    ("marriage contract", "عقد الزواج", LegalDomain::Family),
    ("divorce", "طلاق", LegalDomain::Family),
    ("custody", "حضانة", LegalDomain::Family),
    ("alimony", "نفقة", LegalDomain::Family),
    ("inheritance", "إرث", LegalDomain::Family),
    ("breach of contract", "الإخلال بالعقد", LegalDomain::Contract),
    ("contract", "عقد", LegalDomain::Contract),
    ("obligation", "التزام", LegalDomain::Contract),
    ("damages", "تعويض", LegalDomain::Contract),
    ("criminal code", "القانون الجنائي", LegalDomain::Criminal),
    ("public prosecutor", "النيابة العامة", LegalDomain::Criminal),
    ("complaint", "شكاية", LegalDomain::Criminal),
    ("theft", "سرقة", LegalDomain::Criminal),
    ("fraud", "احتيال", LegalDomain::Criminal),
    ("labor code", "مدونة الشغل", LegalDomain::Labor),
    ("employment contract", "عقد الشغل", LegalDomain::Labor),
    ("wrongful dismissal", "الفصل التعسفي", LegalDomain::Labor),
    ("employer", "المشغل", LegalDomain::Labor),
    ("employee", "الأجير", LegalDomain::Labor),
    ("land registration", "التحفيظ العقاري", LegalDomain::Property),
    ("lease agreement", "عقد الكراء", LegalDomain::Property),
    ("real estate", "عقار", LegalDomain::Property),
    ("tenant", "المكتري", LegalDomain::Property),
    ("landlord", "المكري", LegalDomain::Property),
    ("commercial code", "مدونة التجارة", LegalDomain::Commercial),
    ("commercial court", "المحكمة التجارية", LegalDomain::Commercial),
    ("company", "شركة", LegalDomain::Commercial),
    ("bankruptcy", "إفلاس", LegalDomain::Commercial),
    ("lawyer", "محامي", LegalDomain::General),
    ("court", "محكمة", LegalDomain::General),
    ("civil", "مدني", LegalDomain::General),
    ("code", "قانون", LegalDomain::General),
    ("law", "القانون", LegalDomain::General),
];

/// The seed compiled into the binary.
pub struct BuiltinDataset;

impl ReferenceDataset for BuiltinDataset {
    fn name(&self) -> &str {
        "builtin"
    }

    fn load(&self) -> Result<Vec<TerminologyEntry>, DatasetError> {
        let mut entries = Vec::with_capacity(SEED_TERMS.len() * 2);
        let mut reverse_seen = std::collections::HashSet::new();
        for (english, arabic, domain) in SEED_TERMS {
            entries.push(TerminologyEntry::new(
                *english,
                *arabic,
                *domain,
                Language::ENGLISH,
                Language::ARABIC,
            ));
            // Two English phrasings can share one Arabic term; the first one wins
            if reverse_seen.insert(*arabic) {
                entries.push(TerminologyEntry::new(
                    *arabic,
                    *english,
                    *domain,
                    Language::ARABIC,
                    Language::ENGLISH,
                ));
            }
        }
        Ok(entries)
    }
}

/// A JSON array of [`TerminologyEntry`] objects on disk.
pub struct JsonDataset {
    path: PathBuf,
}

impl JsonDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReferenceDataset for JsonDataset {
    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("json")
    }

    fn load(&self) -> Result<Vec<TerminologyEntry>, DatasetError> {
        let raw = std::fs::read_to_string(&self.path)?;
        let entries: Vec<TerminologyEntry> = serde_json::from_str(&raw)?;
        Ok(entries)
    }
}

impl TerminologyStore {
    /// Build a store seeded from `dataset`.
    pub fn bootstrap(dataset: &dyn ReferenceDataset) -> Result<Self, DatasetError> {
        let entries = dataset.load()?;
        let count = entries.len();
        let store = TerminologyStore::new();
        store
            .extend(entries, RuleOrigin::Seed)
            .map_err(|(index, e)| DatasetError::InvalidEntry {
                index,
                reason: e.to_string(),
            })?;
        info!(dataset = dataset.name(), entries = count, "Loaded terminology");
        Ok(store)
    }
}
