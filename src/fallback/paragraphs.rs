//! Hand-curated fallback paragraphs.
//!
//! Every paragraph is written purely in its language's script: English
//! paragraphs use only Latin letters and ASCII punctuation, Arabic paragraphs
//! only Arabic letters, the Arabic comma and the full stop. They must never
//! contain interface vocabulary or version markers.

use crate::i18n::Language;
use crate::terminology::LegalDomain;

/// The two renditions of one domain's paragraph.
#[derive(Debug, Clone, Copy)]
pub struct DomainParagraphs {
    pub domain: LegalDomain,
    pub english: &'static str,
    pub arabic: &'static str,
}

impl DomainParagraphs {
    pub fn for_language(&self, language: Language) -> &'static str {
        if language == Language::ARABIC {
            self.arabic
        } else {
            self.english
        }
    }
}

pub const PARAGRAPHS: &[DomainParagraphs] = &[
    // ==================== Family ====================
    DomainParagraphs {
        domain: LegalDomain::Family,
        english: "This matter falls under family law. Questions of marriage, divorce, custody and \
maintenance are governed by the applicable family code and are decided by the competent family \
court. The parties are advised to gather the relevant civil status records and to consult a \
qualified lawyer before taking any formal step, since time limits may apply to certain claims.",
        arabic: "تندرج هذه المسألة ضمن قانون الأسرة. وتخضع قضايا الزواج والطلاق والحضانة والنفقة \
لأحكام مدونة الأسرة المعمول بها، وتبت فيها محكمة الأسرة المختصة. وينصح الأطراف بجمع وثائق الحالة \
المدنية ذات الصلة واستشارة محام مؤهل قبل اتخاذ أي إجراء رسمي، إذ قد تسري آجال محددة على بعض الطلبات.",
    },
    // ==================== Contract ====================
    DomainParagraphs {
        domain: LegalDomain::Contract,
        english: "This matter concerns contractual obligations. A valid contract binds the parties \
to perform what they agreed, and a failure to perform may give rise to a claim for performance, \
termination or damages. The terms of the written agreement, the conduct of the parties and the \
applicable civil law together determine the remedies that are available.",
        arabic: "تتعلق هذه المسألة بالالتزامات التعاقدية. فالعقد الصحيح يلزم أطرافه بتنفيذ ما اتفقوا \
عليه، وقد يترتب على الإخلال بالتنفيذ حق المطالبة بالتنفيذ أو الفسخ أو التعويض. وتحدد بنود العقد \
المكتوب وسلوك الأطراف والقانون المدني المطبق مجتمعة سبل الانتصاف المتاحة.",
    },
    // ==================== Procedure ====================
    DomainParagraphs {
        domain: LegalDomain::Procedure,
        english: "This matter concerns civil procedure. A claim is brought before the competent \
court by a written statement that identifies the parties, the facts and the relief sought. \
Procedural time limits are strict, and a judgment may be challenged on appeal within the period \
fixed by law. Legal representation is recommended at every stage of the proceedings.",
        arabic: "تتعلق هذه المسألة بالمسطرة المدنية. ترفع الدعوى أمام المحكمة المختصة بمقال مكتوب \
يحدد الأطراف والوقائع والطلبات. والآجال المسطرية صارمة، ويجوز الطعن في الحكم بالاستئناف داخل الأجل \
الذي يحدده القانون. ويوصى بالاستعانة بمحام في جميع مراحل الدعوى.",
    },
    // ==================== Criminal ====================
    DomainParagraphs {
        domain: LegalDomain::Criminal,
        english: "This matter falls under criminal law. Offences are defined by the criminal code, \
and prosecution is conducted by the public prosecutor on the basis of a complaint or an official \
report. Every accused person is presumed innocent until proven guilty and has the right to be \
assisted by a lawyer throughout the investigation and the trial.",
        arabic: "تندرج هذه المسألة ضمن القانون الجنائي. تحدد الجرائم بمقتضى القانون الجنائي، وتتولى \
النيابة العامة إقامة الدعوى العمومية بناء على شكاية أو محضر رسمي. وكل متهم بريء إلى أن تثبت \
إدانته، وله الحق في مؤازرة محام طوال مراحل البحث والمحاكمة.",
    },
    // ==================== Labor ====================
    DomainParagraphs {
        domain: LegalDomain::Labor,
        english: "This matter concerns employment law. The relationship between employer and \
employee is governed by the employment contract and the labor code, which set rules on wages, \
working hours, leave and dismissal. A dismissal without valid cause may entitle the employee to \
compensation, and disputes are usually heard by the social chamber of the competent court.",
        arabic: "تتعلق هذه المسألة بقانون الشغل. تخضع العلاقة بين المشغل والأجير لعقد الشغل ومدونة \
الشغل، اللذين ينظمان الأجور ومدة العمل والعطل والفصل. وقد يخول الفصل دون سبب مقبول للأجير الحق في \
التعويض، وتنظر في النزاعات عادة الغرفة الاجتماعية بالمحكمة المختصة.",
    },
    // ==================== Property ====================
    DomainParagraphs {
        domain: LegalDomain::Property,
        english: "This matter concerns property law. Ownership of real estate is established by \
registration in the land register, and rights such as leases, easements and mortgages must be \
recorded to be enforceable against third parties. The obligations of a landlord and a tenant are \
determined by the lease agreement and by the rules of the applicable property law.",
        arabic: "تتعلق هذه المسألة بالقانون العقاري. تثبت ملكية العقار بالتقييد في السجل العقاري، \
ويجب تقييد الحقوق كالكراء والارتفاقات والرهون لكي يحتج بها في مواجهة الغير. وتحدد التزامات المكري \
والمكتري بمقتضى عقد الكراء وقواعد القانون العقاري المطبق.",
    },
    // ==================== Commercial ====================
    DomainParagraphs {
        domain: LegalDomain::Commercial,
        english: "This matter concerns commercial law. Traders and companies are subject to the \
commercial code, which governs commercial registration, bookkeeping, negotiable instruments and the \
treatment of businesses in difficulty. Disputes between traders fall within the jurisdiction of \
the commercial court, and the articles of association of a company define the powers of its \
managers.",
        arabic: "تتعلق هذه المسألة بالقانون التجاري. يخضع التجار والشركات لمدونة التجارة التي تنظم \
السجل التجاري ومسك المحاسبة والأوراق التجارية ومعالجة صعوبات المقاولة. وتختص المحكمة التجارية \
بالنزاعات بين التجار، ويحدد النظام الأساسي للشركة صلاحيات مسيريها.",
    },
    // ==================== General ====================
    DomainParagraphs {
        domain: LegalDomain::General,
        english: "This text concerns a legal question. The applicable rules depend on the facts of \
the case, the documents available and the jurisdiction concerned. This summary is provided for \
general information only and does not replace the advice of a qualified lawyer, who can assess \
the specific circumstances and explain the rights and obligations of each party.",
        arabic: "يتعلق هذا النص بمسألة قانونية. وتتوقف القواعد الواجبة التطبيق على وقائع القضية \
والوثائق المتوفرة والجهة القضائية المعنية. ويقدم هذا الملخص على سبيل الإعلام العام فقط، ولا يغني عن \
استشارة محام مؤهل يمكنه تقدير الظروف الخاصة وبيان حقوق والتزامات كل طرف.",
    },
];

/// Paragraph for `domain` in `language`. Every domain has one.
pub fn paragraph_for(domain: LegalDomain, language: Language) -> &'static str {
    PARAGRAPHS
        .iter()
        .find(|p| p.domain == domain)
        .unwrap_or(&PARAGRAPHS[PARAGRAPHS.len() - 1])
        .for_language(language)
}
