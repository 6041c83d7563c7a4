// ABOUTME: Deterministic rule-based IntentClassifier built from regex lexicons of symptoms, medications and cues.
// ABOUTME: Splits an utterance into clauses so one sentence can yield several independent intents.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::{ClassifierError, IntentClassifier};
use crate::extract;
use crate::intent::{Intent, MedicationFields, PatternFields, SummaryFields, SymptomFields};

static CLAUSE_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[;!?]|\.(?:\s+|$)|,\s*|\s+(?:and|but|also|then|plus)\s+").expect("static regex")
});

static SUMMARY_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:summary|summari[sz]e|overview)\b|\b(?:a|the|my|health|full|doctor'?s?)\s+report\b|\breport\s+for\b|\b(?:for|to|show|tell)\s+(?:my\s+)?(?:doctor|physician|gp)\b|\bdoctor'?s?\s+(?:visit|appointment)\b",
    )
    .expect("static regex")
});

static PATTERN_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:patterns?|trends?|how often|frequency|analy[sz]e|analysis|most common|statistics|stats)\b",
    )
    .expect("static regex")
});

static FIRST_PERSON_REPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:i\s+(?:have|had|got|took|felt|feel|am|was)|i'?ve\s+(?:had|got|been|taken)|i'?m|took|report(?:ing)?\s+(?:a|an|my|some))\b",
    )
    .expect("static regex")
});

static QUESTION_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:how|what|when|which|why|who|do|does|did|have|has|is|are|was|were|any|can|could|would|will|show|give|tell|list|please)\b",
    )
    .expect("static regex")
});

static NEGATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:don'?t|do not|didn'?t|did not|haven'?t|have not|no longer|never)\b")
        .expect("static regex")
});

static LAST_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blast\s+(\d+)\b").expect("static regex"));

static SYMPTOM_LEXICON: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"headaches?|head hurts|head is pounding", "headache"),
        (r"migraines?", "migraine"),
        (r"nause(?:a|ous|ated)|queasy", "nausea"),
        (r"vomit(?:ing|ed)?|threw up|throwing up", "vomiting"),
        (r"dizz(?:y|iness)|light-?headed", "dizziness"),
        (r"fatigued?|tired|exhausted|worn out", "fatigue"),
        (r"fever(?:ish)?", "fever"),
        (r"coughing|cough", "cough"),
        (r"sore throat", "sore throat"),
        (r"back ?aches?|back pain", "back pain"),
        (r"stomach ?aches?|stomach pain|tummy ache|belly ache", "stomach ache"),
        (r"chest pain", "chest pain"),
        (r"joint pain|achy joints", "joint pain"),
        (r"muscle aches?|sore muscles|muscle pain", "muscle ache"),
        (r"cramps?|cramping", "cramps"),
        (r"rash(?:es)?|hives", "rash"),
        (r"itch(?:y|ing)", "itching"),
        (r"insomnia|can'?t sleep|couldn'?t sleep|trouble sleeping", "insomnia"),
        (r"anxi(?:ety|ous)|panic attacks?", "anxiety"),
        (r"congest(?:ion|ed)|stuffy nose|blocked nose", "congestion"),
        (r"runny nose", "runny nose"),
        (r"sneez(?:e|es|ing)", "sneezing"),
        (r"diarrh(?:ea|oea)", "diarrhea"),
        (r"constipat(?:ion|ed)", "constipation"),
        (r"heartburn|acid reflux|reflux", "heartburn"),
        (r"bloat(?:ed|ing)", "bloating"),
        (r"short(?:ness)? of breath|breathless", "shortness of breath"),
        (r"chills", "chills"),
        (r"palpitations", "palpitations"),
        (r"(?:feel(?:ing)?|felt)\s+(?:sick|unwell|ill|awful|terrible|lousy)", "feeling unwell"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        (
            Regex::new(&format!(r"\b(?:{})\b", pattern)).expect("static regex"),
            name,
        )
    })
    .collect()
});

static BODY_PAIN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b([a-z]+)\s+(?:pain|aches?)\b",
        r"\bmy\s+([a-z]+)\s+(?:hurts?|aches?|is killing me)\b",
        r"\bpain in my\s+([a-z]+)\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// Words that can sit in front of "pain" without naming a body part.
const PAIN_QUALIFIERS: &[&str] = &[
    "a", "an", "and", "bad", "burning", "chronic", "constant", "dull", "have", "having", "in",
    "little", "lot", "mild", "much", "my", "no", "of", "severe", "sharp", "slight", "some",
    "stabbing", "terrible", "that", "the", "this", "throbbing", "awful", "with",
];

static MEDICATION_LEXICON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:aspirin|ibuprofen|advil|motrin|tylenol|acetaminophen|paracetamol|naproxen|aleve|excedrin|antacids?|tums|pepto(?:-bismol)?|omeprazole|prilosec|famotidine|metformin|lisinopril|atorvastatin|insulin|antihistamines?|benadryl|diphenhydramine|loratadine|claritin|cetirizine|zyrtec|melatonin|vitamin [a-z0-9]+|prednisone|amoxicillin|antibiotics?|sumatriptan|imitrex|ondansetron|zofran|cough syrup|inhaler|albuterol|ginger tea)\b",
    )
    .expect("static regex")
});

static MEDICATION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:took|take|taking|taken|used|swallowed|popped)\b(.*)").expect("static regex")
});

/// Words skipped when looking for the object of "took".
const OBJECT_FILLER: &[&str] = &[
    "a", "an", "another", "dose", "doses", "more", "my", "of", "some", "the",
];

/// Objects of "took" that mean a medication was taken without naming it.
const UNNAMED_MEDICATION: &[&str] = &[
    "something", "anything", "medicine", "medicines", "medication", "medications", "meds",
    "pill", "pills", "it", "them", "that", "those",
];

/// Objects of "took" that are not medications at all.
const NOT_MEDICATION: &[&str] = &[
    "nap", "break", "walk", "shower", "bath", "rest", "look", "while", "forever", "care", "time",
    "day", "temperature", "blood", "test", "picture", "photo", "seat", "breath", "step",
    "moment", "minute", "hour", "bus", "train", "car", "class", "turn",
];

/// A mention found in a clause, with its byte span for ordering and overlap.
struct Mention {
    start: usize,
    end: usize,
    intent: Intent,
}

fn overlaps(mentions: &[Mention], start: usize, end: usize) -> bool {
    mentions.iter().any(|m| start < m.end && m.start < end)
}

fn medication_mentions(clause: &str, mentions: &mut Vec<Mention>) {
    let mut named = false;
    for m in MEDICATION_LEXICON.find_iter(clause) {
        named = true;
        mentions.push(Mention {
            start: m.start(),
            end: m.end(),
            intent: Intent::Medication(MedicationFields {
                name: Some(m.as_str().to_string()),
                ..Default::default()
            }),
        });
    }
    if named {
        return;
    }

    let Some(caps) = MEDICATION_VERB.captures(clause) else {
        return;
    };
    let (Some(verb), Some(rest)) = (caps.get(0), caps.get(1)) else {
        return;
    };

    let rest = extract::strip_dosage(rest.as_str());
    let object = rest
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .find(|w| !w.is_empty() && !OBJECT_FILLER.contains(w) && !w.chars().all(|c| c.is_ascii_digit()));

    let name = match object {
        Some(word) if NOT_MEDICATION.contains(&word) => return,
        Some(word) if UNNAMED_MEDICATION.contains(&word) => None,
        Some(word) => Some(word.to_string()),
        None => None,
    };

    mentions.push(Mention {
        start: verb.start(),
        end: verb.start() + verb.as_str().find(char::is_whitespace).unwrap_or(verb.as_str().len()),
        intent: Intent::Medication(MedicationFields {
            name,
            ..Default::default()
        }),
    });
}

fn symptom_mentions(clause: &str, mentions: &mut Vec<Mention>) {
    let push = |mentions: &mut Vec<Mention>, start: usize, end: usize, name: String| {
        if overlaps(mentions, start, end) {
            return;
        }
        let already = mentions.iter().any(|m| {
            matches!(&m.intent, Intent::Symptom(f) if f.name.as_deref() == Some(name.as_str()))
        });
        if !already {
            mentions.push(Mention {
                start,
                end,
                intent: Intent::Symptom(SymptomFields {
                    name: Some(name),
                    ..Default::default()
                }),
            });
        }
    };

    for (re, name) in SYMPTOM_LEXICON.iter() {
        for m in re.find_iter(clause) {
            push(mentions, m.start(), m.end(), name.to_string());
        }
    }

    for re in BODY_PAIN.iter() {
        for caps in re.captures_iter(clause) {
            let (Some(whole), Some(part)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = if PAIN_QUALIFIERS.contains(&part.as_str()) {
                "pain".to_string()
            } else {
                format!("{} pain", part.as_str())
            };
            push(mentions, whole.start(), whole.end(), name);
        }
    }
}

fn last_n(clause: &str) -> Option<usize> {
    LAST_N
        .captures(clause)
        .and_then(|caps| caps[1].parse().ok())
}

/// Attach amounts found in a clause to the most recent intent still
/// missing them, which may come from an earlier clause.
fn attach_amounts(clause: &str, intents: &mut [Intent]) {
    if let Some(severity) = extract::severity(clause)
        && let Some(fields) = intents.iter_mut().rev().find_map(|i| match i {
            Intent::Symptom(f) if f.severity.is_none() => Some(f),
            _ => None,
        })
    {
        fields.severity = Some(severity);
    }

    let dosage = extract::dosage(clause);
    let time = extract::time_of_day(clause);
    if dosage.is_none() && time.is_none() {
        return;
    }
    if let Some(fields) = intents.iter_mut().rev().find_map(|i| match i {
        Intent::Medication(f) => Some(f),
        _ => None,
    }) {
        if fields.dosage.is_none() {
            fields.dosage = dosage;
        }
        if fields.time_taken.is_none() {
            fields.time_taken = time;
        }
    }
}

/// Whether a clause that asks for a summary or an analysis also carries a
/// report of its own: an amount, or a first-person statement that is not a
/// question.
fn reports_something(clause: &str) -> bool {
    if extract::severity(clause).is_some() || extract::dosage(clause).is_some() {
        return true;
    }
    FIRST_PERSON_REPORT.is_match(clause) && !QUESTION_OPENER.is_match(clause)
}

/// Classify an utterance without any I/O.
pub fn classify_text(text: &str) -> Vec<Intent> {
    let normalized = extract::normalize(text);
    let mut intents: Vec<Intent> = Vec::new();

    for clause in CLAUSE_SPLIT.split(&normalized) {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }

        let mut cue = false;
        if SUMMARY_CUE.is_match(clause) {
            cue = true;
            if !intents.iter().any(|i| matches!(i, Intent::Summary(_))) {
                intents.push(Intent::Summary(SummaryFields {
                    recent_medications: last_n(clause),
                }));
            }
        } else if PATTERN_CUE.is_match(clause) {
            cue = true;
            if !intents.iter().any(|i| matches!(i, Intent::Pattern(_))) {
                intents.push(Intent::Pattern(PatternFields {
                    window: last_n(clause),
                }));
            }
        }

        if NEGATION.is_match(clause) || (cue && !reports_something(clause)) {
            continue;
        }

        let mut mentions = Vec::new();
        medication_mentions(clause, &mut mentions);
        symptom_mentions(clause, &mut mentions);
        mentions.sort_by_key(|m| m.start);
        intents.extend(mentions.into_iter().map(|m| m.intent));

        attach_amounts(clause, &mut intents);
    }

    if intents.is_empty() {
        vec![Intent::Unrecognized]
    } else {
        intents
    }
}

/// The default classifier: regex lexicons, no network.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<Intent>, ClassifierError> {
        let intents = classify_text(text);
        tracing::debug!(
            classifier = "keyword",
            intents = intents.len(),
            "classified utterance"
        );
        Ok(intents)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
