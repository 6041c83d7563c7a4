// ABOUTME: Regex helpers that pull severities, dosages, clock times and item names out of free text.
// ABOUTME: Shared by the keyword classifier and by the handlers when a reply answers a pending question.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static NUMBER_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b")
        .expect("static regex")
});

const DOSE_UNITS: &str = "mg|milligrams?|mcg|micrograms?|g|grams?|ml|milliliters?|iu|units?|tablets?|tabs?|pills?|capsules?|caps?|drops?|puffs?|sprays?|teaspoons?|tsp|tablespoons?|tbsp|doses?";

static DOSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b\d+(?:\.\d+)?\s*(?:{DOSE_UNITS})\b")).expect("static regex")
});

static DOSE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(?:{DOSE_UNITS}|half|quarter|spoonfuls?)\b")).expect("static regex")
});

static CLOCK_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("static regex"));

static CLOCK_12H: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?").expect("static regex")
});

static SEVERITY_OUT_OF_TEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:/|out of)\s*10\b").expect("static regex")
});

static SEVERITY_LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:severity|level|rating|rated|rate it)\s*(?:of|is|at|was|a|:|=)?\s*(-?\d+(?:\.\d+)?)")
        .expect("static regex")
});

static SEVERITY_HEDGED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:a|an|about|around|like|maybe|roughly)\s+(-?\d+(?:\.\d+)?)\b")
        .expect("static regex")
});

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)").expect("static regex"));

static DECLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:no|nope|none|nothing|skip|n/a|na|no notes?|nothing (?:else|to add)|no thanks?)[.!]?$")
        .expect("static regex")
});

static SMALL_TALK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:thanks?|thank you|thx|ty|cheers|ok(?:ay)?|cool|great|nice|sure|yes|yeah|yep|hi|hello|hey|good (?:morning|afternoon|evening|night)|bye|goodbye|see (?:you|ya)(?: later| soon)?|lol|haha|hmm+|never ?mind|how are you)(?: so much| very much| a lot| again| there)?[\s,.!?]*)+$",
    )
    .expect("static regex")
});

fn number_word_value(word: &str) -> &'static str {
    match word {
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "ten" => "10",
        "eleven" => "11",
        _ => "12",
    }
}

/// Lowercase, trim, and spell small number words as digits.
pub fn normalize(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    NUMBER_WORD
        .replace_all(&lower, |caps: &regex::Captures| number_word_value(&caps[1]).to_string())
        .into_owned()
}

/// The first dosage-looking phrase, e.g. `500mg` or `2 tablets`.
pub fn dosage(text: &str) -> Option<String> {
    DOSAGE.find(text).map(|m| m.as_str().trim().to_string())
}

/// Blank out dosage phrases.
pub fn strip_dosage(text: &str) -> String {
    DOSAGE.replace_all(text, " ").into_owned()
}

/// The first clock time, as `HH:MM` in 24-hour form. Out-of-range values
/// are passed through for validation to reject.
pub fn time_of_day(text: &str) -> Option<String> {
    if let Some(caps) = CLOCK_12H.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let pm = &caps[3] == "p";
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return Some(format!("{:02}:{:02}", hour, minute));
    }

    CLOCK_24H
        .captures(text)
        .map(|caps| format!("{:0>2}:{}", &caps[1], &caps[2]))
}

/// Remove dosage and clock-time phrases so their numbers are not read as a
/// severity.
fn without_amounts(text: &str) -> String {
    let text = DOSAGE.replace_all(text, " ");
    let text = CLOCK_12H.replace_all(&text, " ");
    CLOCK_24H.replace_all(&text, " ").into_owned()
}

fn number_value(raw: &str) -> Option<Value> {
    if raw.contains('.') {
        raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
    } else {
        raw.parse::<i64>().ok().map(Value::from)
    }
}

/// A severity stated with a cue ("7/10", "severity 6", "about a 5").
/// Returns the raw number, which may still be out of range.
pub fn severity(text: &str) -> Option<Value> {
    let text = without_amounts(&normalize(text));
    [&*SEVERITY_OUT_OF_TEN, &*SEVERITY_LABELLED, &*SEVERITY_HEDGED]
        .iter()
        .find_map(|re| re.captures(&text))
        .and_then(|caps| number_value(&caps[1]))
}

/// A severity given as a direct answer. Any number counts; with none, the
/// reply itself is returned so validation can explain what was wrong.
pub fn severity_answer(text: &str) -> Value {
    if let Some(v) = severity(text) {
        return v;
    }
    let stripped = without_amounts(&normalize(text));
    BARE_NUMBER
        .captures(&stripped)
        .and_then(|caps| number_value(&caps[1]))
        .unwrap_or_else(|| Value::String(text.trim().to_string()))
}

/// True when a reply declines to add anything ("no", "skip", ...).
pub fn is_decline(text: &str) -> bool {
    DECLINE.is_match(&normalize(text))
}

/// True for pleasantries that carry no answer ("thanks!", "ok", "hi there").
pub fn is_small_talk(text: &str) -> bool {
    SMALL_TALK.is_match(&normalize(text))
}

/// True when a reply names some amount: a number or a dose unit.
pub fn mentions_amount(text: &str) -> bool {
    let text = normalize(text);
    text.chars().any(|c| c.is_ascii_digit()) || DOSE_WORD.is_match(&text)
}

/// Trim a free-text answer and drop a leading article or filler.
pub fn answer_text(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches(['.', '!']);
    for prefix in ["it's ", "it was ", "it is ", "i took ", "just "] {
        if let Some(head) = trimmed.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
            && trimmed.len() > prefix.len()
        {
            return trimmed[prefix.len()..].trim().to_string();
        }
    }
    trimmed.to_string()
}
