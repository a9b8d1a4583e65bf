//! Field extraction from free-text call summaries.
//!
//! Every field is read through one ordered rule table. When no rule matches
//! the result is [`Extraction::NoMatch`], never a placeholder string.
//!
//! Which match wins depends on the field (see [`SummaryField::precedence`]):
//! phone numbers take the match that starts earliest in the text, so the
//! caller's own number beats one mentioned later; the other fields take the
//! first rule, top to bottom, that matches anywhere.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    Phone,
    Symptoms,
    Name,
    PainLevel,
}

/// How competing rule matches for one field are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// First rule in table order that matches anywhere.
    RuleOrder,
    /// Match starting earliest in the text; table order breaks ties.
    Leftmost,
}

impl SummaryField {
    pub fn precedence(self) -> Precedence {
        match self {
            Self::Phone => Precedence::Leftmost,
            Self::Symptoms | Self::Name | Self::PainLevel => Precedence::RuleOrder,
        }
    }
}

/// Outcome of looking up one field in a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Matched {
        value: String,
        /// Description of the rule that produced the value.
        rule: &'static str,
    },
    NoMatch,
}

impl Extraction {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Matched { value, .. } => Some(value),
            Self::NoMatch => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Matched { value, .. } => Some(value),
            Self::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// A compiled pattern bound to the field it fills.
///
/// The value is capture group 1 when the pattern has one, the whole match
/// otherwise.
struct ExtractionRule {
    field: SummaryField,
    regex: Regex,
    description: &'static str,
}

static SUMMARY_RULES: LazyLock<Vec<ExtractionRule>> = LazyLock::new(|| {
    vec![
        // Phone: the national number keeps the caller's formatting. A leading
        // +1 / 1 is dropped so the key matches the one from the initial call.
        rule(
            SummaryField::Phone,
            r"(?:\+1|\b1)[-.\s]?(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})\b",
            "Phone with +1 country code",
        ),
        rule(
            SummaryField::Phone,
            r"\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
            "Ten-digit phone: (555) 123-4567 / 555-123-4567 / 555.123.4567",
        ),
        rule(
            SummaryField::Phone,
            r"\b\d{10,11}\b",
            "Bare 10-11 digit run",
        ),
        // Symptoms
        rule(
            SummaryField::Symptoms,
            r"(?i)\babout an? (.+?) (?:issue|problem)s?\b",
            "'about a [x] issue(s)'",
        ),
        rule(
            SummaryField::Symptoms,
            r"(?i)\bcall(?:ed|ing)?(?: in)? (?:about|regarding|for) (?:an? |their |his |her )?(.+?)(?:[.,;]|\band\b|$)",
            "'calling about [x]'",
        ),
        rule(
            SummaryField::Symptoms,
            r"(?i)\b(?:experiencing|reports?|reported|complain(?:s|ed|ing)? (?:of|about))\s+(.+?)(?:[.,;]|$)",
            "'experiencing / complaining of [x]'",
        ),
        // Name: keyword is case-insensitive, the name itself must be capitalised.
        rule(
            SummaryField::Name,
            r"\b(?i:caller|patient)(?:'s name)?\s+(?i:is|was|named)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
            "'caller is / patient named [Name]'",
        ),
        rule(
            SummaryField::Name,
            r"\b(?i:my name is|name is|spoke with)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
            "'my name is [Name]'",
        ),
        // Pain level
        rule(
            SummaryField::PainLevel,
            r"(?i)\bpain (?:level|score|rating)(?: of| is| was|:)?\s*(\d{1,2}(?:\.\d)?)",
            "'pain level of [n]'",
        ),
        rule(
            SummaryField::PainLevel,
            r"(?i)\b(\d{1,2}(?:\.\d)?)\s*(?:/|out of)\s*10\b",
            "'[n]/10' or '[n] out of 10'",
        ),
    ]
});

fn rule(field: SummaryField, regex_str: &str, description: &'static str) -> ExtractionRule {
    ExtractionRule {
        field,
        regex: Regex::new(regex_str).expect("Invalid summary extraction regex"),
        description,
    }
}

/// Look up one field in `text`.
pub fn extract(field: SummaryField, text: &str) -> Extraction {
    let mut best: Option<(usize, Extraction)> = None;
    for rule in SUMMARY_RULES.iter().filter(|r| r.field == field) {
        let Some((start, value)) = rule.find(text) else {
            continue;
        };
        let matched = Extraction::Matched {
            value,
            rule: rule.description,
        };
        match field.precedence() {
            Precedence::RuleOrder => return matched,
            Precedence::Leftmost => {
                if best.as_ref().map_or(true, |(earliest, _)| start < *earliest) {
                    best = Some((start, matched));
                }
            }
        }
    }
    best.map_or(Extraction::NoMatch, |(_, matched)| matched)
}

impl ExtractionRule {
    /// Start of the whole match and the cleaned value, if non-empty.
    fn find(&self, text: &str) -> Option<(usize, String)> {
        let caps = self.regex.captures(text)?;
        let start = caps.get(0)?.start();
        let m = caps.get(1).or_else(|| caps.get(0))?;
        let value = clean(m.as_str());
        (!value.is_empty()).then(|| (start, value.to_string()))
    }
}

fn clean(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
        .trim()
}

/// All summary fields, extracted in one pass over the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFields {
    pub phone: Extraction,
    pub symptoms: Extraction,
    pub name: Extraction,
    pub pain_level: Extraction,
}

impl SummaryFields {
    pub fn from_summary(text: &str) -> Self {
        Self {
            phone: extract(SummaryField::Phone, text),
            symptoms: extract(SummaryField::Symptoms, text),
            name: extract(SummaryField::Name, text),
            pain_level: extract(SummaryField::PainLevel, text),
        }
    }
}
