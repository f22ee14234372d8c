//! Lead field extraction
//!
//! Only the first unfilled field is ever looked at. Each field has its own
//! policy:
//! - name: text after an introduction marker, or a spelled-out name
//! - phone: the digits of the utterance, exactly 10 and starting 6-9
//! - company, requirement: the trimmed utterance
//!
//! Extraction never fails. Input that yields no acceptable value leaves the
//! record unchanged so the same field is asked for again.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use lead_agent_core::{LeadField, LeadRecord};

/// Introduction markers, in priority order
const NAME_MARKERS: [&str; 7] = [
    "my name is",
    "mera naam",
    "naam hai",
    "i am",
    "i'm",
    "this is",
    "call me",
];

/// Filler words dropped from the text after a marker
const NAME_STOPWORDS: [&str; 2] = ["is", "hai"];

static MARKER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    NAME_MARKERS
        .iter()
        .map(|marker| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(marker))).unwrap())
        .collect()
});

/// Whether `text` contains an introduction marker such as "my name is"
pub fn has_name_marker(text: &str) -> bool {
    MARKER_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Result of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Record after the attempt
    pub lead: LeadRecord,
    /// Field that was looked at, `None` when the record was already complete
    pub field: Option<LeadField>,
    /// Value found in the utterance, accepted or not
    pub candidate: Option<String>,
    /// Whether the candidate was stored
    pub filled: bool,
}

/// Stateless extractor for the ordered lead fields
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Updated copy of `lead` with at most its first missing field filled
    pub fn extract(&self, transcript: &str, lead: &LeadRecord) -> LeadRecord {
        self.extract_field(transcript, lead).lead
    }

    /// Like [`extract`](Self::extract), also reporting what was attempted
    pub fn extract_field(&self, transcript: &str, lead: &LeadRecord) -> Extraction {
        let mut updated = lead.clone();
        let Some(field) = lead.next_missing() else {
            return Extraction {
                lead: updated,
                field: None,
                candidate: None,
                filled: false,
            };
        };

        let candidate = match field {
            LeadField::Name => extract_name(transcript),
            LeadField::Phone => extract_phone(transcript),
            LeadField::Company | LeadField::Requirement => {
                Some(transcript.trim().to_string()).filter(|v| !v.is_empty())
            }
        };

        let filled = match &candidate {
            Some(value) => updated.fill_next(value.as_str()) == Some(field),
            None => false,
        };

        tracing::debug!(
            field = field.as_str(),
            found = candidate.is_some(),
            filled,
            "Lead field extraction"
        );

        Extraction {
            lead: updated,
            field: Some(field),
            candidate,
            filled,
        }
    }
}

fn extract_name(transcript: &str) -> Option<String> {
    let lower = transcript.to_lowercase();

    let mut saw_marker = false;
    for pattern in MARKER_PATTERNS.iter() {
        let Some(found) = pattern.find_iter(&lower).last() else {
            continue;
        };
        saw_marker = true;

        let words: Vec<&str> = lower[found.end()..]
            .split_whitespace()
            .map(trim_punctuation)
            .filter(|w| !w.is_empty() && !NAME_STOPWORDS.contains(w))
            .collect();

        if words.len() >= 2 && words.iter().all(|w| w.chars().count() == 1) {
            return Some(words.concat().to_uppercase());
        }

        let name: Vec<String> = words
            .iter()
            .filter(|w| w.chars().count() > 1)
            .take(2)
            .map(|w| title_case(w))
            .collect();
        if !name.is_empty() {
            return Some(name.join(" "));
        }
    }

    if saw_marker {
        return None;
    }
    spelled_name(transcript)
}

/// "J O H N" style input: 2 to 6 alphabetic tokens of at most two characters
///
/// A lone short token is not a spelled name; replies like "ok" or "hi" would
/// otherwise be stored. Short names still land through a marker ("I am Jo").
fn spelled_name(transcript: &str) -> Option<String> {
    let tokens: Vec<&str> = transcript
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|t| !t.is_empty())
        .collect();
    let spelled = (2..=6).contains(&tokens.len())
        && tokens
            .iter()
            .all(|t| t.chars().count() <= 2 && t.chars().all(char::is_alphabetic));
    spelled.then(|| tokens.concat().to_uppercase())
}

fn extract_phone(transcript: &str) -> Option<String> {
    let digits: String = transcript.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| c.is_ascii_punctuation() || c == '।')
}

fn title_case(word: &str) -> String {
    let mut graphemes = word.graphemes(true);
    match graphemes.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), graphemes.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_core::is_valid_phone;

    fn lead_with(fields: &[&str]) -> LeadRecord {
        let mut lead = LeadRecord::default();
        for value in fields {
            lead.fill_next(*value);
        }
        lead
    }

    #[test]
    fn test_name_after_marker() {
        let lead = FieldExtractor.extract("my name is John Smith", &LeadRecord::default());
        assert_eq!(lead.name.as_deref(), Some("John Smith"));
        assert!(lead.phone.is_none());
    }

    #[test]
    fn test_name_keeps_two_words_and_title_cases() {
        let lead = FieldExtractor.extract("Hi, I am priya ramesh kumar", &LeadRecord::default());
        assert_eq!(lead.name.as_deref(), Some("Priya Ramesh"));
    }

    #[test]
    fn test_name_hindi_marker_drops_filler() {
        let lead = FieldExtractor.extract("mera naam Rahul hai", &LeadRecord::default());
        assert_eq!(lead.name.as_deref(), Some("Rahul"));
    }

    #[test]
    fn test_name_marker_requires_word_boundary() {
        assert!(!has_name_marker("miami beach"));
        assert!(has_name_marker("Call me Anu"));
    }

    #[test]
    fn test_spelled_name_after_marker() {
        let lead = FieldExtractor.extract("my name is J O H N", &LeadRecord::default());
        assert_eq!(lead.name.as_deref(), Some("JOHN"));
    }

    #[test]
    fn test_spelled_name_without_marker() {
        let lead = FieldExtractor.extract("a n u", &LeadRecord::default());
        assert_eq!(lead.name.as_deref(), Some("ANU"));
    }

    #[test]
    fn test_single_short_token_is_not_a_spelled_name() {
        let empty = LeadRecord::default();
        for text in ["Jo", "hi", "ok.", "9 8"] {
            assert_eq!(FieldExtractor.extract(text, &empty), empty, "input: {text:?}");
        }
        let lead = FieldExtractor.extract("I am Jo", &empty);
        assert_eq!(lead.name.as_deref(), Some("Jo"));
    }

    #[test]
    fn test_no_name_pattern_leaves_record_unchanged() {
        let empty = LeadRecord::default();
        for text in ["I want to know more", "ok", "", "my name is"] {
            assert_eq!(FieldExtractor.extract(text, &empty), empty, "input: {text:?}");
        }
    }

    #[test]
    fn test_phone_exactly_ten_digits() {
        let lead = lead_with(&["John"]);
        let updated = FieldExtractor.extract("it's 98765 43210", &lead);
        assert_eq!(updated.phone.as_deref(), Some("9876543210"));
    }

    #[test]
    fn test_phone_rejects_invalid_numbers() {
        let lead = lead_with(&["John"]);
        for text in ["12345", "+91 98765 43210", "5876543210", "call me tomorrow"] {
            let extraction = FieldExtractor.extract_field(text, &lead);
            assert!(!extraction.filled, "input: {text:?}");
            assert_eq!(extraction.lead, lead);
            assert_eq!(extraction.field, Some(LeadField::Phone));
        }
    }

    #[test]
    fn test_rejected_phone_reports_candidate() {
        let lead = lead_with(&["John"]);
        let extraction = FieldExtractor.extract_field("12345", &lead);
        assert_eq!(extraction.candidate.as_deref(), Some("12345"));
        assert!(!extraction.filled);
    }

    #[test]
    fn test_company_and_requirement_verbatim() {
        let lead = lead_with(&["John", "9876543210"]);
        let lead = FieldExtractor.extract("  Acme Corp  ", &lead);
        assert_eq!(lead.company.as_deref(), Some("Acme Corp"));

        let lead = FieldExtractor.extract("I need a chatbot for my website", &lead);
        assert_eq!(
            lead.requirement.as_deref(),
            Some("I need a chatbot for my website")
        );
        assert!(lead.is_complete());
    }

    #[test]
    fn test_only_first_missing_field_is_touched() {
        // a phone number while the name is missing is not stored as the phone
        let lead = FieldExtractor.extract("9876543210", &LeadRecord::default());
        assert!(lead.phone.is_none());
        assert!(lead.name.is_none());
    }

    #[test]
    fn test_complete_record_is_left_alone() {
        let lead = lead_with(&["John", "9876543210", "Acme", "Chatbot"]);
        let extraction = FieldExtractor.extract_field("my name is Bob", &lead);
        assert_eq!(extraction.lead, lead);
        assert_eq!(extraction.field, None);
    }

    #[test]
    fn test_filled_fields_never_overwritten() {
        let mut lead = LeadRecord::default();
        let turns = [
            "my name is John",
            "my name is Bob",
            "12345",
            "9876543210",
            "Acme",
            "A voice bot",
            "Globex",
        ];
        let mut seen: Vec<(LeadField, String)> = Vec::new();
        for text in turns {
            lead = FieldExtractor.extract(text, &lead);
            for (field, value) in &seen {
                assert_eq!(lead.get(*field), Some(value.as_str()));
            }
            seen = LeadField::ORDER
                .iter()
                .filter_map(|f| lead.get(*f).map(|v| (*f, v.to_string())))
                .collect();
        }
        assert_eq!(lead.name.as_deref(), Some("John"));
        assert_eq!(lead.phone.as_deref(), Some("9876543210"));
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(lead.requirement.as_deref(), Some("A voice bot"));
        assert!(is_valid_phone(lead.phone.as_deref().unwrap_or_default()));
    }
}
