//! Canned replies keyed by language code
//!
//! Each table maps an ISO 639-1 code to a reply. Lookups for a language
//! without an entry use the English entry.

use std::collections::HashMap;

use lead_agent_core::Language;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Kinds of canned reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Greeting,
    Objection,
    /// Reply used when the generation backend fails
    Fallback,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Objection => "objection",
            Self::Fallback => "fallback",
        }
    }
}

/// Language-keyed canned replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCatalog {
    #[serde(default = "default_greeting")]
    pub greeting: HashMap<String, String>,

    #[serde(default = "default_objection")]
    pub objection: HashMap<String, String>,

    #[serde(default = "default_fallback")]
    pub fallback: HashMap<String, String>,

    /// Sent, in English, when speech could not be mapped to a supported language
    #[serde(default = "default_unsupported_language")]
    pub unsupported_language: String,
}

impl MessageCatalog {
    /// Reply of the given kind in `language`, or the English reply
    pub fn get(&self, kind: MessageKind, language: Language) -> &str {
        let table = self.table(kind);
        table
            .get(language.code())
            .or_else(|| table.get(Language::English.code()))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Reply for a raw language code, English when unknown
    pub fn get_for_code(&self, kind: MessageKind, code: &str) -> &str {
        let table = self.table(kind);
        table
            .get(code)
            .or_else(|| table.get(Language::English.code()))
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn table(&self, kind: MessageKind) -> &HashMap<String, String> {
        match kind {
            MessageKind::Greeting => &self.greeting,
            MessageKind::Objection => &self.objection,
            MessageKind::Fallback => &self.fallback,
        }
    }

    /// Every table must carry an English entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in [
            MessageKind::Greeting,
            MessageKind::Objection,
            MessageKind::Fallback,
        ] {
            let has_english = self
                .table(kind)
                .get(Language::English.code())
                .is_some_and(|m| !m.trim().is_empty());
            if !has_english {
                return Err(ConfigError::invalid(
                    &format!("messages.{}", kind.as_str()),
                    "an English (en) entry is required",
                ));
            }
        }
        if self.unsupported_language.trim().is_empty() {
            return Err(ConfigError::invalid(
                "messages.unsupported_language",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            objection: default_objection(),
            fallback: default_fallback(),
            unsupported_language: default_unsupported_language(),
        }
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_greeting() -> HashMap<String, String> {
    table(&[
        (
            "en",
            "Hi! I'm Riya from Synvolve Intellis. We help businesses with AI solutions. How can I help you today?",
        ),
        (
            "ta",
            "வணக்கம்! நான் சின்வால்வ் இன்டெலிஸ் நிறுவனத்தின் ரியா. நாங்கள் வணிகங்களுக்கு AI தீர்வுகளை வழங்குகிறோம். இன்று உங்களுக்கு எப்படி உதவலாம்?",
        ),
        (
            "hi",
            "नमस्ते! मैं सिनवॉल्व इंटेलिस की रिया हूं। हम व्यवसायों को AI समाधान प्रदान करते हैं। आज मैं आपकी कैसे मदद कर सकती हूं?",
        ),
    ])
}

fn default_objection() -> HashMap<String, String> {
    table(&[
        (
            "en",
            "No worries! Feel free to reach out anytime you need. Have a great day!",
        ),
        (
            "ta",
            "பரவாயில்லை! தேவைப்படும்போது எப்போது வேண்டுமானாலும் தொடர்பு கொள்ளுங்கள். நல்ல நாள்!",
        ),
        (
            "hi",
            "कोई बात नहीं! जब भी जरूरत हो संपर्क करें। आपका दिन शुभ हो!",
        ),
    ])
}

fn default_fallback() -> HashMap<String, String> {
    table(&[
        ("en", "I'm having trouble. Could you repeat that?"),
        ("ta", "எனக்கு சிக்கல் உள்ளது. மீண்டும் சொல்ல முடியுமா?"),
        ("hi", "मुझे समस्या हो रही है। क्या आप दोहरा सकते हैं?"),
    ])
}

fn default_unsupported_language() -> String {
    "Sorry, I don't know that language. I can help you with English, Tamil, or Hindi.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_language() {
        let catalog = MessageCatalog::default();
        assert!(catalog
            .get(MessageKind::Greeting, Language::English)
            .starts_with("Hi! I'm Riya"));
        assert!(catalog
            .get(MessageKind::Greeting, Language::Hindi)
            .starts_with("नमस्ते"));
        assert_eq!(
            catalog.get(MessageKind::Fallback, Language::English),
            "I'm having trouble. Could you repeat that?"
        );
    }

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        let catalog = MessageCatalog::default();
        assert_eq!(
            catalog.get_for_code(MessageKind::Objection, "te"),
            catalog.get(MessageKind::Objection, Language::English)
        );
    }

    #[test]
    fn test_missing_entry_falls_back_to_english() {
        let mut catalog = MessageCatalog::default();
        catalog.greeting.remove("ta");
        assert_eq!(
            catalog.get(MessageKind::Greeting, Language::Tamil),
            catalog.get(MessageKind::Greeting, Language::English)
        );
    }

    #[test]
    fn test_new_language_is_data_only() {
        let yaml = r#"
greeting:
  en: "Hello"
  te: "నమస్కారం"
"#;
        let catalog: MessageCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.get_for_code(MessageKind::Greeting, "te"), "నమస్కారం");
        // Tables not given in the file keep their defaults
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_english() {
        let mut catalog = MessageCatalog::default();
        catalog.fallback.remove("en");
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "messages.fallback"
        ));
    }
}
