//! Supported conversation languages
//!
//! The agent converses in English, Tamil and Hindi. Any other language code
//! falls back to English for prompts and canned messages.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported languages, serialized by ISO 639-1 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ta")]
    Tamil,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    /// Get ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Tamil => "ta",
            Self::Hindi => "hi",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Tamil => "Tamil",
            Self::Hindi => "Hindi",
        }
    }

    /// Get script used by this language
    pub fn script(&self) -> Script {
        match self {
            Self::English => Script::Latin,
            Self::Tamil => Script::Tamil,
            Self::Hindi => Script::Devanagari,
        }
    }

    /// Parse from a code or name, case-insensitive
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" | "en-in" | "en-us" => Some(Self::English),
            "ta" | "tam" | "tamil" | "ta-in" => Some(Self::Tamil),
            "hi" | "hin" | "hindi" | "hi-in" => Some(Self::Hindi),
            _ => None,
        }
    }

    /// Parse a code, falling back to English for anything unsupported
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_str_loose(code).unwrap_or_default()
    }

    /// Get all supported languages
    pub fn all() -> &'static [Language] {
        &[Self::English, Self::Tamil, Self::Hindi]
    }

    /// Guess the language from the dominant script of a text
    ///
    /// Returns `None` for text with no letters at all.
    pub fn detect(text: &str) -> Option<Self> {
        let mut counts = [0usize; 3];
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            match Script::of(c) {
                Some(Script::Latin) => counts[0] += 1,
                Some(Script::Tamil) => counts[1] += 1,
                Some(Script::Devanagari) => counts[2] += 1,
                None => {}
            }
        }

        let (idx, max) = counts
            .iter()
            .enumerate()
            .max_by_key(|(_, n)| **n)
            .map(|(i, n)| (i, *n))?;
        if max == 0 {
            return None;
        }
        Some(match idx {
            1 => Self::Tamil,
            2 => Self::Hindi,
            _ => Self::English,
        })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or(crate::Error::UnsupportedLanguage)
    }
}

/// Writing scripts of the supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Tamil,
    Devanagari,
}

impl Script {
    /// Get unicode range for script (start, end)
    pub fn unicode_range(&self) -> (u32, u32) {
        match self {
            Self::Latin => (0x0041, 0x024F),
            Self::Tamil => (0x0B80, 0x0BFF),
            Self::Devanagari => (0x0900, 0x097F),
        }
    }

    /// Check if character belongs to this script
    pub fn contains_char(&self, c: char) -> bool {
        let (start, end) = self.unicode_range();
        let code = c as u32;
        code >= start && code <= end
    }

    fn of(c: char) -> Option<Self> {
        [Self::Latin, Self::Tamil, Self::Devanagari]
            .into_iter()
            .find(|s| s.contains_char(c))
    }
}
