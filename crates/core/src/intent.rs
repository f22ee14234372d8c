//! Intents and the intent to action mapping

use serde::{Deserialize, Serialize};

/// Confidence attached to every classification
pub const DEFAULT_CONFIDENCE: f32 = 0.9;

/// Classified purpose of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Greeting,
    Objection,
    ServiceInquiry,
    LeadQualification,
    /// Terminal intent reserved for a future closing flow; never produced
    /// by the classifiers
    Closing,
}

impl Intent {
    /// Deterministic step that follows classification
    pub fn next_action(&self) -> NextAction {
        match self {
            Self::Greeting | Self::Objection | Self::Closing => NextAction::Generate,
            Self::ServiceInquiry => NextAction::Retrieve,
            Self::LeadQualification => NextAction::Extract,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "GREETING",
            Self::Objection => "OBJECTION",
            Self::ServiceInquiry => "SERVICE_INQUIRY",
            Self::LeadQualification => "LEAD_QUALIFICATION",
            Self::Closing => "CLOSING",
        }
    }

    /// Inverse of [`Intent::as_str`]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GREETING" => Some(Self::Greeting),
            "OBJECTION" => Some(Self::Objection),
            "SERVICE_INQUIRY" => Some(Self::ServiceInquiry),
            "LEAD_QUALIFICATION" => Some(Self::LeadQualification),
            "CLOSING" => Some(Self::Closing),
            _ => None,
        }
    }

    /// Parse a free-form model label
    ///
    /// Matching is by substring on the upper-cased text, checked in the
    /// order greeting, objection, service, lead qualification.
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim().to_uppercase();
        if label.contains("GREETING") {
            Some(Self::Greeting)
        } else if label.contains("OBJECTION") {
            Some(Self::Objection)
        } else if label.contains("SERVICE") {
            Some(Self::ServiceInquiry)
        } else if label.contains("LEAD") || label.contains("QUALIFICATION") {
            Some(Self::LeadQualification)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Step taken after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Retrieve,
    Extract,
    Generate,
}

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    pub next_action: NextAction,
}

impl Classification {
    /// Classification with the default confidence and the mapped action
    pub fn new(intent: Intent) -> Self {
        Self::with_confidence(intent, DEFAULT_CONFIDENCE)
    }

    pub fn with_confidence(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            next_action: intent.next_action(),
        }
    }

    /// Used whenever classification cannot be performed
    pub fn fallback() -> Self {
        Self::new(Intent::LeadQualification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_action_mapping() {
        assert_eq!(Intent::Greeting.next_action(), NextAction::Generate);
        assert_eq!(Intent::Objection.next_action(), NextAction::Generate);
        assert_eq!(Intent::ServiceInquiry.next_action(), NextAction::Retrieve);
        assert_eq!(Intent::LeadQualification.next_action(), NextAction::Extract);
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Intent::from_label("GREETING"), Some(Intent::Greeting));
        assert_eq!(Intent::from_label(" objection\n"), Some(Intent::Objection));
        assert_eq!(
            Intent::from_label("3. SERVICE_INQUIRY"),
            Some(Intent::ServiceInquiry)
        );
        assert_eq!(Intent::from_label("service"), Some(Intent::ServiceInquiry));
        assert_eq!(
            Intent::from_label("LEAD_QUALIFICATION"),
            Some(Intent::LeadQualification)
        );
        assert_eq!(Intent::from_label("banana"), None);
        assert_eq!(Intent::from_label(""), None);
    }

    #[test]
    fn test_parse_round_trip() {
        for intent in [Intent::Greeting, Intent::ServiceInquiry, Intent::Closing] {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(Intent::parse("service"), None);
    }

    #[test]
    fn test_fallback_classification() {
        let c = Classification::fallback();
        assert_eq!(c.intent, Intent::LeadQualification);
        assert_eq!(c.next_action, NextAction::Extract);
        assert!((c.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_clamped() {
        let c = Classification::with_confidence(Intent::Greeting, 1.7);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_serde_label() {
        let json = serde_json::to_string(&Intent::ServiceInquiry).unwrap();
        assert_eq!(json, "\"SERVICE_INQUIRY\"");
    }
}
