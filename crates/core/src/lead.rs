//! Lead record collected across conversation turns
//!
//! Fields are filled strictly in the order name, phone, company,
//! requirement. A field that holds a value is never overwritten.

use serde::{Deserialize, Serialize};

/// One of the four lead fields, in fill order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadField {
    Name,
    Phone,
    Company,
    Requirement,
}

impl LeadField {
    /// Fill order
    pub const ORDER: [LeadField; 4] = [
        LeadField::Name,
        LeadField::Phone,
        LeadField::Company,
        LeadField::Requirement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Requirement => "requirement",
        }
    }
}

impl std::fmt::Display for LeadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partially filled lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub requirement: Option<String>,
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, treating empty strings as unfilled
    pub fn get(&self, field: LeadField) -> Option<&str> {
        let value = match field {
            LeadField::Name => &self.name,
            LeadField::Phone => &self.phone,
            LeadField::Company => &self.company,
            LeadField::Requirement => &self.requirement,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn is_filled(&self, field: LeadField) -> bool {
        self.get(field).is_some()
    }

    /// First unfilled field in fill order
    pub fn next_missing(&self) -> Option<LeadField> {
        LeadField::ORDER.into_iter().find(|f| !self.is_filled(*f))
    }

    /// All four fields hold a value
    pub fn is_complete(&self) -> bool {
        self.next_missing().is_none()
    }

    pub fn filled_count(&self) -> usize {
        LeadField::ORDER
            .iter()
            .filter(|f| self.is_filled(**f))
            .count()
    }

    /// Fill the next missing field with `value`
    ///
    /// Returns the field that was filled. Nothing changes when the record is
    /// complete, the value is blank, or a phone value fails validation.
    pub fn fill_next(&mut self, value: impl Into<String>) -> Option<LeadField> {
        let field = self.next_missing()?;
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if field == LeadField::Phone && !is_valid_phone(value) {
            return None;
        }

        let slot = match field {
            LeadField::Name => &mut self.name,
            LeadField::Phone => &mut self.phone,
            LeadField::Company => &mut self.company,
            LeadField::Requirement => &mut self.requirement,
        };
        *slot = Some(value.to_string());
        Some(field)
    }

    /// One line per field, used in classification prompts
    pub fn status_summary(&self) -> String {
        LeadField::ORDER
            .iter()
            .map(|f| {
                let label = match f {
                    LeadField::Name => "Name",
                    LeadField::Phone => "Phone",
                    LeadField::Company => "Company",
                    LeadField::Requirement => "Requirement",
                };
                format!("- {}: {}", label, self.get(*f).unwrap_or("Not provided"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Indian mobile number: exactly 10 ASCII digits, first digit 6-9
pub fn is_valid_phone(value: &str) -> bool {
    value.len() == 10
        && value.bytes().all(|b| b.is_ascii_digit())
        && matches!(value.as_bytes()[0], b'6'..=b'9')
}
