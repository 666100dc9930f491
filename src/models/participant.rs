//! Participant intake.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 60;
pub const GENDER_OPTIONS: [&str; 3] = ["Male", "Female", "Other / Prefer not to say"];

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Raw demographics as submitted; every field may still be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsForm {
    pub email: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<String>,
    /// "I am over 18 and agree to participate" acknowledgement.
    pub consent: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    email: String,
    age: u8,
    gender: String,
}

impl Participant {
    pub fn from_form(form: &DemographicsForm) -> Result<Self, ValidationError> {
        if form.consent != Some(true) {
            return Err(ValidationError::ConsentRequired);
        }
        let email = form.email.as_deref().map(str::trim).unwrap_or_default();
        let gender = form.gender.as_deref().map(str::trim).unwrap_or_default();
        let (Some(age), false, false) = (form.age, email.is_empty(), gender.is_empty()) else {
            return Err(ValidationError::MissingFields);
        };

        if !email_regex().is_match(email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(ValidationError::UnknownOption(age.to_string()));
        }
        if !GENDER_OPTIONS.contains(&gender) {
            return Err(ValidationError::UnknownOption(gender.to_string()));
        }

        Ok(Self {
            email: email.to_string(),
            age,
            gender: gender.to_string(),
        })
    }

    /// Placeholder identity used by the debug shortcut into the main study.
    pub fn debug() -> Self {
        Self {
            email: "debug@test.com".into(),
            age: 25,
            gender: "Prefer not to say".into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }
}
