use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::date::deserialize_optional_date;

// --- Compiled code matchers (one-time via LazyLock) ---

static PLACE_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z]\d{3}$").expect("valid place code regex"));

static CITY_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Y]\d{3}$").expect("valid city code regex"));

static COUNTRY_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Z\d{3}$").expect("valid country code regex"));

/// Check whether `code` has the Belfiore format (one letter, three digits).
pub fn is_place_code(code: &str) -> bool {
    PLACE_CODE_REGEX.is_match(code)
}

/// Province codes are exactly two uppercase ASCII letters.
pub fn is_province_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Code-pattern matcher restricting a view to one kind of place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeMatcher {
    City,
    Country,
}

impl CodeMatcher {
    fn regex(&self) -> &'static Regex {
        match self {
            CodeMatcher::City => &CITY_CODE_REGEX,
            CodeMatcher::Country => &COUNTRY_CODE_REGEX,
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        self.regex().is_match(code)
    }
}

/// A city or country record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Place {
    #[serde(rename = "belfioreCode")]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(
        rename = "creationDate",
        default,
        deserialize_with = "deserialize_optional_date"
    )]
    pub creation_date: Option<NaiveDate>,
    #[serde(
        rename = "expirationDate",
        default,
        deserialize_with = "deserialize_optional_date"
    )]
    pub expiration_date: Option<NaiveDate>,
}

impl Place {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            province: None,
            creation_date: None,
            expiration_date: None,
        }
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    pub fn with_creation_date(mut self, date: NaiveDate) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn with_expiration_date(mut self, date: NaiveDate) -> Self {
        self.expiration_date = Some(date);
        self
    }
}
