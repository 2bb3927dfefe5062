//! Filter criteria and the place inclusion predicate.
//!
//! A `FilterCriteria` is an immutable conjunction of up to four constraints.
//! Absent constraints impose nothing. A `FilterChain` stacks the criteria of
//! a view on top of those of every view it was derived from, so derived
//! views only ever narrow. The predicates are pure and are only evaluated
//! when a view builds its filtered copy of a fresh cache snapshot.

use chrono::NaiveDate;

use crate::error::ConnectorError;
use crate::models::{CodeMatcher, Place};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub code_matcher: Option<CodeMatcher>,
    pub province: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl FilterCriteria {
    /// Reject combinations that cannot describe a view: a code matcher
    /// together with a province, or an upper date bound without a lower one.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.code_matcher.is_some() && self.province.is_some() {
            return Err(ConnectorError::ConflictingScope);
        }
        if self.to_date.is_some() && self.from_date.is_none() {
            return Err(ConnectorError::ToDateWithoutFromDate);
        }
        Ok(())
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, place: &Place) -> bool {
        if let Some(matcher) = self.code_matcher {
            if !matcher.matches(&place.code) {
                return false;
            }
        }

        if let Some(ref province) = self.province {
            match place.province {
                Some(ref p) if p.eq_ignore_ascii_case(province) => {}
                _ => return false,
            }
        }

        // Day granularity: dates carry no time of day
        if let (Some(from), Some(created)) = (self.from_date, place.creation_date) {
            if from < created {
                return false;
            }
        }

        if let (Some(to), Some(expired)) = (self.to_date, place.expiration_date) {
            if to > expired {
                return false;
            }
        }

        true
    }

    /// Keep matching places, preserving their order.
    pub fn apply(&self, places: &[Place]) -> Vec<Place> {
        places.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

/// Criteria of a view and of all its ancestors, root first.
/// A place belongs to the view only when every link matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    links: Vec<FilterCriteria>,
}

impl FilterChain {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self::default().then(criteria)
    }

    /// Chain of a view derived with `criteria` from this one.
    pub fn then(&self, criteria: FilterCriteria) -> Self {
        let mut links = self.links.clone();
        // Unrestricted links and repeats of the last link filter nothing
        if !criteria.is_unrestricted() && links.last() != Some(&criteria) {
            links.push(criteria);
        }
        Self { links }
    }

    pub fn links(&self) -> &[FilterCriteria] {
        &self.links
    }

    pub fn is_unrestricted(&self) -> bool {
        self.links.is_empty()
    }

    pub fn matches(&self, place: &Place) -> bool {
        self.links.iter().all(|criteria| criteria.matches(place))
    }

    pub fn apply(&self, places: &[Place]) -> Vec<Place> {
        places.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}
