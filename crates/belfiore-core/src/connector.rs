//! Immutable, composable views over a shared places cache.
//!
//! A `BelfioreConnector` pairs a shared `PlacesCache` with one set of
//! `FilterCriteria`. Narrowing operations (`active`, `from`, `by_province`,
//! `cities`, `countries`) return new connectors over the same cache, so a
//! refresh triggered through any of them is seen by all the others. A
//! derived view keeps the criteria of its ancestors in a `FilterChain` and
//! only ever holds a subset of its parent's places.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::cache::{Clock, FilteredSnapshot, PlacesCache, PlacesRetriever};
use crate::error::ConnectorError;
use crate::filter::{FilterChain, FilterCriteria};
use crate::models::{is_place_code, is_province_code, CodeMatcher, Place};
use crate::utils::today;

/// Everything a connector can be built from.
///
/// At least one of `retriever` and `places` must be set. `expires_at` and
/// `lifetime_sec` only matter together with a retriever.
#[derive(Clone, Default)]
pub struct ConnectorOptions {
    pub retriever: Option<Arc<dyn PlacesRetriever>>,
    pub places: Option<Vec<Place>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub lifetime_sec: Option<u64>,
    pub code_matcher: Option<CodeMatcher>,
    pub province: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub clock: Option<Clock>,
}

impl ConnectorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retriever(mut self, retriever: impl PlacesRetriever + 'static) -> Self {
        self.retriever = Some(Arc::new(retriever));
        self
    }

    pub fn places(mut self, places: Vec<Place>) -> Self {
        self.places = Some(places);
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn lifetime_sec(mut self, secs: u64) -> Self {
        self.lifetime_sec = Some(secs);
        self
    }

    pub fn code_matcher(mut self, matcher: CodeMatcher) -> Self {
        self.code_matcher = Some(matcher);
        self
    }

    pub fn province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            code_matcher: self.code_matcher,
            province: self.province.clone(),
            from_date: self.from_date,
            to_date: self.to_date,
        }
    }
}

impl std::fmt::Debug for ConnectorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorOptions")
            .field("retriever", &self.retriever.is_some())
            .field("places", &self.places.as_ref().map(Vec::len))
            .field("expires_at", &self.expires_at)
            .field("lifetime_sec", &self.lifetime_sec)
            .field("code_matcher", &self.code_matcher)
            .field("province", &self.province)
            .field("from_date", &self.from_date)
            .field("to_date", &self.to_date)
            .finish()
    }
}

/// Handler for the cities and countries dataset.
/// Clone is cheap: the cache and the filtered snapshot are shared.
#[derive(Debug, Clone)]
pub struct BelfioreConnector {
    cache: Arc<PlacesCache>,
    criteria: FilterCriteria,
    chain: FilterChain,
    filtered: Arc<FilteredSnapshot>,
}

impl BelfioreConnector {
    /// Connector fetching places lazily from `retriever`.
    /// Any retriever or place list inside `options` is replaced by `retriever`.
    pub fn from_retriever(
        retriever: impl PlacesRetriever + 'static,
        options: ConnectorOptions,
    ) -> Result<Self, ConnectorError> {
        let options = ConnectorOptions {
            retriever: Some(Arc::new(retriever)),
            places: None,
            ..options
        };
        Self::with_options(options)
    }

    /// Connector over a fixed list of places, never refreshed.
    pub fn from_places(
        places: Vec<Place>,
        options: ConnectorOptions,
    ) -> Result<Self, ConnectorError> {
        let options = ConnectorOptions {
            retriever: None,
            places: Some(places),
            expires_at: None,
            lifetime_sec: None,
            ..options
        };
        Self::with_options(options)
    }

    /// Connector from a full options set.
    pub fn with_options(options: ConnectorOptions) -> Result<Self, ConnectorError> {
        let criteria = options.criteria();
        criteria.validate()?;

        let cache = match (options.retriever, options.places) {
            (Some(retriever), places) => PlacesCache::with_retriever(
                retriever,
                options.lifetime_sec,
                places,
                options.expires_at,
            ),
            (None, Some(places)) => PlacesCache::from_places(places),
            (None, None) => return Err(ConnectorError::MissingSource),
        };
        let cache = match options.clock {
            Some(clock) => cache.with_clock(clock),
            None => cache,
        };

        debug!(?criteria, ?cache, "Connector created");
        Ok(Self {
            cache: Arc::new(cache),
            chain: FilterChain::new(criteria.clone()),
            criteria,
            filtered: Arc::new(FilteredSnapshot::new()),
        })
    }

    /// New view over the same cache, narrowed further by `criteria`.
    fn derive(&self, criteria: FilterCriteria) -> Self {
        debug_assert!(criteria.validate().is_ok(), "derived criteria must be valid");
        Self {
            cache: Arc::clone(&self.cache),
            chain: self.chain.then(criteria.clone()),
            criteria,
            filtered: Arc::new(FilteredSnapshot::new()),
        }
    }

    /// Criteria this view was created or derived with.
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Criteria of this view and all its ancestors.
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn cache(&self) -> &Arc<PlacesCache> {
        &self.cache
    }

    /// True when both connectors read from the same cache.
    pub fn shares_cache_with(&self, other: &BelfioreConnector) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }

    async fn places(&self) -> Result<Arc<[Place]>, ConnectorError> {
        self.filtered.places(&self.cache, &self.chain).await
    }

    // ===== Derived views =====

    /// Places active on `date`: created on or before it and expired on or after it.
    pub fn active(&self, date: NaiveDate) -> Self {
        self.derive(FilterCriteria {
            from_date: Some(date),
            to_date: Some(date),
            ..self.criteria.clone()
        })
    }

    /// Places active today.
    pub fn active_today(&self) -> Self {
        self.active(today())
    }

    /// Places created on or before `date`, keeping any upper date bound.
    /// Places outside the parent's date window stay excluded.
    pub fn from(&self, date: NaiveDate) -> Self {
        self.derive(FilterCriteria {
            from_date: Some(date),
            ..self.criteria.clone()
        })
    }

    /// Places created on or before today, keeping any upper date bound.
    pub fn from_today(&self) -> Self {
        self.from(today())
    }

    /// Places of this view in the given province.
    /// Returns `None` unless `code` is two uppercase letters.
    /// The new criteria drop any city/country matcher.
    pub fn by_province(&self, code: &str) -> Option<Self> {
        if !is_province_code(code) {
            return None;
        }
        Some(self.derive(FilterCriteria {
            code_matcher: None,
            province: Some(code.to_string()),
            ..self.criteria.clone()
        }))
    }

    /// Cities of this view. `None` if this view is restricted to countries.
    /// The new criteria drop any province.
    pub fn cities(&self) -> Option<Self> {
        self.with_kind(CodeMatcher::City)
    }

    /// Countries only. `None` if this view is restricted to cities or to a
    /// province, since countries have no province.
    pub fn countries(&self) -> Option<Self> {
        if self.criteria.province.is_some() {
            return None;
        }
        self.with_kind(CodeMatcher::Country)
    }

    fn with_kind(&self, matcher: CodeMatcher) -> Option<Self> {
        if matches!(self.criteria.code_matcher, Some(current) if current != matcher) {
            return None;
        }
        Some(self.derive(FilterCriteria {
            code_matcher: Some(matcher),
            province: None,
            ..self.criteria.clone()
        }))
    }

    // ===== Queries =====

    /// Every place of this view, as owned copies.
    pub async fn to_vec(&self) -> Result<Vec<Place>, ConnectorError> {
        Ok(self.places().await?.to_vec())
    }

    /// Number of places in this view.
    pub async fn len(&self) -> Result<usize, ConnectorError> {
        Ok(self.places().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, ConnectorError> {
        Ok(self.len().await? == 0)
    }

    /// Province codes present in this view, sorted and without duplicates.
    /// A view fixed to one province reports it without retrieving.
    pub async fn provinces(&self) -> Result<Vec<String>, ConnectorError> {
        let links = self.chain.links();
        if links
            .iter()
            .any(|c| c.code_matcher == Some(CodeMatcher::Country))
        {
            return Ok(Vec::new());
        }
        // Known without retrieval once a province is fixed somewhere in the chain
        let mut fixed = links.iter().filter_map(|c| c.province.as_deref());
        if let Some(province) = fixed.next() {
            if fixed.all(|other| other == province) {
                return Ok(vec![province.to_string()]);
            }
            return Ok(Vec::new());
        }

        let places = self.places().await?;
        let provinces: BTreeSet<&str> = places
            .iter()
            .filter_map(|p| p.province.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(provinces.into_iter().map(str::to_string).collect())
    }

    /// Places whose name contains `name`, ignoring case.
    /// Returns `None` for an empty search.
    pub async fn search_by_name(&self, name: &str) -> Result<Option<Vec<Place>>, ConnectorError> {
        if name.is_empty() {
            return Ok(None);
        }
        let needle = name.to_lowercase();
        let places = self.places().await?;
        Ok(Some(
            places
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        ))
    }

    /// First place named exactly `name`, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Place>, ConnectorError> {
        if name.is_empty() {
            return Ok(None);
        }
        let wanted = name.to_lowercase();
        let places = self.places().await?;
        Ok(places.iter().find(|p| p.name.to_lowercase() == wanted).cloned())
    }

    /// Place with the given Belfiore code, ignoring case.
    /// Returns `None` without querying when `code` is not a valid place code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Place>, ConnectorError> {
        if !is_place_code(code) {
            return Ok(None);
        }
        let places = self.places().await?;
        Ok(places.iter().find(|p| p.code.eq_ignore_ascii_case(code)).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================
