//! The primary records fetch.
//!
//! Turns the caller's [`SearchParams`] into a [`DeceasedPageRequest`] the store
//! can evaluate on its own: name search, death-date window, direct cemetery
//! filter when the cemetery identity is known, ordering and pagination.

use std::{fmt, str::FromStr};

use camposanto_store::{
    CemeteryId, DateRange, DeceasedPage, DeceasedPageRequest, RecordStore, SortField, StoreError,
    StoreOrder,
};
use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, instrument};

use crate::config::PipelineConfig;

pub use error::QueryError;

/// Death-date / cemetery restriction chosen in the filter menu.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    All,
    /// Died within the configured window ending today
    Recent,
    /// Died in the current calendar year
    ThisYear,
    ByCemetery,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Recent => "recent",
            Self::ThisYear => "this-year",
            Self::ByCemetery => "by-cemetery",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "recent" => Ok(Self::Recent),
            "this-year" => Ok(Self::ThisYear),
            "by-cemetery" => Ok(Self::ByCemetery),
            other => Err(QueryError::InvalidFilterMode(other.to_string())),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    CemeteryAsc,
    CemeteryDesc,
    DeathDateAsc,
    DeathDateDesc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::CemeteryAsc => "cemetery-asc",
            Self::CemeteryDesc => "cemetery-desc",
            Self::DeathDateAsc => "date-asc",
            Self::DeathDateDesc => "date-desc",
        }
    }

    /// Ordering the store applies. Cemetery names are not known to the store,
    /// so cemetery keys fall back to name order and are sorted after resolution.
    pub fn store_order(self) -> StoreOrder {
        let (field, ascending) = match self {
            Self::NameAsc | Self::CemeteryAsc | Self::CemeteryDesc => (SortField::Name, true),
            Self::NameDesc => (SortField::Name, false),
            Self::DeathDateAsc => (SortField::DeathDate, true),
            Self::DeathDateDesc => (SortField::DeathDate, false),
        };
        StoreOrder { field, ascending }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            "cemetery-asc" => Ok(Self::CemeteryAsc),
            "cemetery-desc" => Ok(Self::CemeteryDesc),
            "date-asc" => Ok(Self::DeathDateAsc),
            "date-desc" => Ok(Self::DeathDateDesc),
            other => Err(QueryError::InvalidSortKey(other.to_string())),
        }
    }
}

/// Everything the search screen controls, captured for one run.
///
/// A fresh value is passed on every call; nothing here is shared between
/// callers.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub search_term: String,
    pub sort_by: SortKey,
    pub filter_by: FilterMode,
    pub selected_cemetery_name: Option<String>,
    pub selected_cemetery_id: Option<CemeteryId>,
    /// 1-indexed
    pub page: usize,
    pub page_size: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_by: SortKey::default(),
            filter_by: FilterMode::default(),
            selected_cemetery_name: None,
            selected_cemetery_id: None,
            page: 1,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchParams {
    pub fn new(search_term: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            ..Self::default()
        }
    }

    pub fn search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn sort_by(mut self, sort: SortKey) -> Self {
        self.sort_by = sort;
        self
    }

    pub fn filter_by(mut self, filter: FilterMode) -> Self {
        self.filter_by = filter;
        self
    }

    /// Filter by cemetery name, matched fuzzily after resolution
    pub fn cemetery_name(mut self, name: impl Into<String>) -> Self {
        self.filter_by = FilterMode::ByCemetery;
        self.selected_cemetery_name = Some(name.into());
        self
    }

    /// Filter by cemetery identity, evaluated by the store
    pub fn cemetery_id(mut self, id: CemeteryId) -> Self {
        self.filter_by = FilterMode::ByCemetery;
        self.selected_cemetery_id = Some(id);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Cemetery identity to filter on, if the cemetery filter is active.
    pub fn cemetery_id_filter(&self) -> Option<CemeteryId> {
        (self.filter_by == FilterMode::ByCemetery)
            .then_some(self.selected_cemetery_id)
            .flatten()
    }

    /// Cemetery name to match fuzzily: only when the filter is active and no
    /// identity is known.
    pub fn fuzzy_cemetery_name(&self) -> Option<&str> {
        if self.cemetery_id_filter().is_some() || self.filter_by != FilterMode::ByCemetery {
            return None;
        }
        self.selected_cemetery_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Normalised 1-indexed page window.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Page 0 becomes 1, size 0 becomes the configured default, and sizes are
    /// capped at the configured maximum.
    pub fn new(page: usize, page_size: usize, config: &PipelineConfig) -> Self {
        let page_size = match page_size {
            0 => config.default_page_size,
            n => n.min(config.max_page_size),
        };
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total_count: usize) -> usize {
        total_count.div_ceil(self.page_size)
    }
}

/// Death-date range for a filter mode, relative to `today`.
pub fn death_date_window(
    filter: FilterMode,
    today: NaiveDate,
    recent_window_days: u64,
) -> Option<DateRange> {
    match filter {
        FilterMode::Recent => {
            let from = today
                .checked_sub_days(Days::new(recent_window_days))
                .unwrap_or(NaiveDate::MIN);
            Some(DateRange::new(from, today))
        }
        FilterMode::ThisYear => {
            let from = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
            let to = NaiveDate::from_ymd_opt(today.year(), 12, 31)?;
            Some(DateRange::new(from, to))
        }
        FilterMode::All | FilterMode::ByCemetery => None,
    }
}

/// The primary fetch for one set of [`SearchParams`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    request: DeceasedPageRequest,
    pagination: Pagination,
}

impl RecordQuery {
    pub fn new(params: &SearchParams, today: NaiveDate, config: &PipelineConfig) -> Self {
        let pagination = Pagination::new(params.page, params.page_size, config);
        let term = params.search_term.trim();
        let request = DeceasedPageRequest {
            name_contains: (!term.is_empty()).then(|| term.to_string()),
            death_date: death_date_window(params.filter_by, today, config.recent_window_days),
            cemetery_id: params.cemetery_id_filter(),
            order: params.sort_by.store_order(),
            offset: pagination.offset(),
            limit: pagination.page_size,
        };
        Self {
            request,
            pagination,
        }
    }

    pub fn request(&self) -> &DeceasedPageRequest {
        &self.request
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Fetch the requested page.
    #[instrument(name = "Record Query", level = "debug", skip_all, fields(offset = self.request.offset, limit = self.request.limit))]
    pub async fn execute<S>(&self, store: &S) -> Result<DeceasedPage, QueryError>
    where
        S: RecordStore + ?Sized,
    {
        let page = store.fetch_deceased_page(&self.request).await?;
        debug!(
            rows = page.rows.len(),
            total_count = page.total_count,
            "Fetched records page"
        );
        Ok(page)
    }

    /// Fetch an arbitrary window with the same predicates and ordering.
    pub async fn execute_window<S>(
        &self,
        store: &S,
        offset: usize,
        limit: usize,
    ) -> Result<DeceasedPage, QueryError>
    where
        S: RecordStore + ?Sized,
    {
        Ok(store
            .fetch_deceased_page(&self.request.window(offset, limit))
            .await?)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum QueryError {
        #[error("Unknown filter mode: '{0}'")]
        InvalidFilterMode(String),
        #[error("Unknown sort key: '{0}'")]
        InvalidSortKey(String),
        #[error("Records fetch failed: {0}")]
        Fetch(#[from] super::StoreError),
    }
}

#[cfg(test)]
mod tests {
    use camposanto_store::{DeceasedRecord, InMemoryStore, Table};

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_ui_strings() {
        assert_eq!("recent".parse::<FilterMode>().unwrap(), FilterMode::Recent);
        assert_eq!(
            "by-cemetery".parse::<FilterMode>().unwrap(),
            FilterMode::ByCemetery
        );
        assert_eq!(
            "cemetery-desc".parse::<SortKey>().unwrap(),
            SortKey::CemeteryDesc
        );
        assert!(matches!(
            "yesterday".parse::<FilterMode>(),
            Err(QueryError::InvalidFilterMode(_))
        ));
        assert!(matches!(
            "size-asc".parse::<SortKey>(),
            Err(QueryError::InvalidSortKey(_))
        ));
        for key in [SortKey::NameDesc, SortKey::DeathDateAsc] {
            assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_recent_window() {
        let window = death_date_window(FilterMode::Recent, day(2024, 6, 15), 30).unwrap();
        assert!(window.contains(day(2024, 6, 1)));
        assert!(window.contains(day(2024, 5, 16)));
        assert!(!window.contains(day(2024, 5, 15)));
        assert!(!window.contains(day(2024, 1, 1)));
    }

    #[test]
    fn test_this_year_window() {
        let window = death_date_window(FilterMode::ThisYear, day(2024, 6, 15), 30).unwrap();
        assert_eq!(window, DateRange::new(day(2024, 1, 1), day(2024, 12, 31)));
        assert!(death_date_window(FilterMode::All, day(2024, 6, 15), 30).is_none());
    }

    #[test]
    fn test_pagination_normalisation() {
        let config = PipelineConfig::default();
        let p = Pagination::new(2, 20, &config);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.total_pages(45), 3);
        assert_eq!(p.total_pages(0), 0);

        assert_eq!(Pagination::new(0, 0, &config), Pagination {
            page: 1,
            page_size: 20
        });
        assert_eq!(Pagination::new(1, 10_000, &config).page_size, 200);
    }

    #[test]
    fn test_request_building() {
        let config = PipelineConfig::default();
        let params = SearchParams::new("  rossi ")
            .filter_by(FilterMode::Recent)
            .sort_by(SortKey::CemeteryDesc)
            .page(3)
            .page_size(10);
        let query = RecordQuery::new(&params, day(2024, 6, 15), &config);
        let request = query.request();

        assert_eq!(request.name_contains.as_deref(), Some("rossi"));
        assert_eq!(request.death_date.unwrap().from, day(2024, 5, 16));
        assert_eq!(request.cemetery_id, None);
        assert_eq!(request.order, StoreOrder::default());
        assert_eq!((request.offset, request.limit), (20, 10));
    }

    #[test]
    fn test_cemetery_selection() {
        let by_id = SearchParams::default().cemetery_name("Verano").cemetery_id(4);
        assert_eq!(by_id.cemetery_id_filter(), Some(4));
        assert_eq!(by_id.fuzzy_cemetery_name(), None);

        let by_name = SearchParams::default().cemetery_name("Verano");
        assert_eq!(by_name.fuzzy_cemetery_name(), Some("Verano"));

        let blank = SearchParams::default().cemetery_name("   ");
        assert_eq!(blank.fuzzy_cemetery_name(), None);

        // Selection is ignored unless the cemetery filter is active.
        let inactive = SearchParams::default()
            .cemetery_id(4)
            .filter_by(FilterMode::All);
        assert_eq!(inactive.cemetery_id_filter(), None);
        let query = RecordQuery::new(&inactive, day(2024, 6, 15), &PipelineConfig::default());
        assert_eq!(query.request().cemetery_id, None);
    }

    #[tokio::test]
    async fn test_execute_surfaces_store_failure() {
        let store = InMemoryStore::builder()
            .deceased([DeceasedRecord::new(1, "Uno")])
            .failing(Table::Deceased)
            .build();
        let query = RecordQuery::new(
            &SearchParams::default(),
            day(2024, 6, 15),
            &PipelineConfig::default(),
        );
        let result = query.execute(&store).await;
        assert!(matches!(result, Err(QueryError::Fetch(_))));
    }
}
