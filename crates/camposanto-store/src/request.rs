//! Request and response shapes of the primary records fetch.

use chrono::NaiveDate;
use serde::Serialize;

use crate::entity::{CemeteryId, DeceasedRecord};

/// Inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortField {
    #[default]
    Name,
    DeathDate,
}

/// Ordering the store applies before paginating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreOrder {
    pub field: SortField,
    pub ascending: bool,
}

impl Default for StoreOrder {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            ascending: true,
        }
    }
}

/// One page worth of predicates for the records table.
///
/// All predicates are conjunctive; `None` means "do not filter on this".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeceasedPageRequest {
    /// Case-insensitive substring on the display name
    pub name_contains: Option<String>,
    pub death_date: Option<DateRange>,
    /// Records whose plot belongs, through block and sector, to this cemetery
    pub cemetery_id: Option<CemeteryId>,
    pub order: StoreOrder,
    pub offset: usize,
    pub limit: usize,
}

impl Default for DeceasedPageRequest {
    fn default() -> Self {
        Self {
            name_contains: None,
            death_date: None,
            cemetery_id: None,
            order: StoreOrder::default(),
            offset: 0,
            limit: 20,
        }
    }
}

impl DeceasedPageRequest {
    /// Same predicates, different window.
    #[must_use]
    pub fn window(&self, offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..self.clone()
        }
    }
}

/// A page of records plus the size of the full match set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeceasedPage {
    pub rows: Vec<DeceasedRecord>,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_is_inclusive() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let range = DateRange::new(from, to);

        assert!(range.contains(from));
        assert!(range.contains(to));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()));
    }

    #[test]
    fn test_window_keeps_predicates() {
        let request = DeceasedPageRequest {
            name_contains: Some("rossi".into()),
            cemetery_id: Some(4),
            ..Default::default()
        };
        let next = request.window(200, 50);

        assert_eq!(next.name_contains.as_deref(), Some("rossi"));
        assert_eq!(next.cemetery_id, Some(4));
        assert_eq!((next.offset, next.limit), (200, 50));
    }
}
