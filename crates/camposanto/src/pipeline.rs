//! One search, start to finish.
//!
//! [`search_page`] chains the records fetch, location resolution and the
//! cemetery filter and sort into a single page of display-ready records. It
//! holds no state, so it can be called directly for one-shot searches; the
//! [`SearchCoordinator`](crate::SearchCoordinator) wraps it with debouncing
//! and published state.

use camposanto_store::RecordStore;
use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::{
    config::PipelineConfig,
    error::Result,
    filter::{apply_cemetery_filtering, apply_cemetery_sorting},
    query::{Pagination, RecordQuery, SearchParams},
    resolve::{ResolvedRecord, resolve_locations},
};

/// A page of resolved records and the size of the set it was taken from.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub records: Vec<ResolvedRecord>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl SearchPage {
    fn new(records: Vec<ResolvedRecord>, total_count: usize, pagination: Pagination) -> Self {
        Self {
            records,
            total_count,
            page: pagination.page,
            page_size: pagination.page_size,
        }
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_count, self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// Run one search and return the requested page.
///
/// A failed records fetch is returned as an error. Failed location lookups
/// are not: the affected records come back partially resolved.
///
/// A selected cemetery id is part of the store request, so the page and its
/// `total_count` always come from the store in that case.
///
/// When the cemetery is selected by name only, matching happens after
/// resolution, so the store cannot paginate for us. In that case the whole
/// match set is scanned in batches (bounded by
/// [`PipelineConfig::max_scan_rows`]) and `total_count` counts the records
/// that passed the name match.
#[instrument(
    name = "Search Page",
    level = "debug",
    skip_all,
    fields(
        term = %params.search_term,
        filter = %params.filter_by,
        sort = %params.sort_by,
        page = params.page
    )
)]
pub async fn search_page<S>(
    store: &S,
    params: &SearchParams,
    today: NaiveDate,
    config: &PipelineConfig,
) -> Result<SearchPage>
where
    S: RecordStore + ?Sized,
{
    let query = RecordQuery::new(params, today, config);
    if let Some(name) = params.fuzzy_cemetery_name() {
        return scan_by_cemetery_name(store, &query, params, name, config).await;
    }

    let page = query.execute(store).await?;
    let resolved = resolve_locations(store, page.rows).await;
    // A selected cemetery id was already evaluated by the store. Rows whose
    // location could not be resolved stay on the page.
    let records = apply_cemetery_sorting(resolved, params.sort_by);

    debug!(
        returned = records.len(),
        total_count = page.total_count,
        "Search page ready"
    );
    Ok(SearchPage::new(records, page.total_count, query.pagination()))
}

async fn scan_by_cemetery_name<S>(
    store: &S,
    query: &RecordQuery,
    params: &SearchParams,
    cemetery_name: &str,
    config: &PipelineConfig,
) -> Result<SearchPage>
where
    S: RecordStore + ?Sized,
{
    let mut matched = Vec::new();
    let mut offset = 0;

    loop {
        if offset >= config.max_scan_rows {
            warn!(
                scanned = offset,
                limit = config.max_scan_rows,
                "Stopped cemetery name scan at the configured limit"
            );
            break;
        }
        let limit = config
            .scan_batch_size
            .min(config.max_scan_rows.saturating_sub(offset));
        let batch = query.execute_window(store, offset, limit).await?;
        let fetched = batch.rows.len();

        let resolved = resolve_locations(store, batch.rows).await;
        matched.extend(apply_cemetery_filtering(resolved, None, Some(cemetery_name)));

        offset += fetched;
        if fetched < limit || offset >= batch.total_count {
            break;
        }
    }

    let matched = apply_cemetery_sorting(matched, params.sort_by);
    let total_count = matched.len();
    let pagination = query.pagination();
    let records = matched
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.page_size)
        .collect::<Vec<_>>();

    debug!(
        scanned = offset,
        matched = total_count,
        returned = records.len(),
        "Cemetery name scan complete"
    );
    Ok(SearchPage::new(records, total_count, pagination))
}

#[cfg(test)]
mod tests {
    use camposanto_store::{DeceasedRecord, InMemoryStore, Table, sample_store};

    use super::*;
    use crate::{
        error::CamposantoError,
        query::{FilterMode, QueryError, SortKey},
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn names(page: &SearchPage) -> Vec<&str> {
        page.records
            .iter()
            .map(|r| r.record.full_name.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_plain_search_uses_server_count() {
        let store = sample_store().unwrap();
        let page = search_page(
            &store,
            &SearchParams::default().page_size(3),
            today(),
            &PipelineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_count, 7);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(names(&page), vec!["Anna Ferrari", "Giulia Bianchi", "Luca Verdi"]);
    }

    #[tokio::test]
    async fn test_cemetery_sort_within_page() {
        let store = sample_store().unwrap();
        let params = SearchParams::default().sort_by(SortKey::CemeteryDesc);
        let page = search_page(&store, &params, today(), &PipelineConfig::default())
            .await
            .unwrap();

        let cemeteries = page
            .records
            .iter()
            .map(|r| r.cemetery_name().unwrap_or_default().to_lowercase())
            .collect::<Vec<_>>();
        let mut expected = cemeteries.clone();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(cemeteries, expected);
    }

    #[tokio::test]
    async fn test_fuzzy_name_counts_filtered_set() {
        let store = sample_store().unwrap();
        let config = PipelineConfig::builder().scan_limits(2, 100).unwrap().build();
        let params = SearchParams::default().cemetery_name("Cimitero di Rma");
        let page = search_page(&store, &params, today(), &config).await.unwrap();

        assert!(page.records.iter().all(|r| r.cemetery_id() == Some(1)));
        assert_eq!(page.total_count, page.records.len());
        assert!(page.total_count > 0);
        // The whole table was scanned two rows at a time.
        assert_eq!(store.fetch_count(Table::Deceased), 4);
    }

    #[tokio::test]
    async fn test_fuzzy_scan_paginates_client_side() {
        let rows = (1..=5).map(|i| DeceasedRecord::new(i, format!("Nome {i}")).with_plot(1));
        let store = InMemoryStore::builder()
            .deceased(rows)
            .plots([camposanto_store::Plot {
                id: 1,
                number: None,
                row: None,
                block_ref: Some(1),
            }])
            .blocks([camposanto_store::Block {
                id: 1,
                name: "A".into(),
                sector_ref: Some(1),
            }])
            .sectors([camposanto_store::Sector {
                id: 1,
                name: "Nord".into(),
                cemetery_ref: Some(1),
            }])
            .cemeteries([camposanto_store::Cemetery {
                id: 1,
                name: "Verano".into(),
            }])
            .build();
        let params = SearchParams::default()
            .cemetery_name("verano")
            .page(2)
            .page_size(2);
        let page = search_page(&store, &params, today(), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(names(&page), vec!["Nome 3", "Nome 4"]);
        assert_eq!((page.total_count, page.total_pages()), (5, 3));
    }

    #[tokio::test]
    async fn test_scan_stops_at_limit() {
        let rows = (1..=10).map(|i| DeceasedRecord::new(i, format!("Nome {i:02}")));
        let store = InMemoryStore::builder().deceased(rows).build();
        let config = PipelineConfig::builder().scan_limits(3, 4).unwrap().build();
        let params = SearchParams::default().cemetery_name("Verano");
        let page = search_page(&store, &params, today(), &config).await.unwrap();

        assert!(page.is_empty());
        let windows = store
            .requests()
            .iter()
            .map(|r| (r.offset, r.limit))
            .collect::<Vec<_>>();
        assert_eq!(windows, vec![(0, 3), (3, 1)]);
    }

    #[tokio::test]
    async fn test_primary_failure_is_an_error() {
        let store = sample_store().unwrap();
        store.set_failing(Table::Deceased, true);
        let err = search_page(
            &store,
            &SearchParams::default().filter_by(FilterMode::Recent),
            today(),
            &PipelineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CamposantoError::QueryError(QueryError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_cemetery_id_keeps_rows_when_lookups_fail() {
        let store = sample_store().unwrap();
        store.set_failing(Table::Sectors, true);
        let params = SearchParams::default().cemetery_id(1);
        let page = search_page(&store, &params, today(), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(page.total_count, 3);
        assert_eq!(names(&page), vec!["Giulia Bianchi", "Luca Verdi", "Mario Rossi"]);
        assert!(page.records.iter().all(|r| r.cemetery_name().is_none()));
        assert!(
            page.records
                .iter()
                .all(|r| r.location.block_name.is_some())
        );
    }

    #[tokio::test]
    async fn test_second_page_of_forty_five() {
        let rows = (1..=45).map(|i| DeceasedRecord::new(i, format!("Defunto {i:02}")));
        let store = InMemoryStore::builder().deceased(rows).build();
        let params = SearchParams::default().page(2).page_size(20);
        let page = search_page(&store, &params, today(), &PipelineConfig::default())
            .await
            .unwrap();

        let ids = page.records.iter().map(|r| r.record.id).collect::<Vec<_>>();
        assert_eq!(ids, (21..=40).collect::<Vec<_>>());
        assert_eq!(page.total_count, 45);
        assert_eq!(page.total_pages(), 3);
        assert_eq!((page.page, page.page_size), (2, 20));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(5, 0), 0);
    }
}
