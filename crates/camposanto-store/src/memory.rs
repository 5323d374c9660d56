//! In-memory [`RecordStore`].
//!
//! Evaluates the full request contract over plain tables. Used for fixtures,
//! demos and tests; it can also simulate slow or unavailable tables so the
//! degradation paths of the pipeline can be exercised.

use std::{
    cmp::Ordering,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
    time::Duration,
};

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::{
    Result, StoreError,
    entity::{Block, BlockId, Cemetery, CemeteryId, DeceasedRecord, Plot, PlotId, Sector, SectorId},
    raw::normalize_rows,
    request::{DeceasedPage, DeceasedPageRequest, SortField, StoreOrder},
    store::{RecordStore, Table},
};

const TABLES: [Table; 5] = [
    Table::Deceased,
    Table::Plots,
    Table::Blocks,
    Table::Sectors,
    Table::Cemeteries,
];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    deceased: Vec<DeceasedRecord>,
    plots: HashMap<PlotId, Plot>,
    blocks: HashMap<BlockId, Block>,
    sectors: HashMap<SectorId, Sector>,
    cemeteries: HashMap<CemeteryId, Cemetery>,
    latency: Option<Duration>,
    failing: Mutex<HashSet<Table>>,
    fetches: [AtomicUsize; 5],
    requests: Mutex<Vec<DeceasedPageRequest>>,
}

impl InMemoryStore {
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Load a store from a JSON document with one array per table.
    ///
    /// Keys are `deceased`, `plots`, `blocks`, `sectors` and `cemeteries`;
    /// missing keys are empty tables. Rows go through the boundary adapter, so
    /// any of the known row shapes is accepted.
    pub fn from_json(mut document: Value) -> Result<Self> {
        let mut take = |key: &str| match document.get_mut(key).map(Value::take) {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        };
        let deceased: Vec<DeceasedRecord> = normalize_rows(take("deceased"))?;
        let plots: Vec<Plot> = normalize_rows(take("plots"))?;
        let blocks: Vec<Block> = normalize_rows(take("blocks"))?;
        let sectors: Vec<Sector> = normalize_rows(take("sectors"))?;
        let cemeteries: Vec<Cemetery> = normalize_rows(take("cemeteries"))?;

        Ok(Self::builder()
            .deceased(deceased)
            .plots(plots)
            .blocks(blocks)
            .sectors(sectors)
            .cemeteries(cemeteries)
            .build())
    }

    /// Make every fetch against `table` fail (or succeed again).
    pub fn set_failing(&self, table: Table, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(table);
        } else {
            set.remove(&table);
        }
    }

    /// Number of fetches issued against `table`, failed ones included.
    pub fn fetch_count(&self, table: Table) -> usize {
        self.fetches[Self::slot(table)].load(AtomicOrdering::SeqCst)
    }

    /// Every primary request received so far, oldest first.
    pub fn requests(&self) -> Vec<DeceasedPageRequest> {
        lock(&self.requests).clone()
    }

    pub fn len(&self) -> usize {
        self.deceased.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deceased.is_empty()
    }

    fn slot(table: Table) -> usize {
        TABLES.iter().position(|t| *t == table).unwrap_or_default()
    }

    async fn begin_fetch(&self, table: Table) -> Result<()> {
        self.fetches[Self::slot(table)].fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if lock(&self.failing).contains(&table) {
            return Err(StoreError::Unavailable {
                table,
                reason: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn cemetery_of(&self, record: &DeceasedRecord) -> Option<CemeteryId> {
        let plot = self.plots.get(&record.plot_ref?)?;
        let block = self.blocks.get(&plot.block_ref?)?;
        let sector = self.sectors.get(&block.sector_ref?)?;
        sector.cemetery_ref
    }

    fn matches(
        &self,
        record: &DeceasedRecord,
        request: &DeceasedPageRequest,
        needle: Option<&str>,
    ) -> bool {
        if let Some(needle) = needle {
            if !record.full_name.to_lowercase().contains(needle) {
                return false;
            }
        }
        if let Some(range) = request.death_date {
            if !record.death_date.is_some_and(|d| range.contains(d)) {
                return false;
            }
        }
        if let Some(cemetery_id) = request.cemetery_id {
            if self.cemetery_of(record) != Some(cemetery_id) {
                return false;
            }
        }
        true
    }
}

fn compare(a: &DeceasedRecord, b: &DeceasedRecord, order: StoreOrder) -> Ordering {
    let primary = match order.field {
        SortField::Name => a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()),
        SortField::DeathDate => a.death_date.cmp(&b.death_date),
    };
    let primary = if order.ascending {
        primary
    } else {
        primary.reverse()
    };
    primary.then(a.id.cmp(&b.id))
}

fn by_ids<K, T>(table: &HashMap<K, T>, ids: &[K]) -> Vec<T>
where
    K: std::hash::Hash + Eq,
    T: Clone,
{
    ids.iter().filter_map(|id| table.get(id).cloned()).collect()
}

#[async_trait]
impl RecordStore for InMemoryStore {
    #[instrument(level = "trace", skip(self))]
    async fn fetch_deceased_page(&self, request: &DeceasedPageRequest) -> Result<DeceasedPage> {
        lock(&self.requests).push(request.clone());
        self.begin_fetch(Table::Deceased).await?;

        let needle = request
            .name_contains
            .as_deref()
            .map(str::to_lowercase);
        let mut matches = self
            .deceased
            .iter()
            .filter(|r| self.matches(r, request, needle.as_deref()))
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| compare(a, b, request.order));

        let total_count = matches.len();
        let rows = matches
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .cloned()
            .collect::<Vec<_>>();
        trace!(total_count, returned = rows.len(), "Evaluated records page");
        Ok(DeceasedPage { rows, total_count })
    }

    async fn fetch_plots_by_ids(&self, ids: &[PlotId]) -> Result<Vec<Plot>> {
        self.begin_fetch(Table::Plots).await?;
        Ok(by_ids(&self.plots, ids))
    }

    async fn fetch_blocks_by_ids(&self, ids: &[BlockId]) -> Result<Vec<Block>> {
        self.begin_fetch(Table::Blocks).await?;
        Ok(by_ids(&self.blocks, ids))
    }

    async fn fetch_sectors_by_ids(&self, ids: &[SectorId]) -> Result<Vec<Sector>> {
        self.begin_fetch(Table::Sectors).await?;
        Ok(by_ids(&self.sectors, ids))
    }

    async fn fetch_cemeteries_by_ids(&self, ids: &[CemeteryId]) -> Result<Vec<Cemetery>> {
        self.begin_fetch(Table::Cemeteries).await?;
        Ok(by_ids(&self.cemeteries, ids))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    store: InMemoryStore,
}

impl InMemoryStoreBuilder {
    pub fn deceased(mut self, rows: impl IntoIterator<Item = DeceasedRecord>) -> Self {
        self.store.deceased.extend(rows);
        self
    }

    pub fn plots(mut self, rows: impl IntoIterator<Item = Plot>) -> Self {
        self.store.plots.extend(rows.into_iter().map(|p| (p.id, p)));
        self
    }

    pub fn blocks(mut self, rows: impl IntoIterator<Item = Block>) -> Self {
        self.store.blocks.extend(rows.into_iter().map(|b| (b.id, b)));
        self
    }

    pub fn sectors(mut self, rows: impl IntoIterator<Item = Sector>) -> Self {
        self.store.sectors.extend(rows.into_iter().map(|s| (s.id, s)));
        self
    }

    pub fn cemeteries(mut self, rows: impl IntoIterator<Item = Cemetery>) -> Self {
        self.store
            .cemeteries
            .extend(rows.into_iter().map(|c| (c.id, c)));
        self
    }

    /// Delay every fetch by `latency`.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.store.latency = Some(latency);
        self
    }

    pub fn failing(self, table: Table) -> Self {
        self.store.set_failing(table, true);
        self
    }

    pub fn build(self) -> InMemoryStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::request::DateRange;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> InMemoryStore {
        InMemoryStore::builder()
            .deceased([
                DeceasedRecord::new(1, "Carla Neri").with_plot(10),
                DeceasedRecord::new(2, "anna Rossi").with_death_date(day(2024, 6, 1)),
                DeceasedRecord::new(3, "Bruno Rossi")
                    .with_plot(11)
                    .with_death_date(day(2024, 1, 1)),
            ])
            .plots([
                Plot {
                    id: 10,
                    number: Some("4".into()),
                    row: None,
                    block_ref: Some(20),
                },
                Plot {
                    id: 11,
                    number: None,
                    row: None,
                    block_ref: Some(21),
                },
            ])
            .blocks([
                Block {
                    id: 20,
                    name: "A".into(),
                    sector_ref: Some(30),
                },
                Block {
                    id: 21,
                    name: "B".into(),
                    sector_ref: None,
                },
            ])
            .sectors([Sector {
                id: 30,
                name: "Nord".into(),
                cemetery_ref: Some(40),
            }])
            .cemeteries([Cemetery {
                id: 40,
                name: "Verano".into(),
            }])
            .build()
    }

    fn names(page: &DeceasedPage) -> Vec<&str> {
        page.rows.iter().map(|r| r.full_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_orders_case_insensitively_by_name() {
        let page = store()
            .fetch_deceased_page(&DeceasedPageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["anna Rossi", "Bruno Rossi", "Carla Neri"]);
        assert_eq!(page.total_count, 3);
    }

    #[tokio::test]
    async fn test_predicates_and_window() {
        let store = store();
        let request = DeceasedPageRequest {
            name_contains: Some("ROSSI".into()),
            order: StoreOrder {
                field: SortField::Name,
                ascending: false,
            },
            offset: 1,
            limit: 5,
            ..Default::default()
        };
        let page = store.fetch_deceased_page(&request).await.unwrap();
        assert_eq!(names(&page), vec!["anna Rossi"]);
        assert_eq!(page.total_count, 2);

        let request = DeceasedPageRequest {
            death_date: Some(DateRange::new(day(2024, 5, 16), day(2024, 6, 15))),
            ..Default::default()
        };
        let page = store.fetch_deceased_page(&request).await.unwrap();
        assert_eq!(names(&page), vec!["anna Rossi"]);

        assert_eq!(store.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_cemetery_predicate_walks_the_plot_chain() {
        let request = DeceasedPageRequest {
            cemetery_id: Some(40),
            ..Default::default()
        };
        let page = store().fetch_deceased_page(&request).await.unwrap();
        // Bruno's block has no sector, so only Carla reaches the cemetery.
        assert_eq!(names(&page), vec!["Carla Neri"]);
    }

    #[tokio::test]
    async fn test_lookups_return_existing_subset() {
        let store = store();
        let plots = store.fetch_plots_by_ids(&[10, 99]).await.unwrap();
        assert_eq!(plots.len(), 1);
        assert_eq!(store.fetch_count(Table::Plots), 1);
        assert_eq!(store.fetch_count(Table::Blocks), 0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = store();
        store.set_failing(Table::Sectors, true);
        let err = store.fetch_sectors_by_ids(&[30]).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable {
                table: Table::Sectors,
                ..
            }
        ));

        store.set_failing(Table::Sectors, false);
        assert_eq!(store.fetch_sectors_by_ids(&[30]).await.unwrap().len(), 1);
        assert_eq!(store.fetch_count(Table::Sectors), 2);
    }

    #[tokio::test]
    async fn test_from_json() {
        let store = InMemoryStore::from_json(json!({
            "deceased": [{"ID": 1, "NOMINATIVO": "Ada Galli", "LOCULO_ID": "7"}],
            "plots": [{"id": 7, "numero": 3, "blocco_id": 2}],
        }))
        .unwrap();
        assert_eq!(store.len(), 1);

        let plots = store.fetch_plots_by_ids(&[7]).await.unwrap();
        assert_eq!(plots[0].block_ref, Some(2));
        assert!(store.fetch_cemeteries_by_ids(&[1]).await.unwrap().is_empty());
    }
}
