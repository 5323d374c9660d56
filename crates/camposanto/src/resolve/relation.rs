//! Generic batched relation lookup.
//!
//! Each level of the location hierarchy is a [`Relation`]: it knows its key,
//! which table it lives in, and how to batch-fetch itself. [`lookup`] is the
//! single step every level goes through: fetch the distinct keys referenced by
//! the level below, index the result by key, and report failure as `None` so
//! the caller can stop the chain while keeping what it already has.

use std::{fmt::Debug, hash::Hash};

use ahash::AHashMap as HashMap;
use camposanto_store::{
    Block, BlockId, Cemetery, CemeteryId, Plot, PlotId, RecordStore, Sector, SectorId, Table,
};
use futures::future::BoxFuture;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

pub type LookupMap<R> = HashMap<<R as Relation>::Key, R>;

pub trait Relation: Sized + Send {
    type Key: Copy + Eq + Hash + Debug + Send + Sync;

    const TABLE: Table;

    fn key(&self) -> Self::Key;

    fn fetch<'a, S: RecordStore + ?Sized>(
        store: &'a S,
        keys: &'a [Self::Key],
    ) -> BoxFuture<'a, camposanto_store::Result<Vec<Self>>>;
}

impl Relation for Plot {
    type Key = PlotId;

    const TABLE: Table = Table::Plots;

    fn key(&self) -> PlotId {
        self.id
    }

    fn fetch<'a, S: RecordStore + ?Sized>(
        store: &'a S,
        keys: &'a [PlotId],
    ) -> BoxFuture<'a, camposanto_store::Result<Vec<Self>>> {
        store.fetch_plots_by_ids(keys)
    }
}

impl Relation for Block {
    type Key = BlockId;

    const TABLE: Table = Table::Blocks;

    fn key(&self) -> BlockId {
        self.id
    }

    fn fetch<'a, S: RecordStore + ?Sized>(
        store: &'a S,
        keys: &'a [BlockId],
    ) -> BoxFuture<'a, camposanto_store::Result<Vec<Self>>> {
        store.fetch_blocks_by_ids(keys)
    }
}

impl Relation for Sector {
    type Key = SectorId;

    const TABLE: Table = Table::Sectors;

    fn key(&self) -> SectorId {
        self.id
    }

    fn fetch<'a, S: RecordStore + ?Sized>(
        store: &'a S,
        keys: &'a [SectorId],
    ) -> BoxFuture<'a, camposanto_store::Result<Vec<Self>>> {
        store.fetch_sectors_by_ids(keys)
    }
}

impl Relation for Cemetery {
    type Key = CemeteryId;

    const TABLE: Table = Table::Cemeteries;

    fn key(&self) -> CemeteryId {
        self.id
    }

    fn fetch<'a, S: RecordStore + ?Sized>(
        store: &'a S,
        keys: &'a [CemeteryId],
    ) -> BoxFuture<'a, camposanto_store::Result<Vec<Self>>> {
        store.fetch_cemeteries_by_ids(keys)
    }
}

/// Distinct non-null references, in first-seen order.
pub fn distinct_refs<K, I>(refs: I) -> Vec<K>
where
    K: Clone + Eq + Hash,
    I: IntoIterator<Item = Option<K>>,
{
    refs.into_iter().flatten().unique().collect()
}

/// Batch-fetch one level of the hierarchy and index it by key.
///
/// An empty key set resolves to an empty map without touching the store.
/// `None` means the fetch failed; the failure is logged here and is not
/// propagated.
#[instrument(level = "debug", skip_all, fields(table = %R::TABLE, keys = keys.len()))]
pub async fn lookup<R, S>(store: &S, keys: Vec<R::Key>) -> Option<LookupMap<R>>
where
    R: Relation,
    S: RecordStore + ?Sized,
{
    if keys.is_empty() {
        debug!("No references at this level, skipping fetch");
        return Some(HashMap::new());
    }
    match R::fetch(store, &keys).await {
        Ok(rows) => {
            debug!(fetched = rows.len(), "Relation lookup complete");
            Some(rows.into_iter().map(|row| (row.key(), row)).collect())
        }
        Err(e) => {
            warn!(
                table = %R::TABLE,
                error = %e,
                "Relation lookup failed, continuing with partial locations"
            );
            None
        }
    }
}
