//! Location resolution for deceased records.
//!
//! Records only carry a plot reference. This module rebuilds the rest of the
//! hierarchy (plot → block → sector → cemetery) with one batched lookup per
//! level and joins the names back onto each record. Resolution is best-effort:
//! when a level cannot be fetched the records keep whatever was resolved above
//! it, and the pipeline carries on.

mod relation;

use std::fmt;

use camposanto_store::{
    Block, Cemetery, CemeteryId, DeceasedRecord, Plot, PlotId, RecordStore, Sector,
};
pub use relation::{LookupMap, Relation, distinct_refs, lookup};
use tracing::{debug, instrument};

/// How far up the hierarchy a record's location was resolved.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocationDepth {
    #[default]
    Unresolved,
    Plot,
    Block,
    Sector,
    Cemetery,
}

/// Location fields joined onto a record.
///
/// Fields are filled top-down from the plot; a `None` at one level implies
/// `None` for every level above it.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub cemetery_id: Option<CemeteryId>,
    pub cemetery_name: Option<String>,
    pub sector_name: Option<String>,
    pub block_name: Option<String>,
    pub plot_number: Option<String>,
    pub plot_row: Option<String>,
    /// Deepest level whose row was found, even when that row had no
    /// displayable fields
    pub depth: LocationDepth,
}

impl Location {
    pub fn depth(&self) -> LocationDepth {
        self.depth
    }

    pub fn is_resolved(&self) -> bool {
        self.depth() != LocationDepth::Unresolved
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.cemetery_name.as_deref(),
            self.sector_name.as_deref(),
            self.block_name.as_deref(),
            self.plot_row.as_deref(),
            self.plot_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        if parts.is_empty() {
            write!(f, "location unknown")
        } else {
            write!(f, "{}", parts.join(" / "))
        }
    }
}

/// A deceased record together with its resolved location.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub record: DeceasedRecord,
    pub location: Location,
}

impl ResolvedRecord {
    pub fn unresolved(record: DeceasedRecord) -> Self {
        Self {
            record,
            location: Location::default(),
        }
    }

    pub fn cemetery_id(&self) -> Option<CemeteryId> {
        self.location.cemetery_id
    }

    pub fn cemetery_name(&self) -> Option<&str> {
        self.location.cemetery_name.as_deref()
    }
}

impl fmt::Display for ResolvedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.record.full_name, self.location)
    }
}

/// Lookup maps for one resolution pass. Never outlives the call.
#[derive(Debug, Default)]
struct LocationLookups {
    plots: LookupMap<Plot>,
    blocks: LookupMap<Block>,
    sectors: LookupMap<Sector>,
    cemeteries: LookupMap<Cemetery>,
}

impl LocationLookups {
    /// Fill the maps level by level, stopping at the first failed fetch.
    async fn fetch<S: RecordStore + ?Sized>(store: &S, plot_refs: Vec<PlotId>) -> Self {
        let mut lookups = Self::default();

        let Some(plots) = lookup::<Plot, _>(store, plot_refs).await else {
            return lookups;
        };
        lookups.plots = plots;

        let block_refs = distinct_refs(lookups.plots.values().map(|p| p.block_ref));
        let Some(blocks) = lookup::<Block, _>(store, block_refs).await else {
            return lookups;
        };
        lookups.blocks = blocks;

        let sector_refs = distinct_refs(lookups.blocks.values().map(|b| b.sector_ref));
        let Some(sectors) = lookup::<Sector, _>(store, sector_refs).await else {
            return lookups;
        };
        lookups.sectors = sectors;

        let cemetery_refs = distinct_refs(lookups.sectors.values().map(|s| s.cemetery_ref));
        if let Some(cemeteries) = lookup::<Cemetery, _>(store, cemetery_refs).await {
            lookups.cemeteries = cemeteries;
        }
        lookups
    }

    fn locate(&self, plot_ref: Option<PlotId>) -> Location {
        let mut location = Location::default();
        let Some(plot) = plot_ref.and_then(|id| self.plots.get(&id)) else {
            return location;
        };
        location.depth = LocationDepth::Plot;
        location.plot_number.clone_from(&plot.number);
        location.plot_row.clone_from(&plot.row);

        let Some(block) = plot.block_ref.and_then(|id| self.blocks.get(&id)) else {
            return location;
        };
        location.depth = LocationDepth::Block;
        location.block_name = Some(block.name.clone());

        let Some(sector) = block.sector_ref.and_then(|id| self.sectors.get(&id)) else {
            return location;
        };
        location.depth = LocationDepth::Sector;
        location.sector_name = Some(sector.name.clone());

        let Some(cemetery) = sector.cemetery_ref.and_then(|id| self.cemeteries.get(&id)) else {
            return location;
        };
        location.depth = LocationDepth::Cemetery;
        location.cemetery_id = Some(cemetery.id);
        location.cemetery_name = Some(cemetery.name.clone());
        location
    }
}

/// Join location names onto a batch of records.
///
/// Returns exactly one [`ResolvedRecord`] per input row, in input order. Store
/// failures never surface here: a failed level leaves the fields from that
/// level upwards as `None`.
#[instrument(name = "Resolve Locations", level = "debug", skip_all, fields(rows = rows.len()))]
pub async fn resolve_locations<S>(store: &S, rows: Vec<DeceasedRecord>) -> Vec<ResolvedRecord>
where
    S: RecordStore + ?Sized,
{
    let plot_refs = distinct_refs(rows.iter().map(|r| r.plot_ref));
    if plot_refs.is_empty() {
        debug!("No plot references in batch, nothing to resolve");
        return rows.into_iter().map(ResolvedRecord::unresolved).collect();
    }

    let lookups = LocationLookups::fetch(store, plot_refs).await;
    rows.into_iter()
        .map(|record| {
            let location = lookups.locate(record.plot_ref);
            ResolvedRecord { record, location }
        })
        .collect()
}
