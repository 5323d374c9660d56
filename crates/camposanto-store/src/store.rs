use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    Result,
    entity::{Block, BlockId, Cemetery, CemeteryId, Plot, PlotId, Sector, SectorId},
    request::{DeceasedPage, DeceasedPageRequest},
};

/// The tables the pipeline reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Table {
    Deceased,
    Plots,
    Blocks,
    Sectors,
    Cemeteries,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deceased => "deceased",
            Self::Plots => "plots",
            Self::Blocks => "blocks",
            Self::Sectors => "sectors",
            Self::Cemeteries => "cemeteries",
        };
        f.write_str(name)
    }
}

/// Read access to the records backend.
///
/// Implementations only need equality/range predicates, ordering and
/// pagination; every join happens in the caller. The `*_by_ids` lookups return
/// whatever subset of the requested identities exists, in any order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_deceased_page(&self, request: &DeceasedPageRequest) -> Result<DeceasedPage>;

    async fn fetch_plots_by_ids(&self, ids: &[PlotId]) -> Result<Vec<Plot>>;

    async fn fetch_blocks_by_ids(&self, ids: &[BlockId]) -> Result<Vec<Block>>;

    async fn fetch_sectors_by_ids(&self, ids: &[SectorId]) -> Result<Vec<Sector>>;

    async fn fetch_cemeteries_by_ids(&self, ids: &[CemeteryId]) -> Result<Vec<Cemetery>>;
}

macro_rules! forward_record_store {
    ($wrapper:ty) => {
        #[async_trait]
        impl<S: RecordStore + ?Sized> RecordStore for $wrapper {
            async fn fetch_deceased_page(
                &self,
                request: &DeceasedPageRequest,
            ) -> Result<DeceasedPage> {
                (**self).fetch_deceased_page(request).await
            }

            async fn fetch_plots_by_ids(&self, ids: &[PlotId]) -> Result<Vec<Plot>> {
                (**self).fetch_plots_by_ids(ids).await
            }

            async fn fetch_blocks_by_ids(&self, ids: &[BlockId]) -> Result<Vec<Block>> {
                (**self).fetch_blocks_by_ids(ids).await
            }

            async fn fetch_sectors_by_ids(&self, ids: &[SectorId]) -> Result<Vec<Sector>> {
                (**self).fetch_sectors_by_ids(ids).await
            }

            async fn fetch_cemeteries_by_ids(
                &self,
                ids: &[CemeteryId],
            ) -> Result<Vec<Cemetery>> {
                (**self).fetch_cemeteries_by_ids(ids).await
            }
        }
    };
}

forward_record_store!(Arc<S>);
forward_record_store!(Box<S>);
