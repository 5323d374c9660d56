//! Store boundary for the Camposanto pipeline.
//!
//! Everything that touches rows as the backend hands them over lives here:
//! the canonical entities, the adapter that normalises the different row
//! shapes into them, the [`RecordStore`] contract the core fetches through,
//! and an [`InMemoryStore`] that evaluates that contract over plain tables.

pub mod entity;
pub mod memory;
pub mod raw;
pub mod request;
pub mod store;
pub mod test_data;

mod error {
    use thiserror::Error;

    use crate::store::Table;

    #[derive(Error, Debug)]
    pub enum StoreError {
        #[error("{table} table unavailable: {reason}")]
        Unavailable { table: Table, reason: String },
        #[error("Malformed row: {0}")]
        Malformed(#[from] serde_json::Error),
        #[error("Row in {table} table has no usable identity")]
        MissingIdentity { table: Table },
    }

    pub type Result<T> = std::result::Result<T, StoreError>;
}

pub use entity::{
    Block, BlockId, Cemetery, CemeteryId, DeceasedRecord, Plot, PlotId, RecordId, Sector,
    SectorId, Sex,
};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryStoreBuilder};
pub use raw::{FromRawRow, normalize_rows};
pub use request::{DateRange, DeceasedPage, DeceasedPageRequest, SortField, StoreOrder};
pub use store::{RecordStore, Table};
pub use test_data::{sample_document, sample_store};
