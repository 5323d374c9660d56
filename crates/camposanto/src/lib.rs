//! Camposanto - Deceased-Record Resolution and Filtering
//!
//! Camposanto turns raw, paginated deceased-person records into display-ready
//! rows for a cemetery administration screen. Records only know the plot they
//! are buried in; Camposanto rebuilds the rest of the location hierarchy
//! (plot, block, sector, cemetery) with batched lookups and then applies
//! search, date filters, cemetery filters and sorting.
//!
//! # Quick Start
//!
//! ```rust
//! use camposanto::{PipelineConfig, SearchCoordinator, SearchParams, camposanto_store::sample_store};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build()?.block_on(async {
//! let search = SearchCoordinator::new(sample_store()?, PipelineConfig::default());
//!
//! // Programmatic searches skip the debounce.
//! let state = search.run_now(SearchParams::new("rossi")).await;
//! for record in &state.results {
//!     println!("{record}");
//! }
//!
//! // Filter by cemetery name, tolerating small typos.
//! let state = search
//!     .run_now(SearchParams::default().cemetery_name("Cimitero di Rma"))
//!     .await;
//! assert!(state.results.iter().all(|r| r.cemetery_id() == Some(1)));
//! # Ok::<(), camposanto::error::CamposantoError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Pipeline
//!
//! - [`RecordQuery`] fetches one page of records from a [`RecordStore`]
//! - [`resolve_locations`] joins plot, block, sector and cemetery names onto
//!   each record, degrading gracefully when a lookup fails
//! - [`apply_cemetery_filtering`] and [`apply_cemetery_sorting`] narrow and
//!   order the joined records
//! - [`SearchCoordinator`] debounces search-term changes and publishes
//!   [`SearchState`] through a watch channel
//!
//! [`RecordStore`]: camposanto_store::RecordStore
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod clock;
mod config;
mod coordinator;
pub mod error;
mod filter;
mod pipeline;
mod query;
mod resolve;
mod similarity;

pub use camposanto_store;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE, PipelineConfig, PipelineConfigBuilder};
pub use coordinator::{Dispatch, SearchCoordinator, SearchState};
pub use filter::{apply_cemetery_filtering, apply_cemetery_sorting};
pub use pipeline::{SearchPage, search_page};
pub use query::{
    FilterMode, Pagination, QueryError, RecordQuery, SearchParams, SortKey, death_date_window,
};
pub use resolve::{
    Location, LocationDepth, LookupMap, Relation, ResolvedRecord, distinct_refs, lookup,
    resolve_locations,
};
pub use similarity::{CEMETERY_NAME_MAX_EDITS, edit_distance, matches_cemetery_name};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Camposanto library.
///
/// Installs a `tracing` subscriber that prints pipeline events at `level` and
/// above. `RUST_LOG` takes precedence when set. Calling this more than once is
/// harmless; only the first call installs anything.
///
/// # Examples
///
/// ```rust
/// use camposanto::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), camposanto::error::CamposantoError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::CamposantoError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tokio=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
