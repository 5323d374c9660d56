use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

pub type RecordId = i64;
pub type PlotId = i64;
pub type BlockId = i64;
pub type SectorId = i64;
pub type CemeteryId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Lenient parse of the codes found in the records tables.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "m" | "male" | "maschio" => Self::Male,
            "f" | "female" | "femmina" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// A deceased person as stored in the records table.
///
/// The core only ever reads these. Location names are never stored here; they
/// are joined in from the plot hierarchy by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeceasedRecord {
    pub id: RecordId,
    /// Display name, matched by the free-text search
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub age: Option<u32>,
    pub sex: Sex,
    pub notes: Option<String>,
    /// Lifecycle/status code as the records office uses it
    pub status: Option<String>,
    /// Burial plot, if one is known
    pub plot_ref: Option<PlotId>,
}

impl DeceasedRecord {
    /// Minimal record, mostly useful for fixtures.
    pub fn new(id: RecordId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            birth_date: None,
            death_date: None,
            age: None,
            sex: Sex::Unknown,
            notes: None,
            status: None,
            plot_ref: None,
        }
    }

    #[must_use]
    pub fn with_plot(mut self, plot: PlotId) -> Self {
        self.plot_ref = Some(plot);
        self
    }

    #[must_use]
    pub fn with_death_date(mut self, date: NaiveDate) -> Self {
        self.death_date = Some(date);
        self
    }
}

impl fmt::Display for DeceasedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeceasedRecord {{ id: {}, full_name: \"{}\" }}",
            self.id, self.full_name
        )
    }
}

/// Smallest location unit: a numbered slot in a row of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plot {
    pub id: PlotId,
    pub number: Option<String>,
    pub row: Option<String>,
    pub block_ref: Option<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub sector_ref: Option<SectorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub cemetery_ref: Option<CemeteryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cemetery {
    pub id: CemeteryId,
    pub name: String,
}
