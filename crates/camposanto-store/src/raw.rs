//! Row normalisation at the store boundary.
//!
//! Tables coming out of the backend do not agree on column names: some rows use
//! lowercase keys, some uppercase, and older tables still carry the Italian
//! column names (`nome`, `data_decesso`, `loculo_id`, ...). Every row is mapped
//! onto one canonical entity here, so nothing downstream ever looks at the raw
//! shape.
//!
//! Reference columns are coerced leniently: integers and numeric strings are
//! accepted, anything else is treated as "no reference".

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;

use crate::{
    Result, StoreError,
    entity::{Block, Cemetery, DeceasedRecord, Plot, Sector, Sex},
    store::Table,
};

/// Entities that can be built from a raw backend row.
pub trait FromRawRow: Sized {
    const TABLE: Table;

    fn from_json(value: Value) -> Result<Self>;
}

/// Normalise a batch of raw rows.
///
/// Rows without a usable identity are skipped with a warning; a row that is not
/// an object at all is an error.
pub fn normalize_rows<T: FromRawRow>(rows: Vec<Value>) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match T::from_json(row) {
            Ok(entity) => out.push(entity),
            Err(StoreError::MissingIdentity { table }) => {
                warn!(%table, "Skipping row without a usable identity");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

fn parse_row<R: DeserializeOwned>(value: Value) -> Result<R> {
    Ok(serde_json::from_value(value)?)
}

fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let Value::String(s) = value else {
        return None;
    };
    // Plain dates and ISO timestamps share the first ten characters.
    let day = s.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(coerce_id))
}

fn lenient_text<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(coerce_text))
}

fn lenient_date<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<NaiveDate>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(coerce_date))
}

fn lenient_age<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(coerce_id)
        .and_then(|age| u32::try_from(age).ok()))
}

#[derive(Debug, Deserialize)]
struct RawDeceasedRow {
    #[serde(default, alias = "ID", alias = "Id", deserialize_with = "lenient_id")]
    id: Option<i64>,
    #[serde(
        default,
        alias = "FULL_NAME",
        alias = "nominativo",
        alias = "NOMINATIVO",
        deserialize_with = "lenient_text"
    )]
    full_name: Option<String>,
    #[serde(
        default,
        alias = "FIRST_NAME",
        alias = "nome",
        alias = "NOME",
        deserialize_with = "lenient_text"
    )]
    first_name: Option<String>,
    #[serde(
        default,
        alias = "LAST_NAME",
        alias = "cognome",
        alias = "COGNOME",
        deserialize_with = "lenient_text"
    )]
    last_name: Option<String>,
    #[serde(
        default,
        alias = "BIRTH_DATE",
        alias = "data_nascita",
        alias = "DATA_NASCITA",
        deserialize_with = "lenient_date"
    )]
    birth_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "DEATH_DATE",
        alias = "data_decesso",
        alias = "DATA_DECESSO",
        deserialize_with = "lenient_date"
    )]
    death_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "AGE",
        alias = "eta",
        alias = "ETA",
        deserialize_with = "lenient_age"
    )]
    age: Option<u32>,
    #[serde(
        default,
        alias = "SEX",
        alias = "sesso",
        alias = "SESSO",
        deserialize_with = "lenient_text"
    )]
    sex: Option<String>,
    #[serde(
        default,
        alias = "NOTES",
        alias = "note",
        alias = "NOTE",
        deserialize_with = "lenient_text"
    )]
    notes: Option<String>,
    #[serde(
        default,
        alias = "STATUS",
        alias = "stato",
        alias = "STATO",
        deserialize_with = "lenient_text"
    )]
    status: Option<String>,
    #[serde(
        default,
        alias = "PLOT_ID",
        alias = "plot_ref",
        alias = "loculo_id",
        alias = "LOCULO_ID",
        deserialize_with = "lenient_id"
    )]
    plot_id: Option<i64>,
}

impl FromRawRow for DeceasedRecord {
    const TABLE: Table = Table::Deceased;

    fn from_json(value: Value) -> Result<Self> {
        let raw: RawDeceasedRow = parse_row(value)?;
        let id = raw.id.ok_or(StoreError::MissingIdentity { table: Self::TABLE })?;
        let full_name = raw.full_name.unwrap_or_else(|| {
            [raw.first_name, raw.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        Ok(Self {
            id,
            full_name,
            birth_date: raw.birth_date,
            death_date: raw.death_date,
            age: raw.age,
            sex: raw.sex.as_deref().map_or(Sex::Unknown, Sex::from_code),
            notes: raw.notes,
            status: raw.status,
            plot_ref: raw.plot_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPlotRow {
    #[serde(default, alias = "ID", alias = "Id", deserialize_with = "lenient_id")]
    id: Option<i64>,
    #[serde(
        default,
        alias = "NUMBER",
        alias = "numero",
        alias = "NUMERO",
        deserialize_with = "lenient_text"
    )]
    number: Option<String>,
    #[serde(
        default,
        alias = "ROW",
        alias = "fila",
        alias = "FILA",
        deserialize_with = "lenient_text"
    )]
    row: Option<String>,
    #[serde(
        default,
        alias = "BLOCK_ID",
        alias = "blocco_id",
        alias = "BLOCCO_ID",
        deserialize_with = "lenient_id"
    )]
    block_id: Option<i64>,
}

impl FromRawRow for Plot {
    const TABLE: Table = Table::Plots;

    fn from_json(value: Value) -> Result<Self> {
        let raw: RawPlotRow = parse_row(value)?;
        Ok(Self {
            id: raw.id.ok_or(StoreError::MissingIdentity { table: Self::TABLE })?,
            number: raw.number,
            row: raw.row,
            block_ref: raw.block_id,
        })
    }
}

/// Shared shape of the three named levels above a plot.
#[derive(Debug, Deserialize)]
struct RawNamedRow {
    #[serde(default, alias = "ID", alias = "Id", deserialize_with = "lenient_id")]
    id: Option<i64>,
    #[serde(
        default,
        alias = "NAME",
        alias = "nome",
        alias = "NOME",
        deserialize_with = "lenient_text"
    )]
    name: Option<String>,
    #[serde(
        default,
        alias = "SECTOR_ID",
        alias = "settore_id",
        alias = "SETTORE_ID",
        deserialize_with = "lenient_id"
    )]
    sector_id: Option<i64>,
    #[serde(
        default,
        alias = "CEMETERY_ID",
        alias = "cimitero_id",
        alias = "CIMITERO_ID",
        deserialize_with = "lenient_id"
    )]
    cemetery_id: Option<i64>,
}

impl RawNamedRow {
    fn parse(value: Value, table: Table) -> Result<(i64, String, Self)> {
        let mut raw: Self = parse_row(value)?;
        let id = raw.id.ok_or(StoreError::MissingIdentity { table })?;
        let name = raw.name.take().unwrap_or_default();
        Ok((id, name, raw))
    }
}

impl FromRawRow for Block {
    const TABLE: Table = Table::Blocks;

    fn from_json(value: Value) -> Result<Self> {
        let (id, name, raw) = RawNamedRow::parse(value, Self::TABLE)?;
        Ok(Self {
            id,
            name,
            sector_ref: raw.sector_id,
        })
    }
}

impl FromRawRow for Sector {
    const TABLE: Table = Table::Sectors;

    fn from_json(value: Value) -> Result<Self> {
        let (id, name, raw) = RawNamedRow::parse(value, Self::TABLE)?;
        Ok(Self {
            id,
            name,
            cemetery_ref: raw.cemetery_id,
        })
    }
}

impl FromRawRow for Cemetery {
    const TABLE: Table = Table::Cemeteries;

    fn from_json(value: Value) -> Result<Self> {
        let (id, name, _) = RawNamedRow::parse(value, Self::TABLE)?;
        Ok(Self { id, name })
    }
}
