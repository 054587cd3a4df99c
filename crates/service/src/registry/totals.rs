//! Summary totals derived from the three registry lists.
//!
//! Always recomputed from scratch; never updated incrementally.

use std::collections::HashSet;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::lists::RegistryList;
use crate::document::Document;
use crate::errors::StoreError;

/// Field under which totals are stored in the registry document.
pub const TOTALS_FIELD: &str = "totals";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub carbon: CategoryTotals,
    pub rec: CategoryTotals,
    pub ets: EtsTotals,
    pub total_registries: usize,
    pub total_countries: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub registries: usize,
    #[serde(serialize_with = "serialize_amount")]
    pub issued: f64,
    #[serde(serialize_with = "serialize_amount")]
    pub retired: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EtsTotals {
    pub registries: usize,
}

/// Whole sums are written as JSON integers so stored totals read `100`, not `100.0`.
fn serialize_amount<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_EXACT {
        s.serialize_i64(*v as i64)
    } else {
        s.serialize_f64(*v)
    }
}

/// Records of one list. An absent field counts as empty; a field holding
/// anything but an array means the document is corrupt.
fn records(document: &Document, list: RegistryList) -> Result<&[Value], StoreError> {
    match document.get(list.field()) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(StoreError::Parse(format!("registry field {} is not an array", list.field()))),
    }
}

/// Numeric field value; absent, null or non-numeric counts as 0.
fn amount(record: &Value, field: &str) -> f64 {
    record.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn category(list: &[Value]) -> CategoryTotals {
    CategoryTotals {
        registries: list.len(),
        issued: list.iter().map(|r| amount(r, "issued")).sum(),
        retired: list.iter().map(|r| amount(r, "retired")).sum(),
    }
}

/// Pure function of the three current lists.
///
/// Countries are distinct by exact string equality; empty strings and
/// non-string values are ignored, no case or whitespace folding is applied.
pub fn recompute_totals(document: &Document) -> Result<Totals, StoreError> {
    let carbon = records(document, RegistryList::Carbon)?;
    let rec = records(document, RegistryList::Rec)?;
    let ets = records(document, RegistryList::Ets)?;

    let countries: HashSet<&str> = [carbon, rec, ets]
        .into_iter()
        .flatten()
        .filter_map(|r| r.get("country").and_then(Value::as_str))
        .filter(|c| !c.is_empty())
        .collect();

    Ok(Totals {
        carbon: category(carbon),
        rec: category(rec),
        ets: EtsTotals { registries: ets.len() },
        total_registries: carbon.len() + rec.len() + ets.len(),
        total_countries: countries.len(),
    })
}
