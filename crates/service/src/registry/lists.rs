//! Record list operations.
//!
//! All operations take the list by exclusive borrow and mutate it in place;
//! the caller owns writing the list back into its document and saving.
//! Record identity is the string `id` field, matched by exact equality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

/// The record lists held by the registry document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryList {
    #[serde(rename = "carbonRegistries")]
    Carbon,
    #[serde(rename = "recRegistries")]
    Rec,
    #[serde(rename = "etsRegistries")]
    Ets,
}

impl RegistryList {
    pub const ALL: [RegistryList; 3] = [RegistryList::Carbon, RegistryList::Rec, RegistryList::Ets];

    /// Field name inside the registry document.
    pub fn field(&self) -> &'static str {
        match self {
            RegistryList::Carbon => "carbonRegistries",
            RegistryList::Rec => "recRegistries",
            RegistryList::Ets => "etsRegistries",
        }
    }
}

impl fmt::Display for RegistryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for RegistryList {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegistryList::ALL
            .into_iter()
            .find(|l| l.field() == s)
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "unknown registry list {s:?}; expected one of carbonRegistries, recRegistries, etsRegistries"
                ))
            })
    }
}

/// The record's `id`, if it is a string.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Append unconditionally. Duplicate ids are not checked here.
pub fn insert(list: &mut Vec<Value>, record: Value) {
    list.push(record);
}

/// Replace the first record whose id matches with `record`, verbatim.
/// Returns whether a match was found.
pub fn replace_by_id(list: &mut [Value], id: &str, record: Value) -> bool {
    match list.iter_mut().find(|r| record_id(r) == Some(id)) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => false,
    }
}

/// Remove the first record whose id matches. Returns whether a match was found.
pub fn delete_by_id(list: &mut Vec<Value>, id: &str) -> bool {
    match list.iter().position(|r| record_id(r) == Some(id)) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

pub fn find_by_id<'a>(list: &'a [Value], id: &str) -> Option<&'a Value> {
    list.iter().find(|r| record_id(r) == Some(id))
}
