//! Document storage and mutation core for the registry admin backend.
//! - `storage`: interchangeable blob backends (local filesystem, GCS, memory).
//! - `document`: whole-document reads and stamped saves through one backend.
//! - `registry`: record list mutations and derived totals.
//! - `insights`: whole-document and per-section writes.
//! - `auth`: admin credential check and token issuance.

pub mod errors;
pub mod auth;
pub mod storage;
pub mod document;
pub mod registry;
pub mod insights;
