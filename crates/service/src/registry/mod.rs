//! The registry document: three record lists plus derived totals.

pub mod lists;
pub mod service;
pub mod totals;

pub use lists::RegistryList;
pub use service::{MutationOutcome, RegistryService};
pub use totals::{recompute_totals, Totals};
