pub mod service;

pub use service::InsightsService;
