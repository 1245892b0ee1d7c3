mod caller;
mod catalog_service;
mod models;
mod search_sync;

pub use caller::{Caller, UserRole};
pub use catalog_service::CatalogService;
pub use models::*;
pub use search_sync::SearchIndexSynchronizer;
