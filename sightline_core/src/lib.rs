//! Sightline core library: shared models, the catalog store, and the
//! engines the HTTP layer composes (reporting, assistant, seed loader).

pub mod assistant;
pub mod config;
pub mod error;
pub mod models;
pub mod o11y;
pub mod reporting;
pub mod seed;
pub mod store;

pub use error::{Error, Result};
pub use models::{
    CustomerRecord, DatasetKind, DatasetRecord, DatasetStatus, MetricRecord, MetricRunRecord,
    MetricStatus, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord, SchemaDoc,
};
pub use store::traits::{CatalogStore, MetricUpdate};
