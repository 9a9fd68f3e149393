//! Domain types shared by the ledger and the allocation engine.

pub mod ids;
pub mod query;
pub mod weight;

pub use ids::SystemId;
pub use query::Query;
pub use weight::{total_weight, SystemWeight, SystemWeightList};
