//! Composite operations: higher-level behaviour assembled from several
//! sequential remote calls plus local logic.

pub mod views;
pub mod wiki;
pub mod work_items;

pub use wiki::{PageSpec, WikiOps, DEFAULT_MAX_ATTEMPTS};
pub use work_items::WorkItemOps;
