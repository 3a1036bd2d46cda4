pub mod aggregator;
pub mod delay;
pub mod error;
pub mod snapshot;

pub use aggregator::{AggregatorConfig, StatsAggregator};
pub use delay::{DelayModel, DelayPredictor, predict_delay};
pub use error::StatsError;
pub use snapshot::{Rates, Snapshot};
