use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Stand-in network model used to turn aggregate traffic into a latency
/// estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayModel {
    /// One millisecond per megabyte seen.
    #[default]
    Linear,
    /// Simulated link: 2.5 ms per megabyte seen.
    Simulated,
}

impl DelayModel {
    fn ms_per_megabyte(self) -> f64 {
        match self {
            DelayModel::Linear => 1.0,
            DelayModel::Simulated => 2.5,
        }
    }
}

/// Predicted delay in milliseconds for the cumulative totals, using the
/// default model.
pub fn predict_delay(total_packets: u64, total_bytes: u64) -> f64 {
    DelayPredictor::new(DelayModel::default()).predict(total_packets, total_bytes)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DelayPredictor {
    model: DelayModel,
}

impl DelayPredictor {
    pub fn new(model: DelayModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> DelayModel {
        self.model
    }

    /// Packet count is accepted for interface stability; both models only
    /// depend on bytes.
    pub fn predict(&self, _total_packets: u64, total_bytes: u64) -> f64 {
        total_bytes as f64 / 1_000_000.0 * self.model.ms_per_megabyte()
    }
}
