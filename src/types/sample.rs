//! Measurement samples carried by the telemetry queue.

use serde::{Deserialize, Serialize};

/// Kind of environmental measurement a sample carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    Temperature,
    Pressure,
    Humidity,
}

impl SampleKind {
    /// Topic segment for this measurement kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Temperature => "temperature",
            SampleKind::Pressure => "pressure",
            SampleKind::Humidity => "humidity",
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One environmental measurement.
///
/// Immutable once produced: created by the sampling side, consumed exactly
/// once by the delivery loop, never mutated in the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Measured value in the kind's natural unit (°C, hPa, %RH).
    pub value: f64,
    /// What was measured.
    pub kind: SampleKind,
}

impl Sample {
    /// Create a new sample.
    pub fn new(value: f64, kind: SampleKind) -> Self {
        Self { value, kind }
    }

    /// Wire payload: the value formatted to two decimals.
    pub fn payload(&self) -> String {
        format!("{:.2}", self.value)
    }
}
