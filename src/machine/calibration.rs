/// Machine-pin wait calibration
///
/// The setting arm's cycle time drifts with the physical machine. Each
/// confirmed cycle produces the window for the next throw; the value is
/// passed in and handed back rather than mutated in place.
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBand {
    /// Window used before the first confirmation, in milliseconds
    pub initial_ms: u64,
    /// Lowest acceptable window
    pub min_ms: u64,
    /// Highest acceptable window
    pub max_ms: u64,
    /// Window substituted when a learned value falls outside the band
    pub fallback_ms: u64,
    /// Added to each confirmed cycle time
    pub margin_ms: u64,
}

impl Default for CalibrationBand {
    fn default() -> Self {
        Self {
            initial_ms: 5800,
            min_ms: 5300,
            max_ms: 6000,
            fallback_ms: 5700,
            margin_ms: 10,
        }
    }
}

/// Current machine-pin timeout together with the band it must stay in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachinePinCalibration {
    timeout: Duration,
    band: CalibrationBand,
}

impl MachinePinCalibration {
    pub fn new(band: CalibrationBand) -> Self {
        Self {
            timeout: Duration::from_millis(band.initial_ms),
            band,
        }
    }

    /// Window to wait for this throw. Out-of-band values are replaced by the
    /// fallback.
    pub fn window(&self) -> Duration {
        let min = Duration::from_millis(self.band.min_ms);
        let max = Duration::from_millis(self.band.max_ms);
        if self.timeout < min || self.timeout > max {
            Duration::from_millis(self.band.fallback_ms)
        } else {
            self.timeout
        }
    }

    /// Calibration for the next throw after the machine pin was seen
    /// `elapsed` into the wait.
    #[must_use]
    pub fn confirmed_after(self, elapsed: Duration) -> Self {
        Self {
            timeout: elapsed + Duration::from_millis(self.band.margin_ms),
            band: self.band,
        }
    }

    /// Calibration for the next throw after the wait ran out.
    #[must_use]
    pub fn timed_out(self) -> Self {
        Self {
            timeout: self.window(),
            band: self.band,
        }
    }

    pub fn band(&self) -> CalibrationBand {
        self.band
    }
}

impl Default for MachinePinCalibration {
    fn default() -> Self {
        Self::new(CalibrationBand::default())
    }
}
