//! Adaptive page-size limits
//!
//! The downstream loader rejects files above a fixed size, so before a pull
//! the engine probes the API once and scales the page limit by how far the
//! observed response is from that ceiling:
//!
//! ```text
//! new = floor((max_file_size_mb / observed_mb) * current * grace_offset)
//! ```
//!
//! clamped to `[1, ceiling]`.

use crate::config::LimitSettings;
use crate::error::{Error, Result};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Computes the next page-size limit from an observed response size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitCalculator {
    max_file_size_mb: f64,
    ceiling: u32,
    grace_offset: f64,
}

impl Default for LimitCalculator {
    fn default() -> Self {
        Self::from(LimitSettings::default())
    }
}

impl From<LimitSettings> for LimitCalculator {
    fn from(settings: LimitSettings) -> Self {
        Self {
            max_file_size_mb: settings.max_file_size_mb,
            ceiling: settings.ceiling,
            grace_offset: settings.grace_offset,
        }
    }
}

impl LimitCalculator {
    /// Create a calculator
    pub fn new(max_file_size_mb: f64, ceiling: u32, grace_offset: f64) -> Self {
        Self {
            max_file_size_mb,
            ceiling,
            grace_offset,
        }
    }

    /// Upper bound on any computed limit
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Bring any limit into `[1, ceiling]`
    pub fn clamp(&self, limit: u32) -> u32 {
        limit.clamp(1, self.ceiling.max(1))
    }

    /// Next limit given the current one and the observed response size in MB
    pub fn new_limit(&self, current: u32, observed_mb: f64) -> Result<u32> {
        if !(observed_mb > 0.0 && observed_mb.is_finite()) {
            return Err(Error::EmptyObservation);
        }

        let scaled =
            (self.max_file_size_mb / observed_mb) * f64::from(current) * self.grace_offset;
        let ceiling = self.ceiling.max(1);
        let limit = if scaled >= f64::from(ceiling) {
            ceiling
        } else {
            (scaled.floor() as u32).max(1)
        };
        Ok(limit)
    }

    /// Next limit given the current one and the observed response size in bytes
    pub fn new_limit_for_bytes(&self, current: u32, observed_bytes: usize) -> Result<u32> {
        self.new_limit(current, observed_bytes as f64 / BYTES_PER_MB)
    }
}
