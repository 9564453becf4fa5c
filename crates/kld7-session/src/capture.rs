use std::time::{SystemTime, UNIX_EPOCH};

use kld7_frame::Target;
use serde::{Deserialize, Serialize};

/// A decoded target together with the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// Seconds since the UNIX epoch.
    pub timestamp: f64,
    #[serde(flatten)]
    pub target: Target,
}

impl Capture {
    /// Stamp a target with the current wall-clock time.
    pub fn now(target: Target) -> Self {
        // A clock set before 1970 stamps zero rather than failing the cycle.
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();
        Self::at(timestamp, target)
    }

    /// Stamp a target with an explicit time.
    pub fn at(timestamp: f64, target: Target) -> Self {
        Self { timestamp, target }
    }
}
