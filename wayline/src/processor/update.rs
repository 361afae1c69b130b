//! The per-sample result batch.

use crate::milestone::FiredMilestone;
use crate::progress::RouteProgress;
use crate::sample::PositionSample;

/// Everything derived from one processed sample.
#[derive(Debug, Clone)]
pub struct RouteUpdate {
    /// 1-based position of this update within the session.
    pub sequence: u64,
    /// The sample as received.
    pub raw_location: PositionSample,
    /// The sample snapped onto the route, or `raw_location` unchanged.
    pub location: PositionSample,
    pub progress: RouteProgress,
    /// Fired milestones in registration order.
    pub milestones: Vec<FiredMilestone>,
    pub off_route: bool,
    pub check_faster_route: bool,
}

impl RouteUpdate {
    pub fn is_snapped(&self) -> bool {
        self.location != self.raw_location
    }
}
