//! Listener seams.
//!
//! [`RouteUpdateListener`] receives the full batch for every processed sample.
//! [`EventDispatcher`] is a ready-made listener that splits each batch into
//! separate navigation events and forwards faster-route requests to a
//! [`RouteFetcher`]:
//!
//! ```text
//! RouteUpdate ──► on_progress_change            (always)
//!             ──► on_milestone                  (once per fired milestone)
//!             ──► on_off_route                  (off_route == true)
//!             ──► RouteFetcher::request_faster_route (check_faster_route == true)
//! ```

use std::sync::Arc;

use crate::milestone::FiredMilestone;
use crate::progress::RouteProgress;
use crate::sample::PositionSample;

use super::RouteUpdate;

/// Receives result batches, in order, on the dispatch task.
pub trait RouteUpdateListener: Send + Sync + 'static {
    fn on_route_update(&self, update: &RouteUpdate);
}

impl<F> RouteUpdateListener for F
where
    F: Fn(&RouteUpdate) + Send + Sync + 'static,
{
    fn on_route_update(&self, update: &RouteUpdate) {
        self(update)
    }
}

/// Fine-grained navigation events.
pub trait NavigationEventListener: Send + Sync + 'static {
    fn on_progress_change(&self, location: &PositionSample, progress: &RouteProgress);

    fn on_milestone(&self, _progress: &RouteProgress, _milestone: &FiredMilestone) {}

    fn on_off_route(&self, _location: &PositionSample) {}
}

/// The external route-search collaborator.
///
/// Requests are fire-and-forget. A resulting route is applied by the caller
/// through [`RouteProcessor::apply_route`](super::RouteProcessor::apply_route).
pub trait RouteFetcher: Send + Sync + 'static {
    fn request_faster_route(&self, location: &PositionSample, progress: &RouteProgress);
}

/// Splits result batches into [`NavigationEventListener`] callbacks.
pub struct EventDispatcher {
    listener: Arc<dyn NavigationEventListener>,
    fetcher: Option<Arc<dyn RouteFetcher>>,
}

impl EventDispatcher {
    pub fn new(listener: Arc<dyn NavigationEventListener>) -> Self {
        Self {
            listener,
            fetcher: None,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn RouteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl RouteUpdateListener for EventDispatcher {
    fn on_route_update(&self, update: &RouteUpdate) {
        self.listener
            .on_progress_change(&update.location, &update.progress);

        for milestone in &update.milestones {
            self.listener.on_milestone(&update.progress, milestone);
        }

        if update.off_route {
            self.listener.on_off_route(&update.location);
        }

        if update.check_faster_route {
            match &self.fetcher {
                Some(fetcher) => fetcher.request_faster_route(&update.location, &update.progress),
                None => tracing::debug!("Faster route check due but no fetcher registered"),
            }
        }
    }
}
