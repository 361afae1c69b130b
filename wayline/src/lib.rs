//! Wayline - Route progress tracking for turn-by-turn navigation
//!
//! This library turns a stream of position samples into navigation state
//! against a fetched route: how far along the route the user is, whether they
//! have left it, which announcements are due, and when a faster route is worth
//! asking for.
//!
//! # Modules
//!
//! - [`geometry`] - distances, bearings and polyline projection
//! - [`route`] - the route model (legs, steps, maneuvers)
//! - [`sample`] - position samples and the location filter
//! - [`progress`] - progress snapshots built from a sample and route indices
//! - [`off_route`] - off-route detection with hysteresis
//! - [`milestone`] - announcement triggers and instruction templates
//! - [`faster_route`] - faster-route check scheduling
//! - [`processor`] - the session pipeline and its background worker
//! - [`options`], [`config`], [`logging`] - tuning, config files and tracing setup
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wayline::{NavigationOptions, PositionSample, RouteProcessor, RouteUpdate};
//!
//! let processor = RouteProcessor::new(Arc::new(|update: &RouteUpdate| {
//!     for milestone in &update.milestones {
//!         println!("{}", milestone.instruction);
//!     }
//! }));
//! processor.bind_session(route, NavigationOptions::default())?;
//! processor.enqueue(PositionSample::new(38.9, -77.04, 1_700_000_000_000))?;
//! ```

pub mod config;
pub mod error;
pub mod faster_route;
pub mod geometry;
pub mod logging;
pub mod milestone;
pub mod off_route;
pub mod options;
pub mod processor;
pub mod progress;
pub mod route;
pub mod sample;

pub use config::{ConfigError, ConfigFile};
pub use error::ProcessingError;
pub use geometry::GeoPoint;
pub use milestone::{FiredMilestone, Milestone, MilestoneEvaluator, Trigger};
pub use off_route::{OffRouteDetector, OffRouteVerdict};
pub use options::NavigationOptions;
pub use processor::{
    EventDispatcher, NavigationEventListener, NavigationSession, ProcessorError, ProcessorState,
    RouteFetcher, RouteProcessor, RouteUpdate, RouteUpdateListener,
};
pub use progress::{build_progress, RouteProgress};
pub use route::{Route, RouteIndices, RouteLeg, RouteStep};
pub use sample::PositionSample;
