//! The route processor and its background tasks.
//!
//! # Example
//!
//! ```ignore
//! use wayline::processor::RouteProcessor;
//!
//! let processor = RouteProcessor::new(Arc::new(|update: &RouteUpdate| {
//!     println!("{} m left", update.progress.distance_remaining);
//! }));
//! processor.bind_session(route, NavigationOptions::default())?;
//!
//! processor.enqueue(sample)?;
//! processor.flush().await?;
//! processor.end_session().await;
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProcessingError;
use crate::milestone::Milestone;
use crate::options::NavigationOptions;
use crate::route::Route;
use crate::sample::{PositionSample, SampleError};

use super::{NavigationSession, ProcessorError, ProcessorState, RouteUpdate, RouteUpdateListener};

// =============================================================================
// Queue items
// =============================================================================

enum WorkItem {
    Sample(PositionSample),
    Initial {
        last_known: Option<PositionSample>,
        now_millis: i64,
    },
    Reroute(Arc<Route>),
    Flush(oneshot::Sender<()>),
}

enum Dispatch {
    Update(Box<RouteUpdate>),
    Flush(oneshot::Sender<()>),
}

// =============================================================================
// Route processor
// =============================================================================

struct SessionHandles {
    work_tx: mpsc::UnboundedSender<WorkItem>,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

struct Inner {
    state: ProcessorState,
    handles: Option<SessionHandles>,
}

/// Moves a draining processor to `Stopped` when dropped, so a cancelled
/// `end_session` still leaves it rebindable.
struct StopOnDrop<'a>(&'a Mutex<Inner>);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lock().state = ProcessorState::Stopped;
    }
}

/// Serializes samples through a [`NavigationSession`] on a background task
/// and delivers results to a listener, in order, on a second task.
///
/// Methods other than [`flush`](Self::flush) and
/// [`end_session`](Self::end_session) are synchronous and may be called from
/// any thread. Binding a session must happen inside a Tokio runtime.
pub struct RouteProcessor {
    listener: Arc<dyn RouteUpdateListener>,
    inner: Mutex<Inner>,
}

impl RouteProcessor {
    pub fn new(listener: Arc<dyn RouteUpdateListener>) -> Self {
        Self {
            listener,
            inner: Mutex::new(Inner {
                state: ProcessorState::Idle,
                handles: None,
            }),
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.inner.lock().state
    }

    /// Start a session on `route`.
    pub fn bind_session(
        &self,
        route: impl Into<Arc<Route>>,
        options: NavigationOptions,
    ) -> Result<(), ProcessorError> {
        self.bind_session_with_milestones(route, options, Vec::new())
    }

    /// Start a session on `route` with registered milestones.
    pub fn bind_session_with_milestones(
        &self,
        route: impl Into<Arc<Route>>,
        options: NavigationOptions,
        milestones: Vec<Milestone>,
    ) -> Result<(), ProcessorError> {
        let runtime = Handle::try_current().map_err(|_| ProcessorError::NoRuntime)?;

        let mut inner = self.inner.lock();
        match inner.state {
            ProcessorState::Idle | ProcessorState::Stopped => {}
            state => return Err(ProcessorError::AlreadyActive(state)),
        }

        let session = NavigationSession::new(route.into(), options, milestones)?;
        let legs = session.route().legs.len();
        let distance = session.route().distance();

        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let worker = RouteWorker {
            session,
            work_rx,
            dispatch_tx,
        };
        let worker = runtime.spawn(worker.run(shutdown.clone()));
        let dispatcher = runtime.spawn(run_dispatcher(Arc::clone(&self.listener), dispatch_rx));

        inner.handles = Some(SessionHandles {
            work_tx,
            shutdown,
            worker,
            dispatcher,
        });
        inner.state = ProcessorState::Active;

        info!(legs, distance, "Navigation session bound");
        Ok(())
    }

    /// Queue a sample. Only accepted while the session is active.
    pub fn enqueue(&self, sample: PositionSample) -> Result<(), ProcessorError> {
        self.send(WorkItem::Sample(sample))
    }

    /// Queue the first update of a session: `last_known` when it is usable,
    /// otherwise a synthetic sample at the route origin.
    pub fn enqueue_initial(
        &self,
        last_known: Option<PositionSample>,
        now_millis: i64,
    ) -> Result<(), ProcessorError> {
        self.send(WorkItem::Initial {
            last_known,
            now_millis,
        })
    }

    /// Replace the session route. Applied in order with queued samples.
    pub fn apply_route(&self, route: impl Into<Arc<Route>>) -> Result<(), ProcessorError> {
        let route = route.into();
        route.validate()?;
        self.send(WorkItem::Reroute(route))
    }

    /// Resolve once everything queued before this call has been processed and
    /// its result delivered to the listener.
    pub async fn flush(&self) -> Result<(), ProcessorError> {
        let (tx, rx) = oneshot::channel();
        self.send(WorkItem::Flush(tx))?;
        rx.await.map_err(|_| ProcessorError::Stopped)
    }

    /// End the session. Queued samples are discarded, a sample being processed
    /// finishes and its result is still delivered. Idempotent.
    ///
    /// Dropping the returned future before it completes still stops the
    /// processor; the background tasks then wind down on their own.
    pub async fn end_session(&self) {
        let handles = {
            let mut inner = self.inner.lock();
            if inner.state != ProcessorState::Active {
                return;
            }
            inner.state = ProcessorState::Draining;
            inner.handles.take()
        };
        let stopped = StopOnDrop(&self.inner);

        if let Some(SessionHandles {
            work_tx,
            shutdown,
            worker,
            dispatcher,
        }) = handles
        {
            info!("Ending navigation session");
            drop(work_tx);
            shutdown.cancel();

            if let Err(e) = worker.await {
                warn!(error = %e, "Route worker task failed");
            }
            if let Err(e) = dispatcher.await {
                warn!(error = %e, "Route dispatcher task failed");
            }
        }

        drop(stopped);
        info!("Navigation session stopped");
    }

    fn send(&self, item: WorkItem) -> Result<(), ProcessorError> {
        let inner = self.inner.lock();
        match (&inner.state, &inner.handles) {
            (ProcessorState::Active, Some(handles)) => handles
                .work_tx
                .send(item)
                .map_err(|_| ProcessorError::Stopped),
            (state, _) => Err(ProcessorError::NotActive(*state)),
        }
    }
}

impl Drop for RouteProcessor {
    fn drop(&mut self) {
        if let Some(handles) = self.inner.get_mut().handles.take() {
            handles.shutdown.cancel();
        }
    }
}

// =============================================================================
// Background tasks
// =============================================================================

struct RouteWorker {
    session: NavigationSession,
    work_rx: mpsc::UnboundedReceiver<WorkItem>,
    dispatch_tx: mpsc::UnboundedSender<Dispatch>,
}

impl RouteWorker {
    /// Process queued items one at a time until shutdown.
    async fn run(self, shutdown: CancellationToken) {
        let Self {
            mut session,
            mut work_rx,
            dispatch_tx,
        } = self;

        debug!("Route worker starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Route worker shutting down");
                    break;
                }

                item = work_rx.recv() => match item {
                    Some(item) => Self::handle(&mut session, item, &dispatch_tx),
                    None => break,
                },
            }
        }

        work_rx.close();
        let mut discarded = 0usize;
        while work_rx.try_recv().is_ok() {
            discarded += 1;
        }

        info!(
            processed = session.sequence(),
            discarded,
            "Route worker stopped"
        );
    }

    fn handle(
        session: &mut NavigationSession,
        item: WorkItem,
        dispatch_tx: &mpsc::UnboundedSender<Dispatch>,
    ) {
        match item {
            WorkItem::Sample(sample) => Self::process(session, sample, dispatch_tx),
            WorkItem::Initial {
                last_known,
                now_millis,
            } => {
                let sample = session.initial_sample(last_known, now_millis);
                debug!(source = %sample.source_id, "Processing initial sample");
                Self::process(session, sample, dispatch_tx);
            }
            WorkItem::Reroute(route) => {
                if let Err(e) = session.apply_route(route) {
                    warn!(error = %e, "Reroute rejected");
                }
            }
            WorkItem::Flush(done) => {
                // Listener may already be gone; the waiter then sees `Stopped`.
                let _ = dispatch_tx.send(Dispatch::Flush(done));
            }
        }
    }

    fn process(
        session: &mut NavigationSession,
        sample: PositionSample,
        dispatch_tx: &mpsc::UnboundedSender<Dispatch>,
    ) {
        let timestamp = sample.timestamp_millis;
        match session.process(sample) {
            Ok(update) => {
                if dispatch_tx.send(Dispatch::Update(Box::new(update))).is_err() {
                    debug!("Route dispatcher gone, dropping update");
                }
            }
            Err(e @ ProcessingError::Sample(SampleError::Filtered(_))) => {
                debug!(timestamp, reason = %e, "Sample filtered");
            }
            Err(e) => {
                warn!(timestamp, kind = e.kind(), error = %e, "Skipping sample");
            }
        }
    }
}

/// Deliver updates to the listener in arrival order.
async fn run_dispatcher(
    listener: Arc<dyn RouteUpdateListener>,
    mut dispatch_rx: mpsc::UnboundedReceiver<Dispatch>,
) {
    while let Some(dispatch) = dispatch_rx.recv().await {
        match dispatch {
            Dispatch::Update(update) => {
                let delivered =
                    std::panic::catch_unwind(AssertUnwindSafe(|| listener.on_route_update(&update)));
                if delivered.is_err() {
                    warn!(sequence = update.sequence, "Route update listener panicked");
                }
            }
            Dispatch::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Route dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point_along_line;
    use crate::milestone::Trigger;
    use crate::route::fixtures::city_route;

    fn collecting() -> (Arc<Mutex<Vec<u64>>>, Arc<dyn RouteUpdateListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |update: &RouteUpdate| sink.lock().push(update.sequence);
        (seen, Arc::new(listener))
    }

    #[test]
    fn test_bind_without_runtime() {
        let (_, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let err = processor
            .bind_session(city_route(), NavigationOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::NoRuntime));
        assert_eq!(processor.state(), ProcessorState::Idle);
    }

    #[tokio::test]
    async fn test_idle_rejects_enqueue() {
        let (_, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let err = processor
            .enqueue(PositionSample::new(38.9, -77.04, 0))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::NotActive(ProcessorState::Idle)));
        assert!(matches!(
            processor.flush().await,
            Err(ProcessorError::NotActive(ProcessorState::Idle))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (seen, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let route = Arc::new(city_route());

        processor
            .bind_session(Arc::clone(&route), NavigationOptions::default())
            .unwrap();
        assert_eq!(processor.state(), ProcessorState::Active);
        assert!(matches!(
            processor.bind_session(Arc::clone(&route), NavigationOptions::default()),
            Err(ProcessorError::AlreadyActive(ProcessorState::Active))
        ));

        let geometry = &route.legs[0].steps[0].geometry;
        for i in 0..3 {
            let point = point_along_line(geometry, 10.0 * i as f64).unwrap();
            processor.enqueue(PositionSample::at(point, i * 1_000)).unwrap();
        }
        processor.flush().await.unwrap();
        assert_eq!(*seen.lock(), vec![1, 2, 3]);

        processor.end_session().await;
        assert_eq!(processor.state(), ProcessorState::Stopped);
        processor.end_session().await;
        assert_eq!(processor.state(), ProcessorState::Stopped);

        assert!(matches!(
            processor.enqueue(PositionSample::new(38.9, -77.04, 0)),
            Err(ProcessorError::NotActive(ProcessorState::Stopped))
        ));

        processor
            .bind_session(route, NavigationOptions::default())
            .unwrap();
        assert_eq!(processor.state(), ProcessorState::Active);
        processor.end_session().await;
    }

    #[tokio::test]
    async fn test_invalid_route_leaves_processor_idle() {
        let (_, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let err = processor
            .bind_session(Route::new(vec![]), NavigationOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidRoute(_)));
        assert_eq!(processor.state(), ProcessorState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_end_session_still_stops() {
        let (seen, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let route = Arc::new(city_route());
        processor
            .bind_session(Arc::clone(&route), NavigationOptions::default())
            .unwrap();

        // The worker has not run yet, so ending the session is still joining
        // it when the other branch wins.
        tokio::select! {
            biased;
            _ = processor.end_session() => {}
            _ = std::future::ready(()) => {}
        }
        assert_eq!(processor.state(), ProcessorState::Stopped);

        processor
            .bind_session(Arc::clone(&route), NavigationOptions::default())
            .unwrap();
        let start = route.legs[0].steps[0].geometry[0];
        processor.enqueue(PositionSample::at(start, 0)).unwrap();
        processor.flush().await.unwrap();
        assert_eq!(*seen.lock(), vec![1]);
        processor.end_session().await;
        assert_eq!(processor.state(), ProcessorState::Stopped);
    }

    #[tokio::test]
    async fn test_panicking_milestone_does_not_stall_queue() {
        let (seen, listener) = collecting();
        let processor = RouteProcessor::new(listener);
        let route = Arc::new(city_route());
        let milestones = vec![Milestone::new(
            1,
            Trigger::custom(|previous, _| {
                if previous.is_some() {
                    panic!("milestone failure");
                }
                false
            }),
        )];
        processor
            .bind_session_with_milestones(Arc::clone(&route), NavigationOptions::default(), milestones)
            .unwrap();

        let geometry = &route.legs[0].steps[0].geometry;
        for i in 0..5 {
            let point = point_along_line(geometry, 10.0 * i as f64).unwrap();
            processor.enqueue(PositionSample::at(point, i * 1_000)).unwrap();
        }
        processor.flush().await.unwrap();
        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
        assert_eq!(processor.state(), ProcessorState::Active);
        processor.end_session().await;
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |update: &RouteUpdate| {
            if update.sequence == 1 {
                panic!("listener failure");
            }
            sink.lock().push(update.sequence);
        };
        let processor = RouteProcessor::new(Arc::new(listener));
        let route = Arc::new(city_route());
        processor
            .bind_session(Arc::clone(&route), NavigationOptions::default())
            .unwrap();

        let geometry = &route.legs[0].steps[0].geometry;
        for i in 0..2 {
            let point = point_along_line(geometry, 10.0 * i as f64).unwrap();
            processor.enqueue(PositionSample::at(point, i * 1_000)).unwrap();
        }
        processor.flush().await.unwrap();
        assert_eq!(*seen.lock(), vec![2]);
        processor.end_session().await;
    }
}
