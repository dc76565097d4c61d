//! Streaming capture session.
//!
//! [`StreamCaptureSession`] acquires a camera, samples it on a fixed
//! cadence and sends each frame to the annotation service, with at most one
//! frame request outstanding per running period. A tick that finds a
//! request still in flight is skipped, never queued, so under a slow
//! service the effective frame rate drops to the service's round-trip time.
//!
//! # Lifecycle
//!
//! ```text
//!   Idle --start()--> Running --stop()--> Idle
//! ```
//!
//! Each transition into `Running` bumps a generation counter. Ticks and
//! request completions carry the generation they were issued under and are
//! ignored once it is no longer current, so a response that arrives after
//! [`stop`](StreamCaptureSession::stop) never reaches the display.
//!
//! The in-flight flag is not tied to a generation: after a quick
//! stop/start, ticks keep being skipped until the previous run's request
//! has completed, so the session never has two frame requests outstanding.
//!
//! Generation, the in-flight flag and the camera handle share one mutex;
//! every transition happens under it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lookout_client::AnnotationService;
use lookout_core::display::DisplaySink;
use lookout_core::media::Frame;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::{CameraDevice, CameraHandle};
use crate::error::DeviceError;

/// Default interval between capture ticks.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(300);

/// Tunables for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Time between ticks.
    pub interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CAPTURE_INTERVAL,
        }
    }
}

/// Result of a successful [`StreamCaptureSession::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The camera was acquired and the timer started.
    Started { generation: u64 },
    /// The session was already running; nothing changed.
    AlreadyRunning,
}

/// Counters accumulated over the lifetime of a session object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Timer ticks handled while running.
    pub ticks: u64,
    /// Ticks skipped because a request was in flight.
    pub skipped: u64,
    /// Frame requests sent to the service.
    pub issued: u64,
    /// Annotated frames pushed to the display.
    pub displayed: u64,
    /// Capture or annotation failures.
    pub failed: u64,
    /// Responses dropped because the session stopped or restarted.
    pub discarded: u64,
}

struct SessionState {
    generation: u64,
    running: bool,
    in_flight: bool,
    camera: Option<Box<dyn CameraHandle>>,
    stats: CaptureStats,
}

struct Shared {
    state: Mutex<SessionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The running timer task and the token that stops it.
struct Timer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Continuous camera-to-annotation loop.
pub struct StreamCaptureSession {
    id: Uuid,
    device: Box<dyn CameraDevice>,
    service: Arc<dyn AnnotationService>,
    sink: Arc<dyn DisplaySink>,
    config: CaptureConfig,
    shared: Arc<Shared>,
    timer: Option<Timer>,
}

impl StreamCaptureSession {
    pub fn new(
        device: Box<dyn CameraDevice>,
        service: Arc<dyn AnnotationService>,
        sink: Arc<dyn DisplaySink>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            device,
            service,
            sink,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    generation: 0,
                    running: false,
                    in_flight: false,
                    camera: None,
                    stats: CaptureStats::default(),
                }),
            }),
            timer: None,
        }
    }

    /// Acquire the camera and start ticking.
    ///
    /// A no-op while already running. On [`DeviceError`] the session stays
    /// idle and the error is also notified on the display sink.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<StartOutcome, DeviceError> {
        if self.timer.is_some() {
            tracing::debug!(session_id = %self.id, "Capture session already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let camera = match self.device.open() {
            Ok(camera) => camera,
            Err(e) => {
                tracing::error!(
                    session_id = %self.id,
                    device = self.device.name(),
                    error = %e,
                    "Failed to acquire camera",
                );
                self.sink.notify_error(&e.to_string());
                return Err(e);
            }
        };

        let generation = {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.running = true;
            state.camera = Some(camera);
            state.generation
        };

        let ticker = Ticker {
            session_id: self.id,
            generation,
            shared: Arc::clone(&self.shared),
            service: Arc::clone(&self.service),
            sink: Arc::clone(&self.sink),
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(ticker, self.config.interval, cancel.clone()));
        self.timer = Some(Timer { cancel, task });

        tracing::info!(
            session_id = %self.id,
            generation,
            device = self.device.name(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Capture session started",
        );
        Ok(StartOutcome::Started { generation })
    }

    /// Stop ticking and release the camera.
    ///
    /// Returns `false` if the session was already idle. A request still in
    /// flight is left to finish in the background; its response is
    /// discarded.
    pub fn stop(&mut self) -> bool {
        let Some(timer) = self.timer.take() else {
            return false;
        };

        let (generation, camera) = {
            let mut state = self.shared.lock();
            let stopped = state.generation;
            state.generation += 1;
            state.running = false;
            (stopped, state.camera.take())
        };

        timer.cancel.cancel();
        timer.task.abort();
        if let Some(mut camera) = camera {
            camera.release();
        }

        tracing::info!(session_id = %self.id, generation, "Capture session stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Current generation; changes on every start and stop.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.lock().stats
    }
}

impl Drop for StreamCaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drive `ticker` until cancelled or its generation goes stale.
async fn run_timer(ticker: Ticker, interval: Duration, cancel: CancellationToken) {
    let mut clock = tokio::time::interval(interval);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = clock.tick() => {
                if !ticker.tick() {
                    break;
                }
            }
        }
    }

    tracing::debug!(
        session_id = %ticker.session_id,
        generation = ticker.generation,
        "Capture timer exited",
    );
}

/// Everything one running period needs to capture and annotate.
#[derive(Clone)]
struct Ticker {
    session_id: Uuid,
    generation: u64,
    shared: Arc<Shared>,
    service: Arc<dyn AnnotationService>,
    sink: Arc<dyn DisplaySink>,
}

impl Ticker {
    /// Handle one tick. Returns `false` once the generation is stale.
    fn tick(&self) -> bool {
        let frame = {
            let mut state = self.shared.lock();
            if state.generation != self.generation || !state.running {
                return false;
            }
            state.stats.ticks += 1;

            if state.in_flight {
                state.stats.skipped += 1;
                tracing::trace!(generation = self.generation, "Frame request in flight, skipping tick");
                return true;
            }

            let Some(camera) = state.camera.as_mut() else {
                return false;
            };
            match camera.capture() {
                Ok(frame) => {
                    state.in_flight = true;
                    frame
                }
                Err(e) => {
                    state.stats.failed += 1;
                    tracing::warn!(generation = self.generation, error = %e, "Frame capture failed");
                    return true;
                }
            }
        };

        let in_flight = InFlight {
            shared: Arc::clone(&self.shared),
        };
        let ticker = self.clone();
        tokio::spawn(async move { ticker.annotate(frame, in_flight).await });
        true
    }

    /// Send one frame and apply the response if still current.
    ///
    /// The display is only touched while the generation is current.
    async fn annotate(self, frame: Frame, _in_flight: InFlight) {
        {
            let mut state = self.shared.lock();
            if state.generation != self.generation {
                return;
            }
            state.stats.issued += 1;
        }

        let result = self.service.annotate_frame(&frame).await;

        let mut state = self.shared.lock();
        if state.generation != self.generation {
            state.stats.discarded += 1;
            tracing::debug!(
                generation = self.generation,
                current = state.generation,
                "Discarding response from a stopped capture run",
            );
            return;
        }

        match result {
            Ok(annotated) => {
                state.stats.displayed += 1;
                self.sink.show_frame(annotated);
            }
            Err(e) => {
                state.stats.failed += 1;
                tracing::warn!(
                    generation = self.generation,
                    kind = e.kind(),
                    error = %e,
                    "Frame annotation failed",
                );
            }
        }
    }
}

/// Clears the in-flight flag when the request task ends, including when the
/// service future panics or the task is dropped before or while running.
struct InFlight {
    shared: Arc<Shared>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared.lock().in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use lookout_client::{AnnotationError, TransportError};
    use lookout_core::display::MemoryDisplay;
    use lookout_core::media::MediaPayload;
    use lookout_core::result::{AnnotatedFrame, AnnotationResult};

    use super::*;

    // -----------------------------------------------------------------------
    // Doubles
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct DeviceLog {
        opens: AtomicUsize,
        releases: AtomicUsize,
    }

    struct FakeCamera {
        log: Arc<DeviceLog>,
        deny: bool,
    }

    impl CameraDevice for FakeCamera {
        fn name(&self) -> &str {
            "fake"
        }

        fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError> {
            if self.deny {
                return Err(DeviceError::PermissionDenied("fake".into()));
            }
            self.log.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeHandle {
                log: Arc::clone(&self.log),
                frames: 0,
            }))
        }
    }

    struct FakeHandle {
        log: Arc<DeviceLog>,
        frames: u8,
    }

    impl CameraHandle for FakeHandle {
        fn capture(&mut self) -> Result<Frame, DeviceError> {
            self.frames = self.frames.wrapping_add(1);
            Ok(Frame::jpeg(vec![self.frames]))
        }

        fn release(&mut self) {
            self.log.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Service with a fixed latency that tracks concurrent requests.
    struct SlowService {
        latency: Duration,
        fail_every: Option<usize>,
        calls: AtomicUsize,
        outstanding: AtomicUsize,
        max_outstanding: AtomicUsize,
    }

    impl SlowService {
        fn new(latency: Duration) -> Arc<Self> {
            Self::failing_every(latency, None)
        }

        fn failing_every(latency: Duration, fail_every: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                latency,
                fail_every,
                calls: AtomicUsize::new(0),
                outstanding: AtomicUsize::new(0),
                max_outstanding: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnnotationService for SlowService {
        async fn submit(
            &self,
            _payload: &MediaPayload,
        ) -> Result<AnnotationResult, AnnotationError> {
            Err(TransportError::Malformed {
                endpoint: "submit",
                reason: "not used by capture".into(),
            }
            .into())
        }

        async fn annotate_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_outstanding.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.latency).await;
            self.outstanding.fetch_sub(1, Ordering::SeqCst);

            if self.fail_every.is_some_and(|k| n % k == 0) {
                return Err(AnnotationError::Domain {
                    status: 500,
                    message: "inference failed".into(),
                });
            }
            Ok(AnnotatedFrame {
                frame: frame.to_data_url(),
            })
        }
    }

    struct Harness {
        session: StreamCaptureSession,
        log: Arc<DeviceLog>,
        service: Arc<SlowService>,
        display: Arc<MemoryDisplay>,
    }

    fn harness(service: Arc<SlowService>, deny: bool) -> Harness {
        let log = Arc::new(DeviceLog::default());
        let display = Arc::new(MemoryDisplay::new());
        let session = StreamCaptureSession::new(
            Box::new(FakeCamera {
                log: Arc::clone(&log),
                deny,
            }),
            Arc::clone(&service) as Arc<dyn AnnotationService>,
            Arc::clone(&display) as Arc<dyn DisplaySink>,
            CaptureConfig::default(),
        );
        Harness {
            session,
            log,
            service,
            display,
        }
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // -----------------------------------------------------------------------
    // Backpressure
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn slow_service_skips_ticks_instead_of_queueing() {
        let mut h = harness(SlowService::new(Duration::from_millis(1000)), false);

        h.session.start().unwrap();
        advance(3050).await;
        h.session.stop();

        let stats = h.session.stats();
        assert!(stats.ticks >= 10, "expected ~11 ticks, got {stats:?}");
        assert!(stats.issued >= 2, "expected a few requests, got {stats:?}");
        assert!(stats.issued < stats.ticks);
        assert_eq!(stats.issued + stats.skipped, stats.ticks);
        assert_eq!(h.service.calls() as u64, stats.issued);
        assert_eq!(h.service.max_outstanding.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_service_gets_a_request_every_tick() {
        let mut h = harness(SlowService::new(Duration::from_millis(10)), false);

        h.session.start().unwrap();
        advance(3050).await;
        h.session.stop();

        let stats = h.session.stats();
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.issued, stats.ticks);
        assert_eq!(stats.displayed, stats.issued);
        assert_eq!(h.display.snapshot().frames_shown as u64, stats.displayed);
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn stop_blocks_new_requests_and_late_responses() {
        let mut h = harness(SlowService::new(Duration::from_millis(1000)), false);

        h.session.start().unwrap();
        advance(100).await;
        assert_eq!(h.service.calls(), 1);

        assert!(h.session.stop());
        assert!(!h.session.is_running());
        assert_eq!(h.log.releases.load(Ordering::SeqCst), 1);

        advance(5000).await;

        assert_eq!(h.service.calls(), 1);
        let stats = h.session.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.displayed, 0);
        assert_eq!(h.display.snapshot().frames_shown, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_idle_is_a_noop() {
        let mut h = harness(SlowService::new(Duration::from_millis(10)), false);

        assert!(!h.session.stop());
        assert_eq!(h.log.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_running_session_releases_the_camera() {
        let h = harness(SlowService::new(Duration::from_millis(10)), false);
        let log = Arc::clone(&h.log);
        let mut session = h.session;

        session.start().unwrap();
        advance(50).await;
        drop(session);

        assert_eq!(log.releases.load(Ordering::SeqCst), 1);
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_a_noop() {
        let mut h = harness(SlowService::new(Duration::from_millis(10)), false);

        let first = h.session.start().unwrap();
        let second = h.session.start().unwrap();
        assert_matches!(first, StartOutcome::Started { generation: 1 });
        assert_eq!(second, StartOutcome::AlreadyRunning);
        assert_eq!(h.log.opens.load(Ordering::SeqCst), 1);

        advance(3050).await;
        h.session.stop();

        // One timer at 300ms over 3050ms fires at most 11 times.
        assert!(h.session.stats().ticks <= 11);
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_leaves_session_idle() {
        let mut h = harness(SlowService::new(Duration::from_millis(10)), true);

        let err = h.session.start().unwrap_err();

        assert_matches!(err, DeviceError::PermissionDenied(_));
        assert!(!h.session.is_running());
        assert_eq!(h.session.generation(), 0);

        advance(1000).await;
        assert_eq!(h.service.calls(), 0);
        assert_eq!(h.display.snapshot().errors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_waits_for_and_ignores_previous_run_response() {
        let mut h = harness(SlowService::new(Duration::from_millis(1000)), false);

        h.session.start().unwrap();
        advance(100).await;
        h.session.stop();
        let restarted = h.session.start().unwrap();
        assert_matches!(restarted, StartOutcome::Started { generation: 3 });

        // The first run's request is still outstanding: the new run skips.
        advance(500).await;
        assert_eq!(h.service.calls(), 1);
        assert!(h.session.stats().skipped >= 1);

        // Old response lands at t=1000 and is dropped; the new run's first
        // request goes out on the next free tick and completes by t=2300.
        advance(1900).await;

        let stats = h.session.stats();
        assert_eq!(stats.discarded, 1);
        assert!(stats.displayed >= 1, "{stats:?}");
        assert_eq!(h.log.opens.load(Ordering::SeqCst), 2);
        assert_eq!(h.service.max_outstanding.load(Ordering::SeqCst), 1);
        h.session.stop();
    }

    // -----------------------------------------------------------------------
    // Failure isolation
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn frame_failures_do_not_stop_the_loop() {
        let mut h = harness(
            SlowService::failing_every(Duration::from_millis(10), Some(2)),
            false,
        );

        h.session.start().unwrap();
        advance(3050).await;

        assert!(h.session.is_running());
        let stats = h.session.stats();
        assert!(stats.failed >= 4, "{stats:?}");
        assert!(stats.displayed >= 4, "{stats:?}");
        assert_eq!(stats.issued, stats.ticks);
        assert!(h.display.snapshot().errors.is_empty());
        h.session.stop();
    }

    /// Panics on its first request, then answers normally.
    #[derive(Default)]
    struct PanicOnceService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnnotationService for PanicOnceService {
        async fn submit(
            &self,
            _payload: &MediaPayload,
        ) -> Result<AnnotationResult, AnnotationError> {
            unreachable!("capture never uploads")
        }

        async fn annotate_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("service blew up");
            }
            Ok(AnnotatedFrame {
                frame: frame.to_data_url(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_request_does_not_wedge_the_gate() {
        let log = Arc::new(DeviceLog::default());
        let service = Arc::new(PanicOnceService::default());
        let display = Arc::new(MemoryDisplay::new());
        let mut session = StreamCaptureSession::new(
            Box::new(FakeCamera {
                log: Arc::clone(&log),
                deny: false,
            }),
            Arc::clone(&service) as Arc<dyn AnnotationService>,
            Arc::clone(&display) as Arc<dyn DisplaySink>,
            CaptureConfig::default(),
        );

        session.start().unwrap();
        advance(1050).await;
        session.stop();

        assert!(service.calls.load(Ordering::SeqCst) >= 3);
        let stats = session.stats();
        assert_eq!(stats.skipped, 0);
        assert!(stats.displayed >= 2, "{stats:?}");
    }
}
