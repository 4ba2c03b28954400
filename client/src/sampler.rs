use crate::lock;
use crate::media::VideoSurface;
use crate::overlay::OverlaySurface;
use crate::throttle::Throttle;
use common::{PixelBuffer, crop_and_scale};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// What a sample handler hands back: either it finished on the spot, or it
/// still has work to do. Pending work is spawned, the frame loop never
/// waits for it.
pub enum SampleOutcome {
    Done,
    Pending(BoxFuture<'static, ()>),
}

/// Receives the square crop taken on each sample tick
pub trait SampleHandler: Send + Sync + 'static {
    fn on_sample(&self, sample: PixelBuffer) -> SampleOutcome;
}

impl<F> SampleHandler for F
where
    F: Fn(PixelBuffer) -> SampleOutcome + Send + Sync + 'static,
{
    fn on_sample(&self, sample: PixelBuffer) -> SampleOutcome {
        self(sample)
    }
}

/// What to do when a sample is due while earlier pending handler work has
/// not finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// drop the sample; at most one pending handler at a time
    #[default]
    SkipWhileBusy,
    /// dispatch anyway, pending handlers may run side by side
    Allow,
}

/// Result of one frame loop tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// no decoded frame yet, nothing drawn
    NotReady,
    /// guide redrawn, no sample due
    Drawn,
    /// guide redrawn and a sample dispatched
    Sampled,
    /// a sample was due but dropped because the handler is busy
    SkippedBusy,
}

/// Decrements the in-flight count when pending handler work ends, however
/// it ends
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(count))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-tick work of a capture session: redraw the guide and, when the
/// throttle allows, take a centered square sample of the frame
pub struct SampleLoop {
    throttle: Throttle,
    sample_size: usize,
    overlap: OverlapPolicy,
    handler: Arc<dyn SampleHandler>,
    /// pending handler futures still running
    in_flight: Arc<AtomicUsize>,
}

impl SampleLoop {
    pub fn new(
        handler: Arc<dyn SampleHandler>,
        interval: Duration,
        sample_size: usize,
        overlap: OverlapPolicy,
    ) -> Self {
        Self {
            throttle: Throttle::new(interval),
            sample_size,
            overlap,
            handler,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Forget the last sample time; the next ready tick samples
    pub fn reset(&mut self) {
        self.throttle.reset();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one tick at `now_ms`.
    ///
    /// Pending handler work is spawned onto the current tokio runtime.
    pub fn tick(
        &mut self,
        now_ms: f64,
        frame: Option<&PixelBuffer>,
        overlay: &mut OverlaySurface,
    ) -> TickOutcome {
        let Some(frame) = frame else {
            return TickOutcome::NotReady;
        };

        overlay.draw_guide();

        if !self.throttle.should_sample(now_ms) {
            return TickOutcome::Drawn;
        }

        if self.overlap == OverlapPolicy::SkipWhileBusy && self.in_flight() > 0 {
            trace!(now_ms, "sample dropped, handler still busy");
            return TickOutcome::SkippedBusy;
        }

        let sample = match crop_and_scale(frame, self.sample_size) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "failed to crop sample");
                return TickOutcome::Drawn;
            }
        };

        match self.handler.on_sample(sample) {
            SampleOutcome::Done => {}
            SampleOutcome::Pending(work) => {
                let guard = InFlight::enter(&self.in_flight);
                tokio::spawn(async move {
                    let _guard = guard;
                    work.await;
                });
            }
        }

        TickOutcome::Sampled
    }
}

/// Counters kept by `run_frame_loop`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub not_ready: u64,
    pub samples: u64,
    pub skipped_busy: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::NotReady => self.not_ready += 1,
            TickOutcome::Drawn => {}
            TickOutcome::Sampled => self.samples += 1,
            TickOutcome::SkippedBusy => self.skipped_busy += 1,
        }
    }
}

/// Drive `sample_loop` once per `period` until `cancel` fires.
///
/// Ticks run one after another on this task and never overlap. Timestamps
/// are milliseconds since the loop started.
pub async fn run_frame_loop(
    mut sample_loop: SampleLoop,
    video: VideoSurface,
    overlay: Arc<Mutex<OverlaySurface>>,
    period: Duration,
    cancel: CancellationToken,
) -> LoopStats {
    let mut stats = LoopStats::default();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    sample_loop.reset();
    let origin = Instant::now();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now_ms = origin.elapsed().as_secs_f64() * 1000.0;
        let frame = video.latest_frame();
        let outcome = {
            let mut overlay = lock(&overlay);
            sample_loop.tick(now_ms, frame.as_deref(), &mut overlay)
        };
        stats.record(outcome);
    }

    debug!(?stats, "frame loop finished");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::brightness;

    fn recording_handler() -> (Arc<dyn SampleHandler>, Arc<Mutex<Vec<PixelBuffer>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn SampleHandler> = Arc::new(move |sample: PixelBuffer| {
            sink.lock().unwrap().push(sample);
            SampleOutcome::Done
        });
        (handler, seen)
    }

    fn gray_frame(v: u8) -> PixelBuffer {
        PixelBuffer::filled(320, 240, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn nothing_happens_without_a_frame() {
        let (handler, seen) = recording_handler();
        let mut sample_loop =
            SampleLoop::new(handler, Duration::from_millis(400), 256, OverlapPolicy::Allow);
        let mut overlay = OverlaySurface::new(100, 100);

        assert_eq!(sample_loop.tick(0.0, None, &mut overlay), TickOutcome::NotReady);
        assert!(!overlay.is_painted(79, 49));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn first_ready_tick_samples_then_throttles() {
        let (handler, seen) = recording_handler();
        let mut sample_loop = SampleLoop::new(
            handler,
            Duration::from_millis(400),
            256,
            OverlapPolicy::SkipWhileBusy,
        );
        let mut overlay = OverlaySurface::new(100, 100);
        let frame = gray_frame(51);

        let outcomes: Vec<_> = [0.0, 100.0, 450.0, 460.0, 900.0]
            .iter()
            .map(|&t| sample_loop.tick(t, Some(&frame), &mut overlay))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Sampled,
                TickOutcome::Drawn,
                TickOutcome::Sampled,
                TickOutcome::Drawn,
                TickOutcome::Sampled,
            ]
        );
        assert!(overlay.is_painted(79, 49));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].dimensions(), (256, 256));
        assert!((brightness(&seen[0]) - 0.2).abs() < 1e-3);
    }

    #[test]
    fn sample_size_follows_configuration() {
        let (handler, seen) = recording_handler();
        let mut sample_loop =
            SampleLoop::new(handler, Duration::from_millis(400), 64, OverlapPolicy::Allow);
        let mut overlay = OverlaySurface::default();

        sample_loop.tick(0.0, Some(&gray_frame(10)), &mut overlay);
        assert_eq!(seen.lock().unwrap()[0].dimensions(), (64, 64));
    }

    fn slow_handler(calls: Arc<AtomicUsize>) -> Arc<dyn SampleHandler> {
        Arc::new(move |_sample: PixelBuffer| {
            calls.fetch_add(1, Ordering::SeqCst);
            SampleOutcome::Pending(Box::pin(async {
                tokio::time::sleep(Duration::from_millis(1000)).await;
            }))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn busy_handler_drops_samples_when_skipping() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut sample_loop = SampleLoop::new(
            slow_handler(Arc::clone(&calls)),
            Duration::from_millis(400),
            32,
            OverlapPolicy::SkipWhileBusy,
        );
        let mut overlay = OverlaySurface::new(10, 10);
        let frame = gray_frame(100);

        assert_eq!(sample_loop.tick(0.0, Some(&frame), &mut overlay), TickOutcome::Sampled);
        tokio::task::yield_now().await;
        assert_eq!(sample_loop.in_flight(), 1);

        assert_eq!(
            sample_loop.tick(500.0, Some(&frame), &mut overlay),
            TickOutcome::SkippedBusy
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sample_loop.in_flight(), 0);

        assert_eq!(
            sample_loop.tick(1000.0, Some(&frame), &mut overlay),
            TickOutcome::Sampled
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_handler_overlaps_when_allowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut sample_loop = SampleLoop::new(
            slow_handler(Arc::clone(&calls)),
            Duration::from_millis(400),
            32,
            OverlapPolicy::Allow,
        );
        let mut overlay = OverlaySurface::new(10, 10);
        let frame = gray_frame(100);

        for t in [0.0, 450.0, 900.0] {
            assert_eq!(sample_loop.tick(t, Some(&frame), &mut overlay), TickOutcome::Sampled);
        }
        tokio::task::yield_now().await;

        assert_eq!(sample_loop.in_flight(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sample_loop.in_flight(), 0);
    }
}
