use log::{debug, trace};

use crate::config::SamplerConfig;

use super::clock::{Clock, MonotonicClock};
use super::cpu::ThreadProbe;
use super::memory::MemoryProbe;
use super::resources::{OsProbe, ResourceSampler};
use super::types::PerformanceReport;
use super::window::FrameTimestampWindow;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SamplerState {
    Idle,
    WarmingUp { start_time: f64 },
    Active,
}

/// Receives every report synchronously from inside `on_tick`. Must not block;
/// moving the report to another thread is the sink's business.
pub trait ReportSink {
    fn report(&mut self, report: PerformanceReport);
}

impl<F> ReportSink for F
where
    F: FnMut(PerformanceReport),
{
    fn report(&mut self, report: PerformanceReport) {
        self(report)
    }
}

/// Host application visibility changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Background,
}

/// Per-frame sampler driven by an external tick source.
///
/// Every tick lands in the FPS window. After `start()` the sampler waits out
/// the warm-up on the wall clock; the tick that completes it only flips the
/// state, and every tick after that samples CPU and memory and hands one
/// report to the sink.
pub struct PerformanceSampler<C = MonotonicClock, P = OsProbe> {
    config: SamplerConfig,
    window: FrameTimestampWindow,
    state: SamplerState,
    clock: C,
    resources: ResourceSampler<P>,
    sink: Box<dyn ReportSink>,
}

impl PerformanceSampler {
    pub fn new(sink: impl ReportSink + 'static) -> Self {
        PerformanceSampler::with_config(SamplerConfig::default(), sink)
    }

    pub fn with_config(config: SamplerConfig, sink: impl ReportSink + 'static) -> Self {
        PerformanceSampler::with_parts(config, MonotonicClock, ResourceSampler::new(), sink)
    }
}

impl<C, P> PerformanceSampler<C, P>
where
    C: Clock,
    P: ThreadProbe + MemoryProbe,
{
    pub fn with_parts(
        config: SamplerConfig,
        clock: C,
        resources: ResourceSampler<P>,
        sink: impl ReportSink + 'static,
    ) -> Self {
        PerformanceSampler {
            config,
            window: FrameTimestampWindow::with_span(config.window_secs),
            state: SamplerState::Idle,
            clock,
            resources,
            sink: Box::new(sink),
        }
    }

    pub fn set_sink(&mut self, sink: impl ReportSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Begins (or restarts) warm-up from the current wall-clock time.
    pub fn start(&mut self) {
        let start_time = self.clock.now();
        debug!(
            "performance sampler warming up from {:.3} (was {:?})",
            start_time, self.state
        );
        self.state = SamplerState::WarmingUp { start_time };
    }

    /// Stops reporting. Tick history stays in the window.
    pub fn pause(&mut self) {
        if self.state != SamplerState::Idle {
            debug!("performance sampler paused");
        }
        self.state = SamplerState::Idle;
    }

    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Foreground => self.start(),
            LifecycleEvent::Background => self.pause(),
        }
    }

    pub fn on_tick(&mut self, timestamp: f64) {
        self.window.append(timestamp);

        match self.state {
            SamplerState::Idle => {}
            SamplerState::WarmingUp { start_time } => {
                let elapsed = self.clock.now() - start_time;
                if elapsed >= self.config.warm_up_secs {
                    debug!("performance sampler active after {:.3}s warm-up", elapsed);
                    self.state = SamplerState::Active;
                }
            }
            SamplerState::Active => {
                let resources = self.resources.sample();
                let report = PerformanceReport::new(self.window.count(), resources);
                trace!("{}", report);
                self.sink.report(report);
            }
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != SamplerState::Idle
    }

    pub fn fps(&self) -> usize {
        self.window.count()
    }

    pub fn window(&self) -> &FrameTimestampWindow {
        &self.window
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceSampler<P> {
        &self.resources
    }
}
