// pipeline.rs -- Persistent multi-threaded frame loop.
//
// Workers are started once per run and stay alive for every frame. Each
// owns a fixed row range (partition.rs) and runs the same four-barrier
// cycle. Exactly one of them, chosen by configuration, is the controller:
//
//   controller                      helpers
//   ──────────                      ───────
//   acquire frame from source
//   ────────────── B1: acquire ─────────────
//   gray: own rows                  gray: own rows
//   ────────────── B2: gray ────────────────
//   edge: own rows                  edge: own rows
//   ────────────── B3: edge ────────────────
//   publish magnitude to sink
//   decide: continue or stop
//   ────────────── B4: publish ─────────────
//
// To stop, the controller raises the barrier's shutdown flag and still
// arrives at the next barrier; every worker sees Shutdown there and leaves
// the loop. The controller runs on the calling thread, so the source and
// sink do not need to be Send.
//
// A panic in any worker aborts the barrier (AbortOnUnwind) so the others
// return instead of waiting forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::barrier::StageBarrier;
use crate::context::FrameContext;
use crate::error::{ConfigError, FrameShapeMismatch, PipelineError};
use crate::frame::ColorFrame;
use crate::image::Image;
use crate::kernels::KernelPath;
use crate::partition::{partition, RowRange};
use crate::telemetry::{EndReason, FrameTiming, NoTelemetry, RunSummary, TelemetrySink};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Frame loop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Frame width in pixels. Every acquired frame must match.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Number of workers, controller included.
    pub workers: usize,
    /// Index of the worker that acquires and publishes.
    pub controller: usize,
    /// Stop after this many published frames. `None` runs until the source
    /// ends or a stop is requested.
    pub max_frames: Option<u64>,
    /// Kernel path for both stages.
    pub kernel: KernelPath,
}

impl Default for PipelineConfig {
    /// VGA capture, two workers, worker 0 in control.
    fn default() -> Self {
        PipelineConfig {
            width: 640,
            height: 480,
            workers: 2,
            controller: 0,
            max_frames: None,
            kernel: KernelPath::Batched,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.controller >= self.workers {
            return Err(ConfigError::ControllerOutOfRange {
                controller: self.controller,
                workers: self.workers,
            });
        }
        if self.max_frames == Some(0) {
            return Err(ConfigError::ZeroFrameBudget);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// Acquires, publishes and decides termination, besides its own rows.
    Controller,
    /// Processes its rows only.
    Helper,
}

/// What one worker does for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub index: usize,
    pub role: WorkerRole,
    /// Rows this worker owns in both stages.
    pub rows: RowRange,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Where frames come from (a camera, a file, a generator).
pub trait FrameSource {
    /// The next frame, or `Ok(None)` at end of stream.
    fn acquire(&mut self) -> anyhow::Result<Option<ColorFrame>>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> anyhow::Result<Option<ColorFrame>>,
{
    fn acquire(&mut self) -> anyhow::Result<Option<ColorFrame>> {
        self()
    }
}

/// Where finished magnitude planes go (a window, an encoder, a test).
pub trait FrameSink {
    fn publish(&mut self, frame_index: u64, magnitude: &Image<u8>) -> anyhow::Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(u64, &Image<u8>) -> anyhow::Result<()>,
{
    fn publish(&mut self, frame_index: u64, magnitude: &Image<u8>) -> anyhow::Result<()> {
        self(frame_index, magnitude)
    }
}

/// Requests a stop from outside the loop. Checked by the controller after
/// each published frame, so the frame in flight is always completed.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous stop so the loop can run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

/// A validated pipeline, ready to run.
#[derive(Debug)]
pub struct FrameLoop {
    config: PipelineConfig,
    assignments: Vec<WorkerAssignment>,
    stop: StopHandle,
}

impl FrameLoop {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let assignments = partition(config.height, config.workers)
            .into_iter()
            .enumerate()
            .map(|(index, rows)| WorkerAssignment {
                index,
                role: if index == config.controller {
                    WorkerRole::Controller
                } else {
                    WorkerRole::Helper
                },
                rows,
            })
            .collect();
        Ok(FrameLoop {
            config,
            assignments,
            stop: StopHandle::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// One entry per worker, in worker index order.
    pub fn assignments(&self) -> &[WorkerAssignment] {
        &self.assignments
    }

    /// Handle that stops a running (or the next) [`run`](Self::run).
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until the source ends, the sink fails, the frame budget is spent
    /// or a stop is requested.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.run_with_telemetry(source, sink, &mut NoTelemetry)
    }

    /// [`run`](Self::run), reporting each frame's stage timings to `telemetry`.
    pub fn run_with_telemetry<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        telemetry: &mut dyn TelemetrySink,
    ) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let cfg = &self.config;
        let ctx = FrameContext::new(cfg.width, cfg.height, cfg.workers, cfg.kernel);
        let controller = self.assignments[cfg.controller];

        info!(
            width = cfg.width,
            height = cfg.height,
            workers = cfg.workers,
            controller = cfg.controller,
            kernel = cfg.kernel.name(),
            "Starting frame loop"
        );

        thread::scope(|scope| {
            let mut helpers = Vec::with_capacity(cfg.workers.saturating_sub(1));
            for &assignment in self.assignments.iter().filter(|a| a.role == WorkerRole::Helper) {
                let ctx = &ctx;
                let spawned = thread::Builder::new()
                    .name(format!("sobel-worker-{}", assignment.index))
                    .spawn_scoped(scope, move || helper_loop(ctx, assignment));
                match spawned {
                    Ok(handle) => helpers.push((assignment.index, handle)),
                    Err(err) => {
                        error!(worker = assignment.index, "Failed to spawn worker: {err}");
                        // Already running helpers are parked at B1; let them go.
                        ctx.barrier().abort();
                        return Err(PipelineError::Spawn {
                            index: assignment.index,
                            source: err,
                        });
                    }
                }
            }

            let summary = Controller {
                ctx: &ctx,
                rows: controller.rows,
                config: cfg,
                stop: &self.stop,
            }
            .run(source, sink, telemetry);

            let mut panicked = None;
            for (index, handle) in helpers {
                if handle.join().is_err() {
                    error!(worker = index, "Worker panicked");
                    panicked.get_or_insert(index);
                }
            }
            match panicked {
                Some(index) => Err(PipelineError::WorkerPanicked(index)),
                None => {
                    info!(
                        frames = summary.frames,
                        fps = summary.fps(),
                        reason = %summary.end_reason,
                        "Frame loop finished"
                    );
                    debug!("\n{summary}");
                    Ok(summary)
                }
            }
        })
    }
}

/// Aborts the barrier if the owning worker unwinds.
struct AbortOnUnwind<'a>(&'a StageBarrier);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

fn helper_loop(ctx: &FrameContext, assignment: WorkerAssignment) {
    let _guard = AbortOnUnwind(ctx.barrier());
    let barrier = ctx.barrier();
    let mut frames = 0u64;
    loop {
        // B1: controller has installed a frame.
        if barrier.wait().is_shutdown() {
            break;
        }
        // SAFETY: gray stage, rows are this worker's own partition range.
        unsafe { ctx.gray_stage(assignment.rows) };
        if barrier.wait().is_shutdown() {
            break;
        }
        // SAFETY: edge stage, same disjoint rows.
        unsafe { ctx.edge_stage(assignment.rows) };
        if barrier.wait().is_shutdown() {
            break;
        }
        // B4: controller is publishing.
        if barrier.wait().is_shutdown() {
            break;
        }
        frames += 1;
    }
    debug!(worker = assignment.index, frames, "Worker exiting");
}

struct Controller<'a> {
    ctx: &'a FrameContext,
    rows: RowRange,
    config: &'a PipelineConfig,
    stop: &'a StopHandle,
}

impl Controller<'_> {
    fn run<S, K>(&self, source: &mut S, sink: &mut K, telemetry: &mut dyn TelemetrySink) -> RunSummary
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let _guard = AbortOnUnwind(self.ctx.barrier());
        let barrier = self.ctx.barrier();
        let started = Instant::now();
        let mut summary = RunSummary::new();
        let mut end_reason = None;
        let mut frame_index = 0u64;

        loop {
            // Acquire
            let t = Instant::now();
            match self.acquire(source) {
                Ok(frame) => {
                    // SAFETY: acquire stage; helpers are parked at B1.
                    unsafe { self.ctx.install_frame(frame) };
                }
                Err(reason) => {
                    end_reason = Some(reason);
                    barrier.request_shutdown();
                }
            }
            if barrier.wait().is_shutdown() {
                break;
            }
            let acquire = t.elapsed();

            // Gray
            let t = Instant::now();
            // SAFETY: gray stage, controller's own rows.
            unsafe { self.ctx.gray_stage(self.rows) };
            if barrier.wait().is_shutdown() {
                break;
            }
            let gray = t.elapsed();

            // Edge
            let t = Instant::now();
            // SAFETY: edge stage, controller's own rows.
            unsafe { self.ctx.edge_stage(self.rows) };
            if barrier.wait().is_shutdown() {
                break;
            }
            let edge = t.elapsed();

            // Publish
            let t = Instant::now();
            // SAFETY: publish stage; helpers are parked at B4.
            let published = sink.publish(frame_index, unsafe { self.ctx.magnitude() });
            match published {
                Ok(()) => {
                    let timing = FrameTiming {
                        frame_index,
                        acquire,
                        gray,
                        edge,
                        publish: t.elapsed(),
                    };
                    debug!(
                        frame = frame_index,
                        acquire_us = timing.acquire.as_micros() as u64,
                        gray_us = timing.gray.as_micros() as u64,
                        edge_us = timing.edge.as_micros() as u64,
                        publish_us = timing.publish.as_micros() as u64,
                        "Frame published"
                    );
                    telemetry.record(&timing);
                    summary.add(&timing);
                    frame_index += 1;

                    if let Some(reason) = self.should_stop(frame_index) {
                        end_reason = Some(reason);
                        barrier.request_shutdown();
                    }
                }
                Err(e) => {
                    error!(frame = frame_index, "Sink failed: {e:#}");
                    end_reason = Some(EndReason::SinkFailed(format!("{e:#}")));
                    barrier.request_shutdown();
                }
            }
            if barrier.wait().is_shutdown() {
                break;
            }
        }

        summary.wall = started.elapsed();
        // A shutdown nobody requested here means a helper aborted the barrier;
        // the caller reports that as a panic.
        summary.end_reason = end_reason.unwrap_or(EndReason::StopRequested);
        summary
    }

    /// Next frame, or the reason the loop must end.
    fn acquire<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<ColorFrame, EndReason> {
        match source.acquire() {
            Ok(Some(frame)) => {
                if frame.width() != self.config.width || frame.height() != self.config.height {
                    let mismatch = FrameShapeMismatch {
                        expected_width: self.config.width,
                        expected_height: self.config.height,
                        actual_width: frame.width(),
                        actual_height: frame.height(),
                    };
                    warn!("Rejecting frame: {mismatch}");
                    return Err(EndReason::SourceFailed(mismatch.to_string()));
                }
                Ok(frame)
            }
            Ok(None) => {
                info!("Frame source reached end of stream");
                Err(EndReason::EndOfStream)
            }
            Err(e) => {
                warn!("Frame source failed: {e:#}");
                Err(EndReason::SourceFailed(format!("{e:#}")))
            }
        }
    }

    /// End-of-frame termination check.
    fn should_stop(&self, published: u64) -> Option<EndReason> {
        if self.config.max_frames.is_some_and(|max| published >= max) {
            return Some(EndReason::FrameBudget);
        }
        if self.stop.is_stopped() {
            return Some(EndReason::StopRequested);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workers: usize) -> PipelineConfig {
        PipelineConfig {
            width: 8,
            height: 6,
            workers,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = PipelineConfig::default();
        assert_eq!((cfg.width, cfg.height, cfg.workers), (640, 480, 2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut cfg = config(2);
        cfg.width = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyFrame { width: 0, height: 6 })
        );

        assert_eq!(config(0).validate(), Err(ConfigError::NoWorkers));

        let mut cfg = config(2);
        cfg.controller = 2;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ControllerOutOfRange {
                controller: 2,
                workers: 2
            })
        );

        let mut cfg = config(2);
        cfg.max_frames = Some(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroFrameBudget));
    }

    #[test]
    fn test_assignments_follow_partition() {
        let mut cfg = config(4);
        cfg.controller = 2;
        let fl = FrameLoop::new(cfg).unwrap();
        let a = fl.assignments();
        assert_eq!(a.len(), 4);
        assert_eq!(a[0].rows, RowRange::new(0, 2));
        assert_eq!(a[1].rows, RowRange::new(2, 4));
        assert_eq!(a[2].rows, RowRange::new(4, 5));
        assert_eq!(a[3].rows, RowRange::new(5, 6));
        let controllers: Vec<usize> = a
            .iter()
            .filter(|w| w.role == WorkerRole::Controller)
            .map(|w| w.index)
            .collect();
        assert_eq!(controllers, vec![2]);
    }

    #[test]
    fn test_immediate_end_of_stream_publishes_nothing() {
        let fl = FrameLoop::new(config(3)).unwrap();
        let mut source = || -> anyhow::Result<Option<ColorFrame>> { Ok(None) };
        let mut published = 0;
        let mut sink = |_: u64, _: &Image<u8>| -> anyhow::Result<()> {
            published += 1;
            Ok(())
        };
        let summary = fl.run(&mut source, &mut sink).unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.end_reason, EndReason::EndOfStream);
        assert_eq!(published, 0);
    }

    #[test]
    fn test_stop_handle_reset() {
        let h = StopHandle::default();
        let h2 = h.clone();
        h2.stop();
        assert!(h.is_stopped());
        h.reset();
        assert!(!h2.is_stopped());
    }
}
