// telemetry.rs -- Per-frame stage timings and the end-of-run summary.
//
// The controller times its own share of each stage, from the moment it
// starts the stage to the moment the stage barrier releases it:
//
//   acquire ─▶ │ gray ─▶ │ edge ─▶ │ publish ─▶ │
//              B1        B2        B3           B4
//
// So `gray` includes waiting for the slowest worker, which is what a frame
// actually costs. The summary reports the share of wall time per stage the
// same way a perf report would.

use std::fmt;
use std::time::Duration;

/// One of the four per-frame stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquire,
    Gray,
    Edge,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Acquire, Stage::Gray, Stage::Edge, Stage::Publish];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Gray => "gray",
            Stage::Edge => "edge",
            Stage::Publish => "publish",
        }
    }
}

/// Stage durations for one published frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTiming {
    pub frame_index: u64,
    pub acquire: Duration,
    pub gray: Duration,
    pub edge: Duration,
    pub publish: Duration,
}

impl FrameTiming {
    pub fn stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Acquire => self.acquire,
            Stage::Gray => self.gray,
            Stage::Edge => self.edge,
            Stage::Publish => self.publish,
        }
    }

    pub fn total(&self) -> Duration {
        self.acquire + self.gray + self.edge + self.publish
    }
}

/// Receives a timing record after every published frame.
pub trait TelemetrySink {
    fn record(&mut self, timing: &FrameTiming);
}

impl TelemetrySink for Vec<FrameTiming> {
    fn record(&mut self, timing: &FrameTiming) {
        self.push(*timing);
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn record(&mut self, _timing: &FrameTiming) {}
}

/// Why the frame loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The source reported no more frames.
    EndOfStream,
    /// The configured frame budget was reached.
    FrameBudget,
    /// A [`StopHandle`](crate::pipeline::StopHandle) was triggered.
    StopRequested,
    /// The source returned an error or a frame of the wrong size.
    SourceFailed(String),
    /// The sink rejected a frame.
    SinkFailed(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::EndOfStream => write!(f, "end of stream"),
            EndReason::FrameBudget => write!(f, "frame budget reached"),
            EndReason::StopRequested => write!(f, "stop requested"),
            EndReason::SourceFailed(e) => write!(f, "source failed: {e}"),
            EndReason::SinkFailed(e) => write!(f, "sink failed: {e}"),
        }
    }
}

/// Totals over a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Frames published.
    pub frames: u64,
    pub acquire: Duration,
    pub gray: Duration,
    pub edge: Duration,
    pub publish: Duration,
    /// Wall time from the first acquire to the final barrier.
    pub wall: Duration,
    pub end_reason: EndReason,
}

impl RunSummary {
    pub(crate) fn new() -> Self {
        RunSummary {
            frames: 0,
            acquire: Duration::ZERO,
            gray: Duration::ZERO,
            edge: Duration::ZERO,
            publish: Duration::ZERO,
            wall: Duration::ZERO,
            end_reason: EndReason::EndOfStream,
        }
    }

    pub(crate) fn add(&mut self, t: &FrameTiming) {
        self.frames += 1;
        self.acquire += t.acquire;
        self.gray += t.gray;
        self.edge += t.edge;
        self.publish += t.publish;
    }

    pub fn stage_total(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Acquire => self.acquire,
            Stage::Gray => self.gray,
            Stage::Edge => self.edge,
            Stage::Publish => self.publish,
        }
    }

    /// Sum of all stage totals.
    pub fn busy(&self) -> Duration {
        self.acquire + self.gray + self.edge + self.publish
    }

    /// Share of the summed stage time spent in `stage`, in percent.
    pub fn stage_percent(&self, stage: Stage) -> f64 {
        let busy = self.busy().as_secs_f64();
        if busy == 0.0 {
            return 0.0;
        }
        100.0 * self.stage_total(stage).as_secs_f64() / busy
    }

    /// Published frames per second of wall time.
    pub fn fps(&self) -> f64 {
        let wall = self.wall.as_secs_f64();
        if wall == 0.0 {
            return 0.0;
        }
        self.frames as f64 / wall
    }

    /// Mean summed stage time per published frame.
    pub fn mean_frame_time(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.busy().div_f64(self.frames as f64)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} frames in {:.3}s ({:.1} fps, {:.3} ms/frame), {}",
            self.frames,
            self.wall.as_secs_f64(),
            self.fps(),
            self.mean_frame_time().as_secs_f64() * 1e3,
            self.end_reason,
        )?;
        for stage in Stage::ALL {
            writeln!(
                f,
                "  {:<8} {:>10.3} ms  {:>5.1}%",
                stage.name(),
                self.stage_total(stage).as_secs_f64() * 1e3,
                self.stage_percent(stage),
            )?;
        }
        Ok(())
    }
}
