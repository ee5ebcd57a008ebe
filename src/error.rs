//! Error types for the frame loop.
//!
//! Contract violations (bad row ranges, mismatched planes) panic at the call
//! site. These types cover what a caller can reasonably get wrong at runtime.

use thiserror::Error;

/// Rejected [`PipelineConfig`](crate::pipeline::PipelineConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Frame size must be non-zero, got {width}×{height}")]
    EmptyFrame { width: usize, height: usize },

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Controller index {controller} is out of range for {workers} workers")]
    ControllerOutOfRange { controller: usize, workers: usize },

    #[error("Frame budget must be at least 1 frame")]
    ZeroFrameBudget,
}

/// Failure of the frame loop itself, as opposed to its source or sink.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        source: std::io::Error,
    },

    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
}

/// A source delivered a frame whose size differs from the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Frame is {actual_width}×{actual_height}, expected {expected_width}×{expected_height}")]
pub struct FrameShapeMismatch {
    pub expected_width: usize,
    pub expected_height: usize,
    pub actual_width: usize,
    pub actual_height: usize,
}
