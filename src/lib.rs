// sobel_mt: row-partitioned grayscale + Sobel edge pipeline
//
// A color frame is converted to 8-bit luma and then to a Sobel gradient
// magnitude map, with the rows of each frame split across a small fixed set
// of persistent worker threads that meet at stage barriers.
//
// Layering, leaf first:
//   arith, image, frame, partition   plain data and arithmetic
//   kernels, cpu_features            per-row scalar / SIMD code
//   convert, gradient                single-threaded stage functions
//   barrier, context, pipeline       the threaded frame loop
//   telemetry, error                 reporting

pub mod arith;
pub mod barrier;
mod context;
pub mod convert;
pub mod cpu_features;
pub mod error;
pub mod frame;
pub mod gradient;
pub mod image;
pub mod kernels;
pub mod partition;
pub mod pipeline;
pub mod telemetry;

pub use error::{ConfigError, FrameShapeMismatch, PipelineError};
pub use frame::ColorFrame;
pub use image::Image;
pub use kernels::KernelPath;
pub use partition::{partition, RowRange};
pub use pipeline::{FrameLoop, FrameSink, FrameSource, PipelineConfig, StopHandle};
pub use telemetry::{EndReason, FrameTiming, RunSummary, TelemetrySink};
