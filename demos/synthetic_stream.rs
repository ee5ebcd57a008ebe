// demos/synthetic_stream.rs
//
// Run the threaded edge pipeline on a generated video of a moving bar.
//
//   cargo run --release --example synthetic_stream
//   SOBEL_WORKERS=4 SOBEL_FRAMES=500 RUST_LOG=debug cargo run --release --example synthetic_stream
//
// Prints the run summary and a coarse ASCII rendering of the last edge map.

use std::env;

use tracing_subscriber::EnvFilter;

use sobel_mt::{ColorFrame, FrameLoop, FrameTiming, Image, KernelPath, PipelineConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let workers = env_or("SOBEL_WORKERS", 2);
    let frames = env_or("SOBEL_FRAMES", 120) as u64;
    let kernel = match env::var("SOBEL_KERNEL").as_deref() {
        Ok("scalar") => KernelPath::Scalar,
        _ => KernelPath::Batched,
    };

    let config = PipelineConfig {
        workers,
        max_frames: Some(frames),
        kernel,
        ..Default::default()
    };
    let (w, h) = (config.width, config.height);
    let fl = FrameLoop::new(config)?;

    let mut t = 0usize;
    let mut source = || -> anyhow::Result<Option<ColorFrame>> {
        t += 1;
        Ok(Some(moving_bar(w, h, t)))
    };

    let mut last = Image::new(w, h);
    let mut sink = |_: u64, magnitude: &Image<u8>| -> anyhow::Result<()> {
        last.as_mut_slice().copy_from_slice(magnitude.as_slice());
        Ok(())
    };

    let mut timings: Vec<FrameTiming> = Vec::new();
    let summary = fl.run_with_telemetry(&mut source, &mut sink, &mut timings)?;

    println!("{summary}");
    if let Some(slowest) = timings.iter().max_by_key(|t| t.total()) {
        println!(
            "slowest frame: #{} ({:.3} ms)",
            slowest.frame_index,
            slowest.total().as_secs_f64() * 1e3
        );
    }
    print_ascii(&last, 64);
    Ok(())
}

/// Gray gradient background with a bright vertical bar and a dark box.
fn moving_bar(w: usize, h: usize, t: usize) -> ColorFrame {
    let bar = (t * 7) % w;
    ColorFrame::from_fn(w, h, |x, y| {
        if x >= bar && x < bar + 24 {
            [40, 220, 250]
        } else if (h / 3..h / 3 + 80).contains(&y) && (w / 4..w / 4 + 120).contains(&x) {
            [30, 10, 10]
        } else {
            let v = (x * 96 / w + y * 64 / h) as u8;
            [v, v, v]
        }
    })
}

/// Render `img` as `cols` characters wide, taking the max of each cell.
fn print_ascii(img: &Image<u8>, cols: usize) {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let cell = img.width().div_ceil(cols).max(1);
    let rows = img.height() / (cell * 2);
    for r in 0..rows {
        let line: String = (0..cols)
            .map(|c| {
                let mut peak = 0u8;
                for y in r * cell * 2..((r + 1) * cell * 2).min(img.height()) {
                    for x in c * cell..((c + 1) * cell).min(img.width()) {
                        peak = peak.max(img.get(x, y));
                    }
                }
                RAMP[peak as usize * (RAMP.len() - 1) / 255] as char
            })
            .collect();
        println!("{line}");
    }
}

fn env_or(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
