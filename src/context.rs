// context.rs -- State shared by all workers for one run of the frame loop.
//
// One FrameContext lives on the stack of FrameLoop::run and every worker
// borrows it. Nothing here is a global:
//
//   FrameContext
//   ├── frame      StageCell<Option<ColorFrame>>  written: acquire   read: gray
//   ├── luma       SharedPlane                    written: gray      read: edge
//   ├── magnitude  SharedPlane                    written: edge      read: publish
//   └── barrier    StageBarrier
//
// The planes are allocated once and reused for every frame. Luma is fully
// rewritten each frame; the magnitude border is never written, so it stays
// at its initial zeros for the whole run.
//
// Within a stage, workers write disjoint row bands; across stages the barrier
// orders every write before every read. Those two facts are what the unsafe
// accessors below rely on, and the frame loop is the only caller.

use std::cell::UnsafeCell;

use crate::barrier::StageBarrier;
use crate::convert;
use crate::frame::ColorFrame;
use crate::gradient;
use crate::image::{Image, RowBandMut};
use crate::kernels::KernelPath;
use crate::partition::RowRange;

/// A value written by one stage and read by the next.
pub(crate) struct StageCell<T>(UnsafeCell<T>);

// SAFETY: access is serialized by the stage barrier (see module comment).
unsafe impl<T: Send + Sync> Sync for StageCell<T> {}

impl<T> StageCell<T> {
    pub(crate) fn new(value: T) -> Self {
        StageCell(UnsafeCell::new(value))
    }

    /// # Safety
    /// No thread may hold a reference from [`get_mut`](Self::get_mut).
    pub(crate) unsafe fn get(&self) -> &T {
        unsafe { &*self.0.get() }
    }

    /// # Safety
    /// The caller must be the only thread touching the cell in this stage.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn get_mut(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}

/// An 8-bit plane that several threads write in disjoint row bands.
pub(crate) struct SharedPlane {
    image: UnsafeCell<Image<u8>>,
    /// Base of the image buffer, captured once. The buffer is never resized.
    base: *mut u8,
    width: usize,
    height: usize,
    stride: usize,
}

// SAFETY: bands handed out within one stage are disjoint, and reads happen
// only in a later stage than the writes they observe.
unsafe impl Sync for SharedPlane {}

impl SharedPlane {
    pub(crate) fn new(mut image: Image<u8>) -> Self {
        let base = image.as_mut_slice().as_mut_ptr();
        SharedPlane {
            width: image.width(),
            height: image.height(),
            stride: image.stride(),
            base,
            image: UnsafeCell::new(image),
        }
    }

    /// Mutable view of `rows`.
    ///
    /// # Safety
    /// No other live band may overlap `rows`, and nobody may hold the
    /// reference from [`image`](Self::image) while the band is alive.
    ///
    /// # Panics
    /// Panics if `rows.end > height`.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn band_mut(&self, rows: RowRange) -> RowBandMut<'_, u8> {
        assert!(
            rows.end <= self.height,
            "row range {rows:?} exceeds plane height {}",
            self.height
        );
        let data = unsafe {
            std::slice::from_raw_parts_mut(self.base.add(rows.start * self.stride), rows.len() * self.stride)
        };
        RowBandMut::new(data, rows, self.width, self.stride)
    }

    /// Read-only view of the whole plane.
    ///
    /// # Safety
    /// No band of this plane may be alive.
    pub(crate) unsafe fn image(&self) -> &Image<u8> {
        unsafe { &*self.image.get() }
    }
}

/// Everything a worker needs to run its share of a frame.
pub(crate) struct FrameContext {
    frame: StageCell<Option<ColorFrame>>,
    luma: SharedPlane,
    magnitude: SharedPlane,
    barrier: StageBarrier,
    kernel: KernelPath,
}

impl FrameContext {
    pub(crate) fn new(width: usize, height: usize, workers: usize, kernel: KernelPath) -> Self {
        FrameContext {
            frame: StageCell::new(None),
            luma: SharedPlane::new(Image::new(width, height)),
            magnitude: SharedPlane::new(Image::new(width, height)),
            barrier: StageBarrier::new(workers),
            kernel,
        }
    }

    #[inline]
    pub(crate) fn barrier(&self) -> &StageBarrier {
        &self.barrier
    }

    /// Store the frame for the coming gray stage.
    ///
    /// # Safety
    /// Acquire stage only, controller only.
    pub(crate) unsafe fn install_frame(&self, frame: ColorFrame) {
        unsafe {
            *self.frame.get_mut() = Some(frame);
        }
    }

    /// Convert this worker's rows of the current frame to luma.
    ///
    /// # Safety
    /// Gray stage only, with `rows` disjoint from every other worker's.
    pub(crate) unsafe fn gray_stage(&self, rows: RowRange) {
        unsafe {
            if let Some(frame) = self.frame.get() {
                let mut band = self.luma.band_mut(rows);
                convert::bgr_to_luma_band(self.kernel, frame, &mut band);
            }
        }
    }

    /// Compute this worker's rows of the gradient magnitude.
    ///
    /// # Safety
    /// Edge stage only, with `rows` disjoint from every other worker's.
    pub(crate) unsafe fn edge_stage(&self, rows: RowRange) {
        unsafe {
            let luma = self.luma.image();
            let mut band = self.magnitude.band_mut(rows);
            gradient::sobel_magnitude_band(self.kernel, luma, &mut band);
        }
    }

    /// The finished magnitude plane.
    ///
    /// # Safety
    /// Publish stage only.
    pub(crate) unsafe fn magnitude(&self) -> &Image<u8> {
        unsafe { self.magnitude.image() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    #[test]
    fn test_bands_write_through_to_plane() {
        let plane = SharedPlane::new(Image::new(4, 6));
        for (k, rows) in partition(6, 3).into_iter().enumerate() {
            let mut band = unsafe { plane.band_mut(rows) };
            for y in rows {
                band.row_mut(y).fill(k as u8 + 1);
            }
        }
        let img = unsafe { plane.image() };
        assert_eq!(img.row(0), &[1, 1, 1, 1]);
        assert_eq!(img.row(3), &[2, 2, 2, 2]);
        assert_eq!(img.row(5), &[3, 3, 3, 3]);
    }

    #[test]
    fn test_single_worker_frame_matches_pure_functions() {
        let frame = ColorFrame::from_fn(21, 9, |x, y| [(x * 11) as u8, (y * 23) as u8, (x * y) as u8]);
        let expected = gradient::magnitude(&convert::to_luma(&frame));

        let ctx = FrameContext::new(21, 9, 1, KernelPath::Batched);
        unsafe {
            ctx.install_frame(frame);
            ctx.gray_stage(RowRange::full(9));
            ctx.edge_stage(RowRange::full(9));
            assert_eq!(ctx.magnitude(), &expected);
        }
    }

    #[test]
    fn test_no_frame_leaves_luma_untouched() {
        let ctx = FrameContext::new(3, 3, 1, KernelPath::Scalar);
        unsafe {
            ctx.gray_stage(RowRange::full(3));
            assert!(ctx.luma.image().as_slice().iter().all(|&v| v == 0));
        }
    }
}
