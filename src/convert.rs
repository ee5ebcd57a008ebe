// convert.rs -- B,G,R color frame → 8-bit luma.
//
//   Y = (29*B + 150*G + 77*R) >> 8        (see arith.rs)
//
// A conversion call owns a set of rows of the output plane and nothing else,
// so a worker can convert its band while other workers convert theirs:
//
//   color (read-only)           luma
//   ┌──────────────────┐        ┌────────┐
//   │ rows 0..k        │  ───▶  │ band 0 │  worker 0
//   │ rows k..h        │  ───▶  │ band 1 │  worker 1
//   └──────────────────┘        └────────┘
//
// Every row in the band is fully overwritten, so a reused luma buffer needs
// no clearing between frames.

use crate::frame::ColorFrame;
use crate::image::{Image, RowBandMut};
use crate::kernels::{self, KernelPath};
use crate::partition::RowRange;

/// Convert rows `rows` of `color` into `luma` using the default kernel path.
///
/// # Panics
/// Panics if the planes differ in shape or `rows` extends past the last row.
pub fn bgr_to_luma(color: &ColorFrame, luma: &mut Image<u8>, rows: RowRange) {
    bgr_to_luma_with(KernelPath::default(), color, luma, rows);
}

/// Same as [`bgr_to_luma`] with an explicit kernel path.
pub fn bgr_to_luma_with(path: KernelPath, color: &ColorFrame, luma: &mut Image<u8>, rows: RowRange) {
    assert!(
        color.width() == luma.width() && color.height() == luma.height(),
        "luma plane {}×{} does not match color frame {}×{}",
        luma.width(),
        luma.height(),
        color.width(),
        color.height(),
    );
    let mut band = luma.band_mut(rows);
    bgr_to_luma_band(path, color, &mut band);
}

/// Convert the rows covered by `band`.
///
/// # Panics
/// Panics if the band is wider than or extends below `color`.
pub fn bgr_to_luma_band(path: KernelPath, color: &ColorFrame, band: &mut RowBandMut<'_, u8>) {
    let rows = band.rows();
    assert_eq!(
        band.width(),
        color.width(),
        "luma band width does not match color frame"
    );
    assert!(
        rows.end <= color.height(),
        "rows {rows:?} exceed color frame height {}",
        color.height()
    );

    for y in rows {
        kernels::luma_row(path, color.row(y), band.row_mut(y));
    }
}

/// Convert a whole frame into a freshly allocated plane.
pub fn to_luma(color: &ColorFrame) -> Image<u8> {
    let mut luma = Image::new(color.width(), color.height());
    bgr_to_luma(color, &mut luma, RowRange::full(color.height()));
    luma
}
