//! Row order of interlaced GIF images.
//!
//! An interlaced image stores its rows in four passes: every 8th row from
//! row 0, every 8th row from row 4, every 4th row from row 2, then every
//! 2nd row from row 1.

static PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Display row of each stored row, in storage order.
pub fn row_order(height: usize) -> impl Iterator<Item = usize> {
    PASSES
        .iter()
        .flat_map(move |&(start, step)| (start..height).step_by(step))
}

/// Rearrange rows stored in interlaced order into display order.
pub fn deinterlace(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0; width * height];
    if width == 0 {
        return out;
    }
    for (stored, row) in pixels.chunks(width).zip(row_order(height)) {
        out[row * width..(row + 1) * width].copy_from_slice(stored);
    }
    out
}

/// Rearrange rows in display order into interlaced storage order.
pub fn interlace(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height);
    if width == 0 {
        return out;
    }
    for row in row_order(height) {
        out.extend_from_slice(&pixels[row * width..(row + 1) * width]);
    }
    out
}
