mod encoder;
mod quantize;

pub use encoder::Encoder;
pub use quantize::{ExactPalette, Quantized, Quantizer};

use std::borrow::Borrow;
use std::io::Write;

use log::debug;

use crate::error::EncodeError;
use crate::model::{ArgbRaster, GifDocument, GifFrame, IndexedRaster, Version};

/// Write a whole GIF: header, document-level blocks, every frame, trailer.
///
/// A logical screen of `0x0` in `document` is replaced by the smallest
/// screen that holds every frame. A `GIF87a` document is written as `GIF89a`
/// when any frame needs a graphic control extension. Both decisions require
/// collecting the frames first.
pub fn write<W, I>(document: &GifDocument, frames: I, out: W) -> Result<W, EncodeError>
where
    W: Write,
    I: IntoIterator,
    I::Item: Borrow<GifFrame>,
{
    let derive_screen = document.logical_screen_width == 0 || document.logical_screen_height == 0;
    if !derive_screen && document.version == Version::V89a {
        let mut encoder = Encoder::new(out, document)?;
        for frame in frames {
            encoder.write_frame(Borrow::<GifFrame>::borrow(&frame))?;
        }
        return encoder.finish();
    }

    let frames: Vec<I::Item> = frames.into_iter().collect();
    let mut document = document.clone();

    if derive_screen {
        let (width, height) = frames
            .iter()
            .map(|frame| Borrow::<GifFrame>::borrow(frame).extent())
            .fold((0, 0), |(w, h), (fw, fh)| (w.max(fw), h.max(fh)));
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(EncodeError::ScreenTooLarge { width, height });
        }
        debug!("derived {}x{} logical screen from {} frames", width, height, frames.len());
        document.logical_screen_width = width as u16;
        document.logical_screen_height = height as u16;
    }

    if document.version == Version::V87a
        && frames
            .iter()
            .any(|frame| Borrow::<GifFrame>::borrow(frame).needs_graphic_control())
    {
        debug!("frames carry graphic control, writing GIF89a");
        document.version = Version::V89a;
    }

    let mut encoder = Encoder::new(out, &document)?;
    for frame in &frames {
        encoder.write_frame(Borrow::<GifFrame>::borrow(frame))?;
    }
    encoder.finish()
}

/// Build a frame with a local color table from direct-color pixels.
pub fn frame_from_argb<Q: Quantizer + ?Sized>(
    raster: &ArgbRaster,
    quantizer: &Q,
) -> Result<GifFrame, EncodeError> {
    if raster.width > u16::MAX as u32 || raster.height > u16::MAX as u32 {
        return Err(EncodeError::ScreenTooLarge {
            width: raster.width,
            height: raster.height,
        });
    }

    let Quantized {
        palette,
        indices,
        transparent_index,
    } = quantizer.quantize(raster, 8)?;

    let mut frame = GifFrame::new(
        IndexedRaster::new(raster.width as u16, raster.height as u16, indices)
            .with_color_table(palette),
    );
    frame.transparent_index = transparent_index;
    Ok(frame)
}

/// Bits per index needed to address `len` colors, between 1 and 8.
pub(crate) fn color_table_bits(len: usize) -> u8 {
    let mut bits = 1;
    while bits < 8 && (1usize << bits) < len {
        bits += 1;
    }
    bits
}

/// LZW minimum code size for a table of `len` colors.
pub(crate) fn min_code_size(len: usize) -> u8 {
    color_table_bits(len).max(2)
}
