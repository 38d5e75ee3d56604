use std::collections::HashMap;

use crate::error::EncodeError;
use crate::model::{ArgbRaster, Rgb};

// only fully transparent pixels use the transparent index; any other
// alpha is written as its opaque color
fn is_transparent(argb: u32) -> bool {
    argb >> 24 == 0
}

/// Result of reducing a direct-color raster to palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    pub palette: Vec<Rgb>,
    pub indices: Vec<u8>,
    pub transparent_index: Option<u8>,
}

/// Maps direct-color pixels onto at most `2^max_bits` palette entries.
pub trait Quantizer {
    fn quantize(&self, raster: &ArgbRaster, max_bits: u8) -> Result<Quantized, EncodeError>;
}

/// Keeps every distinct color and fails when there are too many of them.
///
/// Colors are numbered in the order they first appear; when any pixel has
/// alpha 0, one extra entry after all other colors is reserved for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactPalette;

impl Quantizer for ExactPalette {
    fn quantize(&self, raster: &ArgbRaster, max_bits: u8) -> Result<Quantized, EncodeError> {
        let limit = 1usize << max_bits.clamp(1, 8);

        let mut palette = Vec::new();
        let mut lookup: HashMap<u32, u8> = HashMap::new();
        let mut has_transparency = false;

        for &argb in &raster.pixels {
            if is_transparent(argb) {
                has_transparency = true;
                continue;
            }
            let rgb = argb & 0x00ff_ffff;
            if lookup.contains_key(&rgb) {
                continue;
            }
            if palette.len() == limit {
                return Err(EncodeError::TooManyColors { limit });
            }
            lookup.insert(rgb, palette.len() as u8);
            palette.push(Rgb::from_argb(rgb));
        }

        let transparent_index = if has_transparency {
            if palette.len() == limit {
                return Err(EncodeError::TooManyColors { limit });
            }
            palette.push(Rgb::default());
            Some((palette.len() - 1) as u8)
        } else {
            None
        };

        let indices = raster
            .pixels
            .iter()
            .map(|&argb| match transparent_index {
                Some(index) if is_transparent(argb) => index,
                _ => lookup[&(argb & 0x00ff_ffff)],
            })
            .collect();

        Ok(Quantized {
            palette,
            indices,
            transparent_index,
        })
    }
}
