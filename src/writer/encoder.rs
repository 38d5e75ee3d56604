use std::io::Write;

use log::{debug, info};

use super::{color_table_bits, min_code_size};
use crate::error::EncodeError;
use crate::interlace;
use crate::lzw::{self, LzwConfig};
use crate::model::{GifDocument, GifFrame, Rgb, Version, MAX_COLOR_TABLE_LEN};
use crate::parser::{
    APPLICATION_BLOCK_SIZE, APPLICATION_EXTENSION, BLOCK_TERMINATOR, COMMENT_EXTENSION,
    EXTENSION_INTRODUCER, GRAPHIC_CONTROL_BLOCK_SIZE, GRAPHIC_CONTROL_EXTENSION,
    IMAGE_DESCRIPTOR_LABEL, NETSCAPE_AUTHENTICATION, NETSCAPE_IDENTIFIER, SIGNATURE,
    TRAILER_LABEL,
};

/// Streaming GIF encoder.
///
/// [`Encoder::new`] writes everything that precedes the first frame; each
/// [`Encoder::write_frame`] writes one frame and [`Encoder::finish`] writes the
/// trailer.
///
/// The header is written before any frame is seen, so a `GIF87a` document
/// without document-level extensions stays `GIF87a` and frames that need a
/// graphic control extension are refused. [`super::write`] sees every frame
/// first and upgrades the version instead.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    inner: W,
    version: Version,
    screen_width: u16,
    screen_height: u16,
    global_color_table: Option<Vec<Rgb>>,
    frame_index: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W, document: &GifDocument) -> Result<Self, EncodeError> {
        if let Some(table) = &document.global_color_table {
            check_table_len(table)?;
        }

        let has_extensions = document.loop_count.is_some()
            || !document.comments.is_empty()
            || !document.application_extensions.is_empty();
        let version = if has_extensions { Version::V89a } else { document.version };

        let mut encoder = Self {
            inner,
            version,
            screen_width: document.logical_screen_width,
            screen_height: document.logical_screen_height,
            global_color_table: document.global_color_table.clone(),
            frame_index: 0,
        };
        encoder.write_header(document)?;
        Ok(encoder)
    }

    fn write_header(&mut self, document: &GifDocument) -> Result<(), EncodeError> {
        let mut data = Vec::with_capacity(13 + 3 * MAX_COLOR_TABLE_LEN);
        data.extend_from_slice(SIGNATURE);
        data.extend_from_slice(self.version.as_bytes());

        data.extend_from_slice(&self.screen_width.to_le_bytes());
        data.extend_from_slice(&self.screen_height.to_le_bytes());
        let mut packed_fields = (document.color_resolution & 0b111) << 4;
        if let Some(table) = &self.global_color_table {
            packed_fields |= 0b1000_0000 | (color_table_bits(table.len()) - 1);
            if document.sorted_global_color_table {
                packed_fields |= 0b0000_1000;
            }
        }
        data.push(packed_fields);
        data.push(document.background_color_index);
        data.push(document.pixel_aspect_ratio);
        if let Some(table) = &self.global_color_table {
            push_color_table(&mut data, table);
        }
        debug!("wrote {:?} header and logical screen descriptor", self.version);

        if let Some(loop_count) = document.loop_count {
            data.extend_from_slice(&[EXTENSION_INTRODUCER, APPLICATION_EXTENSION, APPLICATION_BLOCK_SIZE]);
            data.extend_from_slice(NETSCAPE_IDENTIFIER);
            data.extend_from_slice(NETSCAPE_AUTHENTICATION);
            data.extend_from_slice(&[3, 1]);
            data.extend_from_slice(&loop_count.to_le_bytes());
            data.push(BLOCK_TERMINATOR);
            debug!("wrote looping extension, loop count {}", loop_count);
        }

        for extension in &document.application_extensions {
            data.extend_from_slice(&[EXTENSION_INTRODUCER, APPLICATION_EXTENSION, APPLICATION_BLOCK_SIZE]);
            data.extend_from_slice(&extension.identifier);
            data.extend_from_slice(&extension.authentication_code);
            for block in &extension.sub_blocks {
                push_sub_blocks_unterminated(&mut data, block);
            }
            data.push(BLOCK_TERMINATOR);
            debug!("wrote application extension {:?}", extension);
        }

        for comment in &document.comments {
            data.extend_from_slice(&[EXTENSION_INTRODUCER, COMMENT_EXTENSION]);
            push_sub_blocks(&mut data, comment);
            debug!("wrote comment extension of {} bytes", comment.len());
        }

        self.inner.write_all(&data)?;
        Ok(())
    }

    /// Validate and write one frame.
    pub fn write_frame(&mut self, frame: &GifFrame) -> Result<(), EncodeError> {
        let frame_index = self.frame_index;
        let image = &frame.image;

        if image.pixels.len() != image.pixel_count() {
            return Err(EncodeError::PixelCountMismatch {
                frame_index,
                expected: image.pixel_count(),
                actual: image.pixels.len(),
            });
        }

        let (right, bottom) = frame.extent();
        if right > self.screen_width as u32 || bottom > self.screen_height as u32 {
            return Err(EncodeError::FrameOutOfBounds {
                frame_index,
                left: frame.left,
                top: frame.top,
                width: image.width,
                height: image.height,
                screen_width: self.screen_width,
                screen_height: self.screen_height,
            });
        }

        // a local table equal to the global one is left out
        let local_color_table = image
            .local_color_table
            .as_deref()
            .filter(|&table| Some(table) != self.global_color_table.as_deref());
        let palette = match local_color_table.or(self.global_color_table.as_deref()) {
            Some(palette) => palette,
            None => return Err(EncodeError::MissingColorTable { frame_index }),
        };
        check_table_len(palette)?;

        let table_bits = color_table_bits(palette.len());
        if let Some(index) = frame.transparent_index {
            if index as usize >= 1 << table_bits {
                return Err(EncodeError::TransparentIndexOutOfRange {
                    frame_index,
                    index,
                    palette_len: palette.len(),
                });
            }
        }

        if frame.needs_graphic_control() && self.version == Version::V87a {
            return Err(EncodeError::GraphicControlIn87a { frame_index });
        }

        let mut data = Vec::with_capacity(image.pixels.len() / 2 + 64);

        if frame.needs_graphic_control() {
            let mut packed_fields = frame.disposal_method.to_u8() << 2;
            if frame.user_input_expected {
                packed_fields |= 0b0000_0010;
            }
            if frame.transparent_index.is_some() {
                packed_fields |= 0b0000_0001;
            }
            data.extend_from_slice(&[
                EXTENSION_INTRODUCER,
                GRAPHIC_CONTROL_EXTENSION,
                GRAPHIC_CONTROL_BLOCK_SIZE,
                packed_fields,
            ]);
            data.extend_from_slice(&frame.delay_centiseconds.to_le_bytes());
            data.push(frame.transparent_index.unwrap_or(0));
            data.push(BLOCK_TERMINATOR);
        }

        data.push(IMAGE_DESCRIPTOR_LABEL);
        data.extend_from_slice(&frame.left.to_le_bytes());
        data.extend_from_slice(&frame.top.to_le_bytes());
        data.extend_from_slice(&image.width.to_le_bytes());
        data.extend_from_slice(&image.height.to_le_bytes());
        let mut packed_fields = 0;
        if local_color_table.is_some() {
            packed_fields |= 0b1000_0000 | (table_bits - 1);
            if image.sorted_color_table {
                packed_fields |= 0b0010_0000;
            }
        }
        if frame.interlaced {
            packed_fields |= 0b0100_0000;
        }
        data.push(packed_fields);
        if let Some(table) = local_color_table {
            push_color_table(&mut data, table);
        }

        let code_size = min_code_size(palette.len());
        let compressed = if frame.interlaced {
            let stored = interlace::interlace(&image.pixels, image.width as usize, image.height as usize);
            lzw::encode(&stored, LzwConfig::gif(code_size))?
        } else {
            lzw::encode(&image.pixels, LzwConfig::gif(code_size))?
        };
        data.push(code_size);
        push_sub_blocks(&mut data, &compressed);

        self.inner.write_all(&data)?;
        debug!(
            "wrote frame {}: {}x{} at {},{}, {} bytes of image data",
            frame_index,
            image.width,
            image.height,
            frame.left,
            frame.top,
            compressed.len()
        );

        self.frame_index += 1;
        Ok(())
    }

    /// Write the trailer and hand back the writer.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.inner.write_all(&[TRAILER_LABEL])?;
        self.inner.flush()?;
        info!("wrote {} frames", self.frame_index);
        Ok(self.inner)
    }
}

fn check_table_len(table: &[Rgb]) -> Result<(), EncodeError> {
    if table.len() > MAX_COLOR_TABLE_LEN {
        return Err(EncodeError::PaletteTooLarge(table.len()));
    }
    Ok(())
}

/// Write a color table padded with black up to its power-of-two size.
fn push_color_table(data: &mut Vec<u8>, table: &[Rgb]) {
    let entries = 1usize << color_table_bits(table.len());
    for rgb in table {
        data.extend_from_slice(&[rgb.r, rgb.g, rgb.b]);
    }
    data.resize(data.len() + 3 * (entries - table.len()), 0);
}

/// Frame `payload` as length-prefixed sub-blocks and terminate the sequence.
fn push_sub_blocks(data: &mut Vec<u8>, payload: &[u8]) {
    push_sub_blocks_unterminated(data, payload);
    data.push(BLOCK_TERMINATOR);
}

fn push_sub_blocks_unterminated(data: &mut Vec<u8>, payload: &[u8]) {
    for chunk in payload.chunks(255) {
        data.push(chunk.len() as u8);
        data.extend_from_slice(chunk);
    }
}
