use super::*;
use crate::interlace;
use crate::lzw::{self, LzwConfig, LzwStatus};
use crate::model::{ApplicationExtension, DisposalMethod, IndexedRaster, Rgb, Version};

use log::{debug, info, warn};

use std::io::{self, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    Unknown(u8),
}

impl From<u8> for ExtensionType {
    fn from(value: u8) -> Self {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Application,
            COMMENT_EXTENSION => Comment,
            GRAPHIC_CONTROL_EXTENSION => GraphicControl,
            label => Unknown(label),
        }
    }
}

/// Short image data is padded with index 0 only up to this many pixels;
/// larger frames are returned with the pixels actually decoded.
pub const MAX_PADDED_PIXELS: usize = 1 << 24;

// color tables hold at most 256 entries
const MAX_GIF_CODE_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, Default)]
struct GraphicControlExtension {
    disposal_method: DisposalMethod,
    user_input_flag: bool,
    transparent_color_flag: bool,

    delay_time: u16,
    transparent_color_index: u8,
}

#[derive(Debug)]
enum ParserState {
    DetermineNextBlock(Option<GraphicControlExtension>),
    ProcessExtension(u8, Option<GraphicControlExtension>),
    ProcessImageDescriptor(Option<GraphicControlExtension>),
    Done,
}

/// Streaming GIF decoder.
///
/// [`Decoder::new`] reads the header, the logical screen descriptor, the
/// global color table and any extensions before the first image; frames are
/// then decoded one at a time by [`Decoder::read_frame`] or by iterating.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    inner: R,
    document: GifDocument,
    state: ParserState,
    frame_index: usize,
    // recoverable failure met while looking for the first image
    pending_error: Option<DecodeError>,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Result<Self, DecodeError> {
        let mut decoder = Self {
            inner,
            document: GifDocument::default(),
            state: ParserState::DetermineNextBlock(None),
            frame_index: 0,
            pending_error: None,
        };

        decoder.process_header()?;
        if let Err(err) = decoder.advance_to_image() {
            if !err.is_recoverable() {
                return Err(err);
            }
            decoder.pending_error = Some(err);
        }

        Ok(decoder)
    }

    /// Stream-level data seen so far.
    pub fn document(&self) -> &GifDocument {
        &self.document
    }

    pub fn into_document(self) -> GifDocument {
        self.document
    }

    /// Number of frames returned so far.
    pub fn frames_read(&self) -> usize {
        self.frame_index
    }

    /// Decode the next frame, or return `None` once the stream is over.
    ///
    /// After an error the decoder is finished and keeps returning `None`.
    pub fn read_frame(&mut self) -> Result<Option<GifFrame>, DecodeError> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }

        let result = self.advance_to_image().and_then(|()| {
            match std::mem::replace(&mut self.state, ParserState::DetermineNextBlock(None)) {
                ParserState::ProcessImageDescriptor(graphic_control_extension) => {
                    self.process_image(graphic_control_extension).map(Some)
                }
                state => {
                    self.state = state;
                    Ok(None)
                }
            }
        });

        match result {
            Ok(Some(frame)) => {
                self.frame_index += 1;
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!("stopped decoding at frame {}: {}", self.frame_index, err);
                self.state = ParserState::Done;
                Err(err)
            }
        }
    }

    fn advance_to_image(&mut self) -> Result<(), DecodeError> {
        loop {
            match self.state {
                ParserState::ProcessImageDescriptor(_) | ParserState::Done => return Ok(()),
                _ => {}
            }
            let state = std::mem::replace(&mut self.state, ParserState::Done);
            debug!("begin parsing state {:?}", state);
            self.state = self.process_next_state(state)?;
        }
    }

    fn process_header(&mut self) -> Result<(), DecodeError> {
        let mut header = [0; 6];
        self.read_exact(&mut header)?;
        if &header[..3] != SIGNATURE {
            return Err(DecodeError::InvalidSignature);
        }
        self.document.version =
            Version::try_from(&header[3..]).map_err(DecodeError::UnsupportedVersion)?;
        debug!("processed header, got {:?}", self.document.version);

        self.document.logical_screen_width = self.read_u16()?;
        self.document.logical_screen_height = self.read_u16()?;

        let packed_fields = self.read_byte()?;
        // packed field start
        let global_color_table_flag = packed_fields & 0b1000_0000 != 0;
        self.document.color_resolution = (packed_fields >> 4) & 0b0000_0111;
        self.document.sorted_global_color_table = packed_fields & 0b0000_1000 != 0;
        let global_color_table_size = packed_fields & 0b0000_0111;
        // packed field end

        self.document.background_color_index = self.read_byte()?;
        self.document.pixel_aspect_ratio = self.read_byte()?;

        if global_color_table_flag {
            self.document.global_color_table = Some(self.read_color_table(global_color_table_size)?);
        }

        info!(
            "{}x{} logical screen, global color table: {}",
            self.document.logical_screen_width,
            self.document.logical_screen_height,
            self.document
                .global_color_table
                .as_ref()
                .map_or(0, Vec::len)
        );
        Ok(())
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState, DecodeError> {
        use ParserState::*;

        match next_state {
            DetermineNextBlock(graphic_control_extension) => {
                let Some(introducer_or_label) = self.read_optional_byte()? else {
                    warn!("stream ended without a trailer");
                    return Ok(Done);
                };

                match introducer_or_label {
                    // extension introducer means that a label follows determining what exact type
                    // of extension it is.
                    EXTENSION_INTRODUCER => {
                        Ok(ProcessExtension(self.read_byte()?, graphic_control_extension))
                    }
                    IMAGE_DESCRIPTOR_LABEL => Ok(ProcessImageDescriptor(graphic_control_extension)),
                    TRAILER_LABEL => {
                        debug!("reached trailer");
                        Ok(Done)
                    }
                    label => {
                        warn!("unexpected block label 0x{:02x}, treating it as the end of the stream", label);
                        Ok(Done)
                    }
                }
            }
            ProcessExtension(label, graphic_control_extension) => {
                self.process_extension(ExtensionType::from(label), graphic_control_extension)
            }
            state @ (ProcessImageDescriptor(_) | Done) => Ok(state),
        }
    }

    fn process_extension(
        &mut self,
        label: ExtensionType,
        graphic_control_extension: Option<GraphicControlExtension>,
    ) -> Result<ParserState, DecodeError> {
        use ExtensionType::*;

        debug!("processing extension type: {:?}", label);
        match label {
            Application => {
                self.process_application_extension()?;
                Ok(ParserState::DetermineNextBlock(graphic_control_extension))
            }
            Comment => {
                // sequence of data sub-blocks
                let data = self.read_data_sub_blocks()?.concat();
                debug!("processed comment block, got: {}", String::from_utf8_lossy(&data));
                self.document.comments.push(data);
                Ok(ParserState::DetermineNextBlock(graphic_control_extension))
            }
            GraphicControl => {
                let block_size = self.read_byte()?;
                let block = self.read_bytes(block_size as usize)?;
                // anything after the fixed block is not part of the extension
                self.skip_data_sub_blocks()?;

                if block.len() < GRAPHIC_CONTROL_BLOCK_SIZE as usize {
                    warn!("graphic control extension of {} bytes is too short, ignoring it", block.len());
                    return Ok(ParserState::DetermineNextBlock(graphic_control_extension));
                }

                let packed_fields = block[0];
                // packed fields definition
                // XXXYYYZW
                // XXX = reserved, not needed
                // YYY = disposal method, indicates what to do with graphic after displaying
                // Z = user input flag
                // W = transparent color flag
                let graphic_control_extension = GraphicControlExtension {
                    disposal_method: DisposalMethod::from_u8(packed_fields >> 2),
                    user_input_flag: packed_fields & 0b0000_0010 != 0,
                    transparent_color_flag: packed_fields & 0b0000_0001 != 0,

                    delay_time: u16::from_le_bytes([block[1], block[2]]),
                    transparent_color_index: block[3],
                };

                debug!("processed GraphicControlExtension: {:?}", graphic_control_extension);
                Ok(ParserState::DetermineNextBlock(Some(graphic_control_extension)))
            }
            Unknown(label) => {
                let skipped = self.skip_data_sub_blocks()?;
                warn!("skipped {} bytes of unknown extension 0x{:02x}", skipped, label);
                Ok(ParserState::DetermineNextBlock(graphic_control_extension))
            }
        }
    }

    fn process_application_extension(&mut self) -> Result<(), DecodeError> {
        let block_size = self.read_byte()?;
        let header = self.read_bytes(block_size as usize)?;
        let sub_blocks = self.read_data_sub_blocks()?;

        if block_size != APPLICATION_BLOCK_SIZE {
            warn!("application extension with a {} byte header, skipping it", block_size);
            return Ok(());
        }

        let mut identifier = [0; 8];
        identifier.copy_from_slice(&header[..8]);
        let mut authentication_code = [0; 3];
        authentication_code.copy_from_slice(&header[8..]);

        if &identifier == NETSCAPE_IDENTIFIER && &authentication_code == NETSCAPE_AUTHENTICATION {
            match sub_blocks.first() {
                Some(data) if data.len() >= 3 && data[0] == 1 => {
                    let loop_count = u16::from_le_bytes([data[1], data[2]]);
                    debug!("processed looping extension, loop count {}", loop_count);
                    self.document.loop_count = Some(loop_count);
                }
                _ => warn!("malformed looping extension, ignoring it"),
            }
            return Ok(());
        }

        let extension = ApplicationExtension {
            identifier,
            authentication_code,
            sub_blocks,
        };
        debug!("processed application block, got: {:?}", extension);
        self.document.application_extensions.push(extension);
        Ok(())
    }

    fn process_image(
        &mut self,
        graphic_control_extension: Option<GraphicControlExtension>,
    ) -> Result<GifFrame, DecodeError> {
        let left = self.read_u16()?;
        let top = self.read_u16()?;

        let width = self.read_u16()?;
        let height = self.read_u16()?;

        let packed_fields = self.read_byte()?;

        let local_color_table_flag = packed_fields & 0b1000_0000 != 0;
        let interlaced = packed_fields & 0b0100_0000 != 0;
        let sorted_color_table = packed_fields & 0b0010_0000 != 0;
        let local_color_table_size = packed_fields & 0b0000_0111;

        let local_color_table = if local_color_table_flag {
            Some(self.read_color_table(local_color_table_size)?)
        } else {
            None
        };
        if local_color_table.is_none() && self.document.global_color_table.is_none() {
            return Err(DecodeError::MissingColorTable {
                frame_index: self.frame_index,
            });
        }

        let pixel_count = width as usize * height as usize;
        let mut pixels = self.process_image_data(pixel_count)?;
        if interlaced {
            if pixels.len() == pixel_count {
                pixels = interlace::deinterlace(&pixels, width as usize, height as usize);
            } else {
                warn!("frame {} is short, leaving its rows in interlaced order", self.frame_index);
            }
        }

        let extension = graphic_control_extension.unwrap_or_default();
        let frame = GifFrame {
            image: IndexedRaster {
                width,
                height,
                pixels,
                local_color_table,
                sorted_color_table,
            },
            left,
            top,
            delay_centiseconds: extension.delay_time,
            disposal_method: extension.disposal_method,
            transparent_index: extension
                .transparent_color_flag
                .then_some(extension.transparent_color_index),
            interlaced,
            user_input_expected: extension.user_input_flag,
        };

        debug!(
            "processed frame {}: {}x{} at {},{}, {:?}, delay {}",
            self.frame_index, width, height, left, top, frame.disposal_method, frame.delay_centiseconds
        );
        Ok(frame)
    }

    fn process_image_data(&mut self, pixel_count: usize) -> Result<Vec<u8>, DecodeError> {
        let frame_index = self.frame_index;
        let corrupt = |source| DecodeError::CorruptStream {
            frame_index,
            source,
        };

        let lzw_code_size = self.read_byte()?;
        if lzw_code_size > MAX_GIF_CODE_SIZE {
            warn!(
                "frame {} uses LZW minimum code size {}, above the {} GIF allows",
                frame_index, lzw_code_size, MAX_GIF_CODE_SIZE
            );
        }
        let mut decoder = lzw::Decoder::new(LzwConfig::gif(lzw_code_size)).map_err(corrupt)?;

        // grows with the decoded output, never from the descriptor alone
        let mut pixels = Vec::new();
        let mut status = LzwStatus::NeedMore;
        let mut sub_block = [0; 255];

        // sub-blocks are fed one at a time; the rest of the data after the
        // end code is read and dropped
        loop {
            let block_size = self.read_byte()? as usize;
            if block_size == 0 {
                break;
            }
            self.read_exact(&mut sub_block[..block_size])?;
            if status == LzwStatus::NeedMore {
                status = decoder
                    .decode(&sub_block[..block_size], &mut pixels, pixel_count)
                    .map_err(corrupt)?;
            }
        }

        if pixels.len() < pixel_count {
            if pixel_count <= MAX_PADDED_PIXELS {
                warn!(
                    "frame {} image data ends after {} of {} pixels, filling the rest with index 0",
                    frame_index,
                    pixels.len(),
                    pixel_count
                );
                pixels.resize(pixel_count, 0);
            } else {
                warn!(
                    "frame {} image data ends after {} of {} pixels, keeping the short frame",
                    frame_index,
                    pixels.len(),
                    pixel_count
                );
            }
        }
        Ok(pixels)
    }

    fn read_color_table(&mut self, size: u8) -> Result<Vec<Rgb>, DecodeError> {
        let entries = 2usize << size;
        let bytes = self.read_bytes(entries * 3)?;
        Ok(bytes
            .chunks_exact(3)
            .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
            .collect())
    }

    fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), DecodeError> {
        let frame_index = self.frame_index;
        self.inner.read_exact(buffer).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::TruncatedStream { frame_index },
            _ => DecodeError::Io(err),
        })
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buffer = vec![0; count];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let mut buffer = [0; 1];
        self.read_exact(&mut buffer)?;
        Ok(buffer[0])
    }

    /// Read one byte, or `None` at a clean end of stream.
    fn read_optional_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut buffer = [0; 1];
        loop {
            match self.inner.read(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buffer[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(DecodeError::Io(err)),
            }
        }
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        // multi-byte fields are little endian throughout GIF
        let mut buffer = [0; 2];
        self.read_exact(&mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    fn read_data_sub_blocks(&mut self) -> Result<Vec<Vec<u8>>, DecodeError> {
        let mut blocks = Vec::new();
        loop {
            let block_size = self.read_byte()?;
            if block_size == BLOCK_TERMINATOR {
                break Ok(blocks);
            }
            blocks.push(self.read_bytes(block_size as usize)?);
        }
    }

    fn skip_data_sub_blocks(&mut self) -> Result<usize, DecodeError> {
        let mut skipped = 0;
        let mut sub_block = [0; 255];
        loop {
            let block_size = self.read_byte()? as usize;
            if block_size == 0 {
                break Ok(skipped);
            }
            self.read_exact(&mut sub_block[..block_size])?;
            skipped += block_size;
        }
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<GifFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}
