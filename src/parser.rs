mod decoder;

pub use decoder::{Decoder, MAX_PADDED_PIXELS};

use std::io::Read;

use crate::error::DecodeError;
use crate::model::{GifDocument, GifFrame};

pub(crate) const SIGNATURE: &[u8; 3] = b"GIF";

pub(crate) const EXTENSION_INTRODUCER: u8 = 0x21;
pub(crate) const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
pub(crate) const TRAILER_LABEL: u8 = 0x3b;
pub(crate) const BLOCK_TERMINATOR: u8 = 0x00;

// Extension labels
pub(crate) const APPLICATION_EXTENSION: u8 = 0xff;
pub(crate) const COMMENT_EXTENSION: u8 = 0xfe;
pub(crate) const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;

pub(crate) const APPLICATION_BLOCK_SIZE: u8 = 11;
pub(crate) const GRAPHIC_CONTROL_BLOCK_SIZE: u8 = 4;

pub(crate) const NETSCAPE_IDENTIFIER: &[u8; 8] = b"NETSCAPE";
pub(crate) const NETSCAPE_AUTHENTICATION: &[u8; 3] = b"2.0";

/// Everything a GIF stream yielded, including where decoding stopped early.
#[derive(Debug)]
pub struct Animation {
    pub document: GifDocument,
    pub frames: Vec<GifFrame>,
    /// The recoverable error that ended decoding, if the stream was damaged.
    pub stopped: Option<DecodeError>,
}

/// Decode every frame of a GIF stream.
///
/// Only header-level problems and I/O failures are returned as errors. Corrupt
/// or truncated frame data ends decoding and is reported in
/// [`Animation::stopped`] next to the frames decoded before it.
pub fn read_all<R: Read>(reader: R) -> Result<Animation, DecodeError> {
    let mut decoder = Decoder::new(reader)?;
    let mut frames = Vec::new();

    let stopped = loop {
        match decoder.read_frame() {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => break None,
            Err(err) if err.is_recoverable() => break Some(err),
            Err(err) => return Err(err),
        }
    };

    Ok(Animation {
        document: decoder.into_document(),
        frames,
        stopped,
    })
}
