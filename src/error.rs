use std::io;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LzwError {
    #[error("code {code} is not in the table, next free code is {next_code}")]
    InvalidCode { code: u16, next_code: u16 },

    /// Sizes above 11 would need codes longer than 12 bits.
    #[error("minimum code size {0} is outside 2..=11")]
    InvalidMinCodeSize(u8),

    #[error("symbol {symbol} does not fit a {min_code_size}-bit alphabet")]
    SymbolOutOfRange { symbol: u8, min_code_size: u8 },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("signature is invalid")]
    InvalidSignature,

    #[error("version {0} in the header is unsupported")]
    UnsupportedVersion(String),

    #[error("frame {frame_index} has corrupt image data: {source}")]
    CorruptStream {
        frame_index: usize,
        #[source]
        source: LzwError,
    },

    #[error("stream ended in the middle of frame {frame_index}")]
    TruncatedStream { frame_index: usize },

    #[error("frame {frame_index} has no local color table and the stream has no global color table")]
    MissingColorTable { frame_index: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Whether frames decoded before this error are still usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::CorruptStream { .. }
                | DecodeError::TruncatedStream { .. }
                | DecodeError::MissingColorTable { .. }
        )
    }

    /// Index of the frame at which decoding stopped, when known.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            DecodeError::CorruptStream { frame_index, .. }
            | DecodeError::TruncatedStream { frame_index }
            | DecodeError::MissingColorTable { frame_index } => Some(*frame_index),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame {frame_index} at {left},{top} of size {width}x{height} exceeds the {screen_width}x{screen_height} logical screen")]
    FrameOutOfBounds {
        frame_index: usize,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        screen_width: u16,
        screen_height: u16,
    },

    #[error("color table has {0} entries, at most 256 are allowed")]
    PaletteTooLarge(usize),

    #[error("frame {frame_index} has {actual} pixels, expected {expected}")]
    PixelCountMismatch {
        frame_index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("frame {frame_index} has no local color table and the document has no global color table")]
    MissingColorTable { frame_index: usize },

    #[error("frame {frame_index} needs a graphic control extension, which a GIF87a stream cannot carry")]
    GraphicControlIn87a { frame_index: usize },

    #[error("frame {frame_index} uses transparent index {index} outside its {palette_len}-entry color table")]
    TransparentIndexOutOfRange {
        frame_index: usize,
        index: u8,
        palette_len: usize,
    },

    #[error(transparent)]
    Lzw(#[from] LzwError),

    #[error("image has more than {limit} distinct colors")]
    TooManyColors { limit: usize },

    #[error("logical screen extent {width}x{height} does not fit in 16 bits")]
    ScreenTooLarge { width: u32, height: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}
