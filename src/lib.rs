//! GIF encoding and decoding: an LZW codec with GIF and TIFF flavours, a
//! streaming block parser, a writer and a compositor that turns frames into
//! what a viewer displays.

pub mod compositor;
pub mod error;
pub mod interlace;
pub mod lzw;
pub mod model;
pub mod parser;
pub mod writer;
pub mod xmp;

pub use compositor::Compositor;
pub use error::{DecodeError, EncodeError, LzwError};
pub use model::{
    ApplicationExtension, ArgbRaster, DisposalMethod, GifDocument, GifFrame, IndexedRaster, Rgb, Version,
};
