//! In-memory representation of a GIF data stream.
//!
//! A [`GifDocument`] carries everything that applies to the whole stream
//! (logical screen, global color table, loop count, comments, application
//! blocks); each [`GifFrame`] carries one image descriptor together with the
//! graphic control data that preceded it.

use std::fmt;

/// Largest number of entries a GIF color table may hold.
pub const MAX_COLOR_TABLE_LEN: usize = 256;

/// One 24-bit color table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque `0xAARRGGBB` value of this entry.
    pub fn to_argb(self) -> u32 {
        0xff00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_argb(argb: u32) -> Self {
        Self {
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    V87a,
    #[default]
    V89a,
}

impl Version {
    pub fn as_bytes(self) -> &'static [u8; 3] {
        match self {
            Version::V87a => b"87a",
            Version::V89a => b"89a",
        }
    }
}

impl TryFrom<&[u8]> for Version {
    type Error = String;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            b"87a" => Ok(Version::V87a),
            b"89a" => Ok(Version::V89a),
            version => Err(String::from_utf8_lossy(version).into_owned()),
        }
    }
}

/// What happens to a frame's region of the canvas before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    #[default]
    Unspecified,
    LeaveAsIs,
    RestoreToBackground,
    RestoreToPrevious,
    /// Values 4 to 7, which have no defined meaning.
    Reserved(ReservedDisposal),
}

/// A disposal value between 4 and 7; only [`DisposalMethod::from_u8`] makes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedDisposal(u8);

impl ReservedDisposal {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl DisposalMethod {
    /// Decode the 3-bit disposal field of a graphic control extension.
    pub fn from_u8(value: u8) -> Self {
        match value & 0b111 {
            0 => DisposalMethod::Unspecified,
            1 => DisposalMethod::LeaveAsIs,
            2 => DisposalMethod::RestoreToBackground,
            3 => DisposalMethod::RestoreToPrevious,
            reserved => DisposalMethod::Reserved(ReservedDisposal(reserved)),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            DisposalMethod::Unspecified => 0,
            DisposalMethod::LeaveAsIs => 1,
            DisposalMethod::RestoreToBackground => 2,
            DisposalMethod::RestoreToPrevious => 3,
            DisposalMethod::Reserved(reserved) => reserved.0,
        }
    }
}

/// Application extension other than the Netscape looping block.
///
/// The sub-blocks are kept exactly as framed in the stream so that payloads
/// relying on the framing itself (XMP's magic trailer) can be recovered.
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationExtension {
    pub identifier: [u8; 8],
    pub authentication_code: [u8; 3],
    pub sub_blocks: Vec<Vec<u8>>,
}

impl ApplicationExtension {
    /// Concatenated payload of all sub-blocks, without length prefixes.
    pub fn data(&self) -> Vec<u8> {
        self.sub_blocks.concat()
    }

    /// The sub-blocks with their length prefixes, excluding the terminator.
    pub fn framed_data(&self) -> Vec<u8> {
        let mut framed = Vec::with_capacity(self.sub_blocks.iter().map(|b| b.len() + 1).sum());
        for block in &self.sub_blocks {
            framed.push(block.len() as u8);
            framed.extend_from_slice(block);
        }
        framed
    }
}

impl fmt::Debug for ApplicationExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationExtension")
            .field("identifier", &String::from_utf8_lossy(&self.identifier))
            .field("authentication_code", &self.authentication_code)
            .field("sub_blocks", &self.sub_blocks.len())
            .field("data_len", &self.sub_blocks.iter().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Stream-level data of a GIF.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GifDocument {
    pub version: Version,
    /// A size of `0x0` asks the writer to derive it from the frames.
    pub logical_screen_width: u16,
    pub logical_screen_height: u16,
    pub global_color_table: Option<Vec<Rgb>>,
    /// Sort flag of the logical screen descriptor: global table ordered by importance.
    pub sorted_global_color_table: bool,
    pub background_color_index: u8,
    /// Raw color resolution field (bits 6-4 of the screen descriptor flags).
    pub color_resolution: u8,
    pub pixel_aspect_ratio: u8,
    /// `None` plays the animation once; `Some(0)` loops forever.
    pub loop_count: Option<u16>,
    pub comments: Vec<Vec<u8>>,
    pub application_extensions: Vec<ApplicationExtension>,
}

impl GifDocument {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            logical_screen_width: width,
            logical_screen_height: height,
            ..Default::default()
        }
    }

    /// Color table that applies to `frame`: its local one, else the global one.
    pub fn palette_for<'a>(&'a self, frame: &'a GifFrame) -> Option<&'a [Rgb]> {
        frame
            .image
            .local_color_table
            .as_deref()
            .or(self.global_color_table.as_deref())
    }
}

/// A raster of palette indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedRaster {
    pub width: u16,
    pub height: u16,
    /// Row-major, `width * height` entries. Decoded frames whose data ends
    /// early can be shorter, see [`crate::parser::MAX_PADDED_PIXELS`].
    pub pixels: Vec<u8>,
    pub local_color_table: Option<Vec<Rgb>>,
    /// Sort flag of the image descriptor; only written with a local table.
    pub sorted_color_table: bool,
}

impl IndexedRaster {
    pub fn new(width: u16, height: u16, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
            local_color_table: None,
            sorted_color_table: false,
        }
    }

    pub fn with_color_table(mut self, table: Vec<Rgb>) -> Self {
        self.local_color_table = Some(table);
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A raster of `0xAARRGGBB` pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgbRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl ArgbRaster {
    /// A fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.pixels.chunks(self.width.max(1) as usize)
    }
}

/// One image of a GIF together with its graphic control data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GifFrame {
    pub image: IndexedRaster,
    pub left: u16,
    pub top: u16,
    pub delay_centiseconds: u16,
    pub disposal_method: DisposalMethod,
    pub transparent_index: Option<u8>,
    pub interlaced: bool,
    pub user_input_expected: bool,
}

impl GifFrame {
    pub fn new(image: IndexedRaster) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }

    pub fn width(&self) -> u16 {
        self.image.width
    }

    pub fn height(&self) -> u16 {
        self.image.height
    }

    /// Right and bottom edges of this frame on the logical screen.
    pub fn extent(&self) -> (u32, u32) {
        (
            self.left as u32 + self.image.width as u32,
            self.top as u32 + self.image.height as u32,
        )
    }

    /// True when the frame carries something only a graphic control extension can express.
    pub fn needs_graphic_control(&self) -> bool {
        self.delay_centiseconds != 0
            || self.disposal_method != DisposalMethod::Unspecified
            || self.transparent_index.is_some()
            || self.user_input_expected
    }
}
