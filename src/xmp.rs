//! XMP packets carried in a GIF application extension.
//!
//! XMP is stored as raw bytes rather than as length-prefixed sub-blocks. A
//! 257 byte "magic trailer" (`0x01` then `0xff` down to `0x00`) follows the
//! packet so that a reader walking the bytes as sub-blocks always lands on the
//! block terminator, whichever byte of the packet it started from.

use log::{debug, warn};

use crate::model::ApplicationExtension;

pub const XMP_IDENTIFIER: &[u8; 8] = b"XMP Data";
pub const XMP_AUTHENTICATION: &[u8; 3] = b"XMP";

const TRAILER_LEN: usize = 257;

fn magic_trailer() -> impl Iterator<Item = u8> {
    std::iter::once(1).chain((0..=255u8).rev())
}

pub fn is_xmp(extension: &ApplicationExtension) -> bool {
    &extension.identifier == XMP_IDENTIFIER && &extension.authentication_code == XMP_AUTHENTICATION
}

/// Recover the XMP packet from an `XMP DataXMP` extension.
///
/// Returns `None` for other extensions, when the trailer is missing, or when
/// the packet is not UTF-8.
pub fn extract(extension: &ApplicationExtension) -> Option<String> {
    if !is_xmp(extension) {
        return None;
    }

    let raw = extension.framed_data();
    if raw.len() < TRAILER_LEN {
        warn!("XMP extension too short for its trailer ({} bytes)", raw.len());
        return None;
    }
    let (packet, trailer) = raw.split_at(raw.len() - TRAILER_LEN);
    if !trailer.iter().copied().eq(magic_trailer()) {
        warn!("XMP extension without magic trailer");
        return None;
    }

    match String::from_utf8(packet.to_vec()) {
        Ok(xml) => Some(xml),
        Err(err) => {
            warn!("XMP packet is not UTF-8: {}", err);
            None
        }
    }
}

/// Build an extension that writes `xml` followed by the magic trailer.
///
/// The raw bytes are split the way a GIF reader will split them, so the
/// extension survives a write and re-read unchanged. Returns `None` when a
/// reader would hit a zero length byte inside the packet, which happens for
/// packets containing NUL.
pub fn extension(xml: &str) -> Option<ApplicationExtension> {
    let mut raw = xml.as_bytes().to_vec();
    raw.extend(magic_trailer());

    let mut sub_blocks = Vec::new();
    let mut position = 0;
    while position < raw.len() {
        let len = raw[position] as usize;
        if len == 0 {
            warn!("XMP packet would end early at byte {}", position);
            return None;
        }
        let start = position + 1;
        let end = start + len;
        // the trailer guarantees the walk ends exactly on the last byte
        sub_blocks.push(raw.get(start..end)?.to_vec());
        position = end;
    }

    debug!("built XMP extension from {} byte packet in {} sub-blocks", xml.len(), sub_blocks.len());
    Some(ApplicationExtension {
        identifier: *XMP_IDENTIFIER,
        authentication_code: *XMP_AUTHENTICATION,
        sub_blocks,
    })
}
