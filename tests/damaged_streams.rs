use gifwright::lzw::{self, LzwConfig};
use gifwright::parser::{self, Decoder, MAX_PADDED_PIXELS};
use gifwright::writer;
use gifwright::{Compositor, DecodeError, DisposalMethod, GifDocument, GifFrame, IndexedRaster, Rgb};

fn document() -> GifDocument {
    let mut document = GifDocument::new(16, 16);
    document.global_color_table = Some(vec![
        Rgb::new(0, 0, 0),
        Rgb::new(255, 0, 0),
        Rgb::new(0, 255, 0),
        Rgb::new(0, 0, 255),
    ]);
    document
}

fn small() -> GifFrame {
    GifFrame::new(IndexedRaster::new(2, 2, vec![0, 1, 2, 3]))
}

fn noisy() -> GifFrame {
    let mut seed = 7u32;
    let pixels = (0..256)
        .map(|_| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((seed >> 16) % 4) as u8
        })
        .collect();
    GifFrame::new(IndexedRaster::new(16, 16, pixels))
}

/// Bytes of a two-frame GIF and the offset where the second frame starts.
fn two_frames() -> (Vec<u8>, usize) {
    let first_only = writer::write(&document(), [small()], Vec::new()).unwrap();
    let both = writer::write(&document(), [small(), noisy()], Vec::new()).unwrap();
    // drop the trailer
    let second_start = first_only.len() - 1;
    assert_eq!(&both[..second_start], &first_only[..second_start]);
    (both, second_start)
}

#[test]
fn truncation_inside_image_data_keeps_earlier_frames() {
    let (bytes, second_start) = two_frames();
    // descriptor, code size, sub-block length, then three bytes of data
    let cut = &bytes[..second_start + 10 + 1 + 1 + 3];

    let animation = parser::read_all(cut).unwrap();
    assert_eq!(animation.frames, vec![small()]);
    assert!(matches!(
        animation.stopped,
        Some(DecodeError::TruncatedStream { frame_index: 1 })
    ));
}

#[test]
fn truncation_inside_descriptor_is_reported() {
    let (bytes, second_start) = two_frames();
    let mut decoder = Decoder::new(&bytes[..second_start + 4]).unwrap();

    assert_eq!(decoder.next().unwrap().unwrap(), small());
    let err = decoder.next().unwrap().unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(err.frame_index(), Some(1));
    assert!(decoder.next().is_none());
    assert_eq!(decoder.frames_read(), 1);
}

#[test]
fn missing_trailer_at_block_boundary_is_a_clean_end() {
    let (bytes, second_start) = two_frames();
    let animation = parser::read_all(&bytes[..second_start]).unwrap();
    assert_eq!(animation.frames, vec![small()]);
    assert!(animation.stopped.is_none());
}

#[test]
fn truncation_before_first_image_surfaces_on_first_read() {
    let mut bytes = writer::write(&document(), [small()], Vec::new()).unwrap();
    // 13 byte screen descriptor plus 4 color table entries
    bytes.truncate(13 + 12);
    bytes.extend([0x21, 0xfe, 10, b'a', b'b', b'c']);

    let animation = parser::read_all(&bytes[..]).unwrap();
    assert!(animation.frames.is_empty());
    assert!(matches!(
        animation.stopped,
        Some(DecodeError::TruncatedStream { frame_index: 0 })
    ));
}

#[test]
fn truncated_header_is_fatal() {
    let bytes = writer::write(&document(), [small()], Vec::new()).unwrap();
    let err = parser::read_all(&bytes[..8]).unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedStream { frame_index: 0 }));
}

#[test]
fn unknown_extension_between_frames_is_skipped() {
    let (bytes, second_start) = two_frames();

    let mut spliced = bytes[..second_start].to_vec();
    // graphic control, then a plain text extension before the image it applies to
    spliced.extend([0x21, 0xf9, 4, 0b0000_1000, 7, 0, 0, 0]);
    spliced.extend([0x21, 0x01, 12]);
    spliced.extend([0; 12]);
    spliced.extend([3, b'a', b'b', b'c', 0]);
    spliced.extend(&bytes[second_start..]);

    let animation = parser::read_all(&spliced[..]).unwrap();
    assert!(animation.stopped.is_none());
    assert_eq!(animation.frames.len(), 2);
    assert_eq!(animation.frames[0], small());

    let second = &animation.frames[1];
    assert_eq!(second.image, noisy().image);
    assert_eq!(second.disposal_method, DisposalMethod::RestoreToBackground);
    assert_eq!(second.delay_centiseconds, 7);
}

/// A 1x1 screen holding one frame that claims `width`x`height` but carries
/// the code stream for a single pixel.
fn oversized_frame(width: u16, height: u16, interlaced: bool) -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend([1, 0, 1, 0, 0b1000_0000, 0, 0]);
    bytes.extend([0, 0, 0, 255, 255, 255]);
    bytes.push(0x2c);
    bytes.extend([0, 0, 0, 0]);
    bytes.extend(width.to_le_bytes());
    bytes.extend(height.to_le_bytes());
    bytes.push(if interlaced { 0b0100_0000 } else { 0 });

    let data = lzw::encode(&[1], LzwConfig::gif(2)).unwrap();
    bytes.push(2);
    bytes.push(data.len() as u8);
    bytes.extend(&data);
    bytes.extend([0, 0x3b]);
    bytes
}

#[test]
fn huge_descriptor_with_tiny_data_stays_small() {
    for interlaced in [false, true] {
        let bytes = oversized_frame(u16::MAX, u16::MAX, interlaced);
        let animation = parser::read_all(&bytes[..]).unwrap();
        assert!(animation.stopped.is_none());
        assert_eq!(animation.frames.len(), 1);

        let frame = &animation.frames[0];
        assert_eq!((frame.width(), frame.height()), (u16::MAX, u16::MAX));
        assert_eq!(frame.image.pixels, vec![1]);

        let tick = Compositor::new(&animation.document).render(frame);
        assert_eq!(tick.pixels, vec![0xffff_ffff]);
    }
}

#[test]
fn short_frame_within_padding_limit_is_filled() {
    let bytes = oversized_frame(64, 64, false);
    assert!(64 * 64 <= MAX_PADDED_PIXELS);

    let animation = parser::read_all(&bytes[..]).unwrap();
    let pixels = &animation.frames[0].image.pixels;
    assert_eq!(pixels.len(), 64 * 64);
    assert_eq!(pixels[0], 1);
    assert!(pixels[1..].iter().all(|&index| index == 0));
}
