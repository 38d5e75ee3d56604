use gifwright::parser::{self, Decoder};
use gifwright::writer::{self, Encoder};
use gifwright::{xmp, ApplicationExtension, Compositor, DisposalMethod, EncodeError, GifDocument, GifFrame, IndexedRaster, Rgb, Version};

fn palette() -> Vec<Rgb> {
    vec![
        Rgb::new(0, 0, 0),
        Rgb::new(255, 0, 0),
        Rgb::new(0, 255, 0),
        Rgb::new(0, 0, 255),
    ]
}

// deterministic pixel noise below `colors`
fn noise(len: usize, colors: u8, mut seed: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((seed >> 16) % colors as u32) as u8
        })
        .collect()
}

fn frame_at(left: u16, top: u16, width: u16, height: u16, pixels: Vec<u8>) -> GifFrame {
    let mut frame = GifFrame::new(IndexedRaster::new(width, height, pixels));
    frame.left = left;
    frame.top = top;
    frame
}

#[test]
fn frames_and_document_survive_a_round_trip() {
    let mut document = GifDocument::new(6, 4);
    document.global_color_table = Some(palette());
    document.background_color_index = 2;
    document.color_resolution = 7;
    document.loop_count = Some(0);
    document.comments = vec![b"made by a test".to_vec()];
    document.application_extensions = vec![ApplicationExtension {
        identifier: *b"EXAMPLE ",
        authentication_code: *b"1.0",
        sub_blocks: vec![vec![1, 2, 3], vec![4; 255]],
    }];

    let mut full = frame_at(0, 0, 6, 4, noise(24, 4, 1));
    full.delay_centiseconds = 10;
    full.disposal_method = DisposalMethod::LeaveAsIs;

    let mut partial = frame_at(2, 1, 3, 2, vec![0, 3, 1, 3, 2, 3]);
    partial.transparent_index = Some(3);
    partial.disposal_method = DisposalMethod::RestoreToPrevious;

    let local: Vec<Rgb> = (0..8).map(|i| Rgb::new(i * 30, 255 - i * 30, 7)).collect();
    let mut recolored = frame_at(1, 0, 5, 4, noise(20, 8, 2));
    recolored.image.local_color_table = Some(local);
    recolored.disposal_method = DisposalMethod::RestoreToBackground;
    recolored.user_input_expected = true;

    let plain = frame_at(0, 3, 6, 1, vec![1; 6]);

    let frames = vec![full, partial, recolored, plain];
    let bytes = writer::write(&document, &frames, Vec::new()).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
    assert_eq!(bytes.last(), Some(&0x3b));

    let animation = parser::read_all(&bytes[..]).unwrap();
    assert!(animation.stopped.is_none());
    assert_eq!(animation.frames, frames);

    let decoded = animation.document;
    assert_eq!(decoded.version, Version::V89a);
    assert_eq!((decoded.logical_screen_width, decoded.logical_screen_height), (6, 4));
    assert_eq!(decoded.global_color_table, Some(palette()));
    assert_eq!(decoded.background_color_index, 2);
    assert_eq!(decoded.color_resolution, 7);
    assert_eq!(decoded.loop_count, Some(0));
    assert_eq!(decoded.comments, document.comments);
    assert_eq!(decoded.application_extensions, document.application_extensions);
}

#[test]
fn interlaced_frame_round_trips() {
    let mut document = GifDocument::new(7, 9);
    document.global_color_table = Some(palette());

    // every row distinct so a wrong row order shows
    let pixels: Vec<u8> = (0..9u8).flat_map(|row| (0..7u8).map(move |col| (row + col) % 4)).collect();
    let mut frame = frame_at(0, 0, 7, 9, pixels);
    frame.interlaced = true;

    let bytes = writer::write(&document, [&frame], Vec::new()).unwrap();
    let decoded: Vec<GifFrame> = Decoder::new(&bytes[..]).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(decoded, vec![frame]);
}

#[test]
fn large_noisy_frame_round_trips() {
    let mut document = GifDocument::new(300, 200);
    document.global_color_table = Some((0..=255).map(|i| Rgb::new(i, i, i)).collect());

    let frame = frame_at(0, 0, 300, 200, noise(60_000, 255, 99));
    let bytes = writer::write(&document, [&frame], Vec::new()).unwrap();

    let animation = parser::read_all(&bytes[..]).unwrap();
    assert_eq!(animation.frames, vec![frame]);
}

#[test]
fn streaming_encoder_matches_one_shot_write() {
    let mut document = GifDocument::new(4, 4);
    document.global_color_table = Some(palette());
    let frames = vec![frame_at(0, 0, 4, 4, noise(16, 4, 3)), frame_at(1, 1, 2, 2, vec![3, 2, 1, 0])];

    let mut encoder = Encoder::new(Vec::new(), &document).unwrap();
    for frame in &frames {
        encoder.write_frame(frame).unwrap();
    }
    let streamed = encoder.finish().unwrap();

    assert_eq!(streamed, writer::write(&document, &frames, Vec::new()).unwrap());
}

#[test]
fn gif87a_without_extensions_keeps_its_version() {
    let mut document = GifDocument::new(2, 2);
    document.version = Version::V87a;
    document.global_color_table = Some(palette());

    let bytes = writer::write(&document, [frame_at(0, 0, 2, 2, vec![0, 1, 2, 3])], Vec::new()).unwrap();
    assert_eq!(&bytes[..6], b"GIF87a");
    assert_eq!(parser::read_all(&bytes[..]).unwrap().document.version, Version::V87a);

    document.loop_count = Some(3);
    let bytes = writer::write(&document, [frame_at(0, 0, 2, 2, vec![0, 1, 2, 3])], Vec::new()).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[test]
fn gif87a_frames_with_graphic_control_become_gif89a() {
    let mut document = GifDocument::new(2, 2);
    document.version = Version::V87a;
    document.global_color_table = Some(palette());

    let mut frame = frame_at(0, 0, 2, 2, vec![0, 1, 2, 3]);
    frame.transparent_index = Some(1);

    let bytes = writer::write(&document, [&frame], Vec::new()).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
    assert!(bytes.windows(2).any(|window| window == [0x21, 0xf9]));

    let animation = parser::read_all(&bytes[..]).unwrap();
    assert_eq!(animation.document.version, Version::V89a);
    assert_eq!(animation.frames, vec![frame]);
}

#[test]
fn sort_flags_survive_a_round_trip() {
    let mut document = GifDocument::new(2, 1);
    document.global_color_table = Some(palette());
    document.sorted_global_color_table = true;

    let mut frame = frame_at(0, 0, 2, 1, vec![0, 1]);
    frame.image.local_color_table = Some(vec![Rgb::new(9, 9, 9), Rgb::new(1, 1, 1)]);
    frame.image.sorted_color_table = true;

    let bytes = writer::write(&document, [&frame], Vec::new()).unwrap();
    let animation = parser::read_all(&bytes[..]).unwrap();
    assert!(animation.document.sorted_global_color_table);
    assert_eq!(animation.frames, vec![frame]);
}

#[test]
fn xmp_packet_is_stored_raw_and_recovered() {
    let packet = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF/></x:xmpmeta>"#;
    let mut document = GifDocument::new(2, 1);
    document.global_color_table = Some(palette());
    document.application_extensions.push(xmp::extension(packet).unwrap());

    let bytes = writer::write(&document, [frame_at(0, 0, 2, 1, vec![0, 1])], Vec::new()).unwrap();
    assert!(bytes.windows(packet.len()).any(|window| window == packet.as_bytes()));

    let decoded = parser::read_all(&bytes[..]).unwrap().document;
    assert_eq!(decoded.application_extensions.len(), 1);
    assert_eq!(xmp::extract(&decoded.application_extensions[0]).as_deref(), Some(packet));
}

#[test]
fn writer_rejects_invalid_frames() {
    let mut document = GifDocument::new(4, 4);
    let err = writer::write(&document, [frame_at(0, 0, 2, 2, vec![0; 4])], Vec::new()).unwrap_err();
    assert!(matches!(err, EncodeError::MissingColorTable { frame_index: 0 }));

    document.global_color_table = Some(palette());
    let frames = [frame_at(0, 0, 2, 2, vec![0; 4]), frame_at(3, 3, 2, 2, vec![0; 4])];
    let err = writer::write(&document, &frames, Vec::new()).unwrap_err();
    assert!(matches!(err, EncodeError::FrameOutOfBounds { frame_index: 1, .. }));

    let err = writer::write(&document, [frame_at(0, 0, 2, 2, vec![0; 3])], Vec::new()).unwrap_err();
    assert!(matches!(err, EncodeError::PixelCountMismatch { expected: 4, actual: 3, .. }));

    let mut frame = frame_at(0, 0, 2, 2, vec![0; 4]);
    frame.transparent_index = Some(4);
    let err = writer::write(&document, [frame], Vec::new()).unwrap_err();
    assert!(matches!(err, EncodeError::TransparentIndexOutOfRange { index: 4, .. }));
}

#[test]
fn compositor_renders_decoded_animation() {
    const T: u32 = 0x0000_0000;
    const G: u32 = 0xff00_ff00;
    const B: u32 = 0xff00_00ff;

    let mut document = GifDocument::new(4, 2);
    document.global_color_table = Some(palette());

    let mut cleared = frame_at(0, 0, 4, 2, vec![1; 8]);
    cleared.disposal_method = DisposalMethod::RestoreToBackground;
    let green = frame_at(1, 0, 2, 2, vec![2; 4]);
    let blue = frame_at(3, 1, 1, 1, vec![3]);

    let bytes = writer::write(&document, [cleared, green, blue], Vec::new()).unwrap();

    let mut decoder = Decoder::new(&bytes[..]).unwrap();
    let mut compositor = Compositor::new(decoder.document());
    let mut ticks = Vec::new();
    while let Some(frame) = decoder.read_frame().unwrap() {
        ticks.push(compositor.render(&frame));
    }

    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0].pixels, vec![0xffff_0000; 8]);
    assert_eq!(ticks[1].pixels, vec![T, G, G, T, T, G, G, T]);
    assert_eq!(ticks[2].pixels, vec![T, G, G, T, T, G, G, B]);
}
