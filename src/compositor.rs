//! Reconstructs what a viewer shows for each frame of an animation.
//!
//! Frames may cover only part of the logical screen, be partly transparent,
//! and ask for their area to be cleared or restored before the next frame is
//! drawn. The [`Compositor`] owns one canvas for the whole animation and
//! applies those rules frame by frame.

use log::{debug, warn};

use crate::model::{ArgbRaster, DisposalMethod, GifDocument, GifFrame, Rgb};

const TRANSPARENT: u32 = 0x0000_0000;
// indices past the end of a color table
const OUT_OF_TABLE: u32 = 0xff00_0000;

/// Part of the canvas covered by a frame, clipped to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

#[derive(Debug)]
struct PendingDisposal {
    region: Region,
    method: DisposalMethod,
    // canvas contents of `region` before the frame was drawn
    backup: Vec<u32>,
}

#[derive(Debug)]
pub struct Compositor {
    canvas: ArgbRaster,
    global_color_table: Option<Vec<Rgb>>,
    pending: Option<PendingDisposal>,
    ticks: usize,
}

impl Compositor {
    /// Start a fully transparent canvas the size of the logical screen.
    pub fn new(document: &GifDocument) -> Self {
        Self {
            canvas: ArgbRaster::new(
                document.logical_screen_width as u32,
                document.logical_screen_height as u32,
            ),
            global_color_table: document.global_color_table.clone(),
            pending: None,
            ticks: 0,
        }
    }

    /// The canvas as it stands, with the last frame's disposal not yet applied.
    pub fn canvas(&self) -> &ArgbRaster {
        &self.canvas
    }

    /// Draw `frame` and return a copy of the visible canvas.
    pub fn render(&mut self, frame: &GifFrame) -> ArgbRaster {
        self.dispose_previous();

        let region = self.clip(frame);
        let backup = self.copy_region(region);
        self.draw(frame, region);
        self.pending = Some(PendingDisposal {
            region,
            method: frame.disposal_method,
            backup,
        });

        debug!("rendered tick {} ({:?} pending)", self.ticks, frame.disposal_method);
        self.ticks += 1;
        self.canvas.clone()
    }

    fn dispose_previous(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending.method {
            DisposalMethod::RestoreToBackground => {
                self.fill_region(pending.region, TRANSPARENT);
            }
            DisposalMethod::RestoreToPrevious => {
                self.write_region(pending.region, &pending.backup);
            }
            DisposalMethod::Unspecified | DisposalMethod::LeaveAsIs | DisposalMethod::Reserved(_) => {}
        }
    }

    fn clip(&self, frame: &GifFrame) -> Region {
        let left = (frame.left as u32).min(self.canvas.width);
        let top = (frame.top as u32).min(self.canvas.height);
        let (right, bottom) = frame.extent();
        Region {
            left,
            top,
            width: right.min(self.canvas.width) - left,
            height: bottom.min(self.canvas.height) - top,
        }
    }

    fn rows(&self, region: Region) -> impl Iterator<Item = std::ops::Range<usize>> {
        let stride = self.canvas.width as usize;
        (region.top..region.top + region.height).map(move |y| {
            let start = y as usize * stride + region.left as usize;
            start..start + region.width as usize
        })
    }

    fn copy_region(&self, region: Region) -> Vec<u32> {
        let mut copy = Vec::with_capacity((region.width * region.height) as usize);
        for row in self.rows(region) {
            copy.extend_from_slice(&self.canvas.pixels[row]);
        }
        copy
    }

    fn write_region(&mut self, region: Region, pixels: &[u32]) {
        if region.width == 0 {
            return;
        }
        let rows: Vec<_> = self.rows(region).collect();
        for (row, source) in rows.into_iter().zip(pixels.chunks(region.width as usize)) {
            self.canvas.pixels[row].copy_from_slice(source);
        }
    }

    fn fill_region(&mut self, region: Region, argb: u32) {
        let rows: Vec<_> = self.rows(region).collect();
        for row in rows {
            self.canvas.pixels[row].fill(argb);
        }
    }

    fn draw(&mut self, frame: &GifFrame, region: Region) {
        if region.width == 0 || region.height == 0 {
            return;
        }
        let table = match frame
            .image
            .local_color_table
            .as_deref()
            .or(self.global_color_table.as_deref())
        {
            Some(table) => table,
            None => {
                warn!("frame has no color table, leaving the canvas unchanged");
                return;
            }
        };

        let mut colors = [OUT_OF_TABLE; 256];
        for (color, rgb) in colors.iter_mut().zip(table) {
            *color = rgb.to_argb();
        }

        // a non-empty region always starts at the frame origin
        let frame_width = frame.image.width as usize;
        let stride = self.canvas.width as usize;

        for y in 0..region.height as usize {
            let source_start = y * frame_width;
            let Some(source) = frame.image.pixels.get(source_start..source_start + region.width as usize) else {
                break;
            };
            let target_start = (region.top as usize + y) * stride + region.left as usize;
            let target = &mut self.canvas.pixels[target_start..target_start + region.width as usize];

            for (pixel, &index) in target.iter_mut().zip(source) {
                if frame.transparent_index == Some(index) {
                    continue;
                }
                *pixel = colors[index as usize];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndexedRaster;

    const T: u32 = TRANSPARENT;
    const R: u32 = 0xffff_0000;
    const G: u32 = 0xff00_ff00;
    const B: u32 = 0xff00_00ff;
    const W: u32 = 0xffff_ffff;

    fn document() -> GifDocument {
        let mut document = GifDocument::new(3, 3);
        document.global_color_table = Some(vec![
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(255, 255, 255),
        ]);
        document
    }

    fn frame(left: u16, top: u16, width: u16, height: u16, pixels: Vec<u8>, disposal: DisposalMethod) -> GifFrame {
        let mut frame = GifFrame::new(IndexedRaster::new(width, height, pixels));
        frame.left = left;
        frame.top = top;
        frame.disposal_method = disposal;
        frame
    }

    #[test]
    fn applies_each_disposal_before_the_next_frame() {
        let mut compositor = Compositor::new(&document());

        let background = frame(0, 0, 3, 3, vec![2; 9], DisposalMethod::LeaveAsIs);
        let tick0 = compositor.render(&background);
        assert_eq!(tick0.pixels, vec![B; 9]);

        let cleared = frame(0, 0, 2, 2, vec![0; 4], DisposalMethod::RestoreToBackground);
        let tick1 = compositor.render(&cleared);
        assert_eq!(tick1.pixels, vec![R, R, B, R, R, B, B, B, B]);

        let mut restored = frame(1, 1, 2, 2, vec![1, 3, 1, 1], DisposalMethod::RestoreToPrevious);
        restored.transparent_index = Some(3);
        let tick2 = compositor.render(&restored);
        assert_eq!(tick2.pixels, vec![T, T, B, T, G, B, B, G, G]);

        let kept = frame(2, 0, 1, 3, vec![3, 0, 3], DisposalMethod::LeaveAsIs);
        let tick3 = compositor.render(&kept);
        assert_eq!(tick3.pixels, vec![T, T, W, T, T, R, B, B, W]);

        // returned ticks are snapshots
        assert_eq!(tick1.pixels, vec![R, R, B, R, R, B, B, B, B]);
        assert_eq!(compositor.canvas(), &tick3);
    }

    #[test]
    fn reserved_disposal_leaves_canvas_alone() {
        let mut compositor = Compositor::new(&document());
        compositor.render(&frame(0, 0, 1, 1, vec![0], DisposalMethod::from_u8(6)));
        let tick = compositor.render(&frame(1, 0, 1, 1, vec![1], DisposalMethod::Unspecified));
        assert_eq!(tick.pixels, vec![R, G, T, T, T, T, T, T, T]);
    }

    #[test]
    fn clips_frames_that_overhang_the_screen() {
        let mut compositor = Compositor::new(&document());
        let tick = compositor.render(&frame(2, 2, 2, 2, vec![0, 1, 2, 3], DisposalMethod::RestoreToBackground));
        assert_eq!(tick.pixels, vec![T, T, T, T, T, T, T, T, R]);

        let outside = frame(5, 5, 1, 1, vec![0], DisposalMethod::RestoreToPrevious);
        let tick = compositor.render(&outside);
        assert_eq!(tick.pixels, vec![T; 9]);
    }

    #[test]
    fn local_table_and_out_of_table_indices() {
        let mut compositor = Compositor::new(&document());
        let mut local = frame(0, 0, 2, 1, vec![0, 5], DisposalMethod::Unspecified);
        local.image.local_color_table = Some(vec![Rgb::new(1, 2, 3)]);
        let tick = compositor.render(&local);
        assert_eq!(&tick.pixels[..2], &[0xff01_0203, OUT_OF_TABLE]);
    }
}
