use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

use anyhow::Result;

use gifwright::ArgbRaster;

const MAGIC_NUMBER: &[u8] = b"P3";

/// Write `raster` as a plain-text PPM. Transparent pixels come out white.
pub fn write_ppm(path: &Path, raster: &ArgbRaster) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_pixels(&mut writer, raster, 0x00ff_ffff)?;
    writer.flush()?;
    Ok(())
}

fn write_pixels<W: Write>(writer: &mut W, raster: &ArgbRaster, background: u32) -> Result<()> {
    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writer.write_all(format!("{} {}", raster.width, raster.height).as_bytes())?;
    writer.write_all(b" 255")?;
    writer.write_all(b"\n")?;

    for row in raster.rows() {
        let line: Vec<String> = row
            .iter()
            .map(|&argb| {
                let argb = blend(argb, background);
                format!("{: >3} {: >3} {: >3}", (argb >> 16) & 0xff, (argb >> 8) & 0xff, argb & 0xff)
            })
            .collect();
        writer.write_all(line.join(" ").as_bytes())?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}

// 1-bit alpha is all the compositor produces
fn blend(argb: u32, background: u32) -> u32 {
    if argb >> 24 == 0 {
        background
    } else {
        argb
    }
}
