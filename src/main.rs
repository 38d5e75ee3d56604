use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use gifwright::parser::Decoder;
use gifwright::{xmp, Compositor};

mod ppm_writer;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(input), Some(output_dir)) = (args.next(), args.next()) else {
        bail!("usage: gifwright <input.gif> <output-dir>");
    };
    let output_dir = PathBuf::from(output_dir);

    let file = File::open(&input).with_context(|| format!("opening {}", input))?;
    let mut decoder = Decoder::new(BufReader::new(file)).with_context(|| format!("reading {}", input))?;
    fs::create_dir_all(&output_dir)?;

    let document = decoder.document();
    info!(
        "{}: {}x{}, version {:?}, loop count {:?}",
        input, document.logical_screen_width, document.logical_screen_height, document.version, document.loop_count
    );
    for packet in document.application_extensions.iter().filter_map(xmp::extract) {
        info!("embedded XMP packet of {} bytes", packet.len());
    }

    let mut compositor = Compositor::new(decoder.document());
    let mut written = 0;
    loop {
        let frame = match decoder.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) if err.is_recoverable() => {
                warn!("stopping early: {}", err);
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let tick = compositor.render(&frame);
        let path = output_dir.join(format!("frame_{}.ppm", written));
        ppm_writer::write_ppm(&path, &tick)?;
        info!("wrote {} ({} cs delay)", path.display(), frame.delay_centiseconds);
        written += 1;
    }

    info!("wrote {} frames", written);
    Ok(())
}
