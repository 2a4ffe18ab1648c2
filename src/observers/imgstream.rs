use na::DMatrix;
use plotters::prelude::*;
use std::{error::Error, fs, path::Path, sync::mpsc};
use tracing::debug;

#[derive(Clone)]
pub struct DisplayPacket {
    pub field: DMatrix<f64>,
    pub i: usize,
}

/// Map a value into a gray level between the frame's min and max
fn intensity(value: f64, min: f64, max: f64) -> u8 {
    if max - min <= f64::EPSILON {
        return 0;
    }

    (254.0 * ((value - min) / (max - min)).clamp(0., 1.)).floor() as u8
}

/// Save a field as a grayscale PNG, one pixel per cell. Grid row `j = 0`
/// is drawn at the bottom and solid cells are painted black.
pub fn image_save(
    bitmap: &DMatrix<f64>,
    solid: &DMatrix<f64>,
    filename: &str,
    frames_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let (num_x, num_y) = bitmap.shape();

    let filename = frames_dir.join(filename);

    let root = BitMapBackend::new(&filename, (num_x as u32, num_y as u32)).into_drawing_area();
    root.fill(&BLACK)?;

    let fluid_values = bitmap
        .iter()
        .zip(solid.iter())
        .filter(|(_, s)| **s != 0.)
        .map(|(v, _)| *v);
    let (min, max) = fluid_values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    for i in 0..num_x {
        for j in 0..num_y {
            if solid[(i, j)] == 0. {
                continue;
            }

            let level = intensity(bitmap[(i, j)], min, max);
            let pixel_color = &RGBColor(level, level, level);

            root.draw_pixel((i as i32, (num_y - 1 - j) as i32), pixel_color)?;
        }
    }
    root.present()?;

    Ok(())
}

/// Write every inbound frame until the sending side hangs up
pub fn image_io_loop(
    inbound_bitmaps: mpsc::Receiver<DisplayPacket>,
    solid: DMatrix<f64>,
    frames_dir: &Path,
) -> Result<usize, Box<dyn Error>> {
    if (frames_dir).exists() {
        fs::remove_dir_all(frames_dir)?;
    }
    fs::create_dir_all(frames_dir)?;

    let mut written = 0;
    while let Ok(inbound) = inbound_bitmaps.recv() {
        image_save(
            &inbound.field,
            &solid,
            format!("{}.png", inbound.i).as_str(),
            frames_dir,
        )?;
        written += 1;
    }

    debug!("Frame writer finished after {} frames", written);

    Ok(written)
}
