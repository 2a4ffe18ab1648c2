/// Handles PNG obstacle input

use image::{GenericImageView, ImageReader, Pixel, imageops::FilterType};
use na::DMatrix;
use std::{error::Error, path::Path};

const THRESHOLD_LUMA: u8 = 127;

/// Load an obstacle mask from a PNG image by looking at pixel luminosity.
/// The image is stretched over the whole padded grid; dark pixels are solid.
///
/// Parameters
/// - `image` - The path to the image to process
/// - `num_x`, `num_y` - The grid's storage dimensions
///
/// Returns
/// - A `(num_x, num_y)` mask indexed like the grid, `true` where solid
pub fn mask_from_image(
    image: &Path,
    num_x: usize,
    num_y: usize,
) -> Result<DMatrix<bool>, Box<dyn Error>> {
    let image = ImageReader::open(image)?
        .decode()?
        .resize_exact(num_x as u32, num_y as u32, FilterType::Nearest);

    Ok(mask_from_pixels(&image, num_x, num_y))
}

/// Image rows run top to bottom while grid `j` runs bottom to top.
fn mask_from_pixels<I: GenericImageView>(image: &I, num_x: usize, num_y: usize) -> DMatrix<bool>
where
    I::Pixel: Pixel<Subpixel = u8>,
{
    let mut mask: DMatrix<bool> = DMatrix::from_element(num_x, num_y, false);

    image.pixels().for_each(|(x, y, color)| {
        let (i, j) = (x as usize, num_y - 1 - y as usize);
        if i < num_x && j < num_y {
            mask[(i, j)] = color.to_luma().0[0] < THRESHOLD_LUMA;
        }
    });

    mask
}
