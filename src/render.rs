// Rendering of exponent grids into BMP images

use image::{ImageFormat, Rgb as Pixel, RgbImage};
use log::{info, warn};
use std::path::Path;

use crate::color::{IntervalColorMap, Rgb};
use crate::error::LyapResult;
use crate::field::LyapunovField;

/// Paint a row-major grid, row 0 at the bottom of the picture
pub fn paint_grid(
    grid: &[f64],
    width: usize,
    height: usize,
    coloring: &IntervalColorMap,
    gap_color: Rgb,
) -> RgbImage {
    let mut img = RgbImage::new(width as u32, height as u32);
    let mut gaps = 0usize;

    for (y, row) in grid.chunks(width.max(1)).take(height).enumerate() {
        let img_y = (height - 1 - y) as u32;
        for (x, &w) in row.iter().enumerate() {
            let c = coloring.color_at(w).unwrap_or_else(|| {
                gaps += 1;
                gap_color
            });
            img.put_pixel(x as u32, img_y, Pixel([c.r, c.g, c.b]));
        }
    }

    if gaps > 0 {
        warn!("{gaps} cells fell between color intervals");
    }
    img
}

/// Render the field's current grid with its own coloring
pub fn render_image(field: &LyapunovField, gap_color: Rgb) -> RgbImage {
    paint_grid(field.grid(), field.width(), field.height(), field.coloring(), gap_color)
}

/// Render and write a 24-bit BMP
pub fn render_bmp<P: AsRef<Path>>(field: &LyapunovField, path: P, gap_color: Rgb) -> LyapResult<()> {
    let path = path.as_ref();
    render_image(field, gap_color).save_with_format(path, ImageFormat::Bmp)?;
    info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorInterval;
    use image::GenericImageView;
    use test_log::test;

    fn banded() -> IntervalColorMap {
        let mut map = IntervalColorMap::new(Rgb::new(10, 0, 0), Rgb::new(0, 10, 0));
        map.add_interval(ColorInterval::new(0.0, 1.0, Rgb::new(100, 100, 100), Rgb::new(100, 100, 100)).unwrap())
            .unwrap();
        map.add_interval(ColorInterval::new(2.0, 3.0, Rgb::new(200, 200, 200), Rgb::new(200, 200, 200)).unwrap())
            .unwrap();
        map
    }

    #[test]
    fn row_zero_is_drawn_at_the_bottom() {
        // 2x2: bottom row below/inside, top row gap/above
        let grid = [-5.0, 0.5, 1.5, 9.0];
        let img = paint_grid(&grid, 2, 2, &banded(), Rgb::new(1, 2, 3));
        assert_eq!(img.get_pixel(0, 1).0, [10, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [100, 100, 100]);
        assert_eq!(img.get_pixel(0, 0).0, [1, 2, 3]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 10, 0]);
    }

    #[test]
    fn bmp_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.bmp");
        let mut field = LyapunovField::default();
        field.set_size(8, 4);
        field.compute();
        render_bmp(&field, &path, Rgb::BLACK).unwrap();

        let back = image::open(&path).unwrap();
        assert_eq!(back.dimensions(), (8, 4));
        assert_eq!(back.to_rgb8(), render_image(&field, Rgb::BLACK));
    }
}
