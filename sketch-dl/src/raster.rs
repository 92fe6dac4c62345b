//! Stroke rasterization onto fixed-size square canvases.

use crate::{common::*, dataset::Stroke};
use image::{
    imageops::{self, FilterType},
    ImageFormat, Rgb, RgbImage,
};

/// Native canvas edge length of the source drawings.
pub const IMAGE_SIZE: u32 = 256;

/// Default factor the rendered canvas is scaled down by.
pub const IMAGE_SCALE: f64 = 0.25;

/// Default stroke width in canvas units.
pub const STROKE_WIDTH: f32 = 5.0;

/// Canvas background value, also the value of untouched grid pixels.
pub const BACKGROUND: [u8; 3] = [0, 0, 0];

/// Stroke colors, cycled by the stroke's position in the drawing.
pub const PALETTE: [Rgb<u8>; 10] = [
    Rgb([255, 255, 255]), // white
    Rgb([255, 0, 0]),     // red
    Rgb([0, 0, 255]),     // blue
    Rgb([0, 128, 0]),     // green
    Rgb([255, 255, 0]),   // yellow
    Rgb([128, 0, 128]),   // purple
    Rgb([255, 165, 0]),   // orange
    Rgb([128, 128, 128]), // gray
    Rgb([0, 255, 255]),   // cyan
    Rgb([255, 192, 203]), // pink
];

/// Row-major RGB pixel matrix read back from a rendered canvas.
///
/// Indexed `[row][col][channel]` in raster scan order, top-to-bottom and
/// left-to-right. All grids of one dataset-building run share dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    image: RgbImage,
}

impl PixelGrid {
    /// Edge length of the square grid.
    pub fn size(&self) -> usize {
        self.image.width() as usize
    }

    /// The `[R, G, B]` value at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> [u8; 3] {
        self.image.get_pixel(col as u32, row as u32).0
    }

    /// The flat pixel buffer in `[row][col][channel]` scan order.
    pub fn as_flat(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Save the grid as a PNG file. Purely diagnostic.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to save image to '{}'", path.display()))
    }
}

impl Index<(usize, usize)> for PixelGrid {
    type Output = [u8; 3];

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.image.get_pixel(col as u32, row as u32).0
    }
}

/// Renders drawings onto per-call canvases with a fixed palette and stroke
/// width.
///
/// Committed strokes never persist between calls; every rasterization starts
/// from a cleared canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Rasterizer {
    canvas_size: u32,
    stroke_width: f32,
    scale: Option<f64>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            canvas_size: IMAGE_SIZE,
            stroke_width: STROKE_WIDTH,
            scale: Some(IMAGE_SCALE),
        }
    }
}

impl Rasterizer {
    /// A rasterizer drawing on a `canvas_size` square canvas. With a `scale`
    /// factor, the rendered canvas is downsampled before readback.
    pub fn new(canvas_size: u32, stroke_width: f32, scale: Option<f64>) -> Result<Self> {
        ensure!(canvas_size > 0, "canvas size must be positive");
        ensure!(stroke_width > 0.0, "stroke width must be positive");
        if let Some(scale) = scale {
            ensure!(
                scale > 0.0 && scale <= 1.0,
                "scale factor {} out of range (0, 1]",
                scale
            );
        }

        Ok(Self {
            canvas_size,
            stroke_width,
            scale,
        })
    }

    /// Edge length of the grids this rasterizer produces.
    pub fn output_size(&self) -> usize {
        match self.scale {
            Some(scale) => (self.canvas_size as f64 * scale).round() as usize,
            None => self.canvas_size as usize,
        }
    }

    /// Render `drawing` onto a fresh canvas and read it back as a grid.
    ///
    /// Each stroke is a connected polyline drawn with the palette color at
    /// the stroke's index modulo the palette length. A stroke with fewer
    /// than two points is a bare move and leaves no mark. In scaled mode the
    /// rendered canvas is downsampled with bilinear filtering, so native
    /// resolution anti-aliasing is preserved before the resize.
    pub fn rasterize(&self, drawing: &[Stroke]) -> PixelGrid {
        let mut canvas = Canvas::new(self.canvas_size);

        for (index, stroke) in drawing.iter().enumerate() {
            canvas.draw_polyline(stroke, PALETTE[index % PALETTE.len()], self.stroke_width);
        }

        let image = canvas.into_image();
        let image = match self.scale {
            Some(_) => {
                let side = self.output_size() as u32;
                imageops::resize(&image, side, side, FilterType::Triangle)
            }
            None => image,
        };

        PixelGrid { image }
    }

    /// Render `drawing` and additionally save the read-back image to `path`.
    pub fn rasterize_to(&self, drawing: &[Stroke], path: impl AsRef<Path>) -> Result<PixelGrid> {
        let grid = self.rasterize(drawing);
        grid.save(path)?;
        Ok(grid)
    }
}

/// Drawing surface scoped to a single rasterization call.
#[derive(Debug)]
struct Canvas {
    size: u32,
    image: RgbImage,
    // per-stroke coverage scratch mask
    coverage: Vec<f32>,
}

impl Canvas {
    fn new(size: u32) -> Self {
        Self {
            size,
            image: RgbImage::new(size, size),
            coverage: vec![0.0; (size * size) as usize],
        }
    }

    /// Accumulate the stroke's anti-aliased coverage over all of its
    /// segments, then composite the stroke color source-over onto the canvas
    /// in one pass, so overlapping segments of one stroke blend once.
    fn draw_polyline(&mut self, stroke: &Stroke, color: Rgb<u8>, width: f32) {
        let points: Vec<(f32, f32)> = stroke
            .points()
            .map(|(x, y)| (x as f32, y as f32))
            .collect();
        if points.len() < 2 {
            return;
        }

        self.coverage.iter_mut().for_each(|cell| *cell = 0.0);
        for segment in points.windows(2) {
            self.cover_segment(segment[0], segment[1], width / 2.0);
        }

        let Rgb([red, green, blue]) = color;
        let color = [red as f32, green as f32, blue as f32];
        for (pixel, &coverage) in self.image.pixels_mut().zip(&self.coverage) {
            if coverage <= 0.0 {
                continue;
            }
            for channel in 0..3 {
                let dst = pixel.0[channel] as f32;
                pixel.0[channel] =
                    (color[channel] * coverage + dst * (1.0 - coverage)).round() as u8;
            }
        }
    }

    /// Max-blend an anti-aliased capsule around one segment into the scratch
    /// mask. Coverage falls off linearly over a half-pixel feather beyond
    /// `half_width`; a zero-length segment degenerates to a round dot.
    fn cover_segment(&mut self, (x0, y0): (f32, f32), (x1, y1): (f32, f32), half_width: f32) {
        let reach = half_width + 0.5;
        let limit = (self.size - 1) as f32;

        let min_col = (x0.min(x1) - reach).floor().clamp(0.0, limit) as u32;
        let max_col = (x0.max(x1) + reach).ceil().clamp(0.0, limit) as u32;
        let min_row = (y0.min(y1) - reach).floor().clamp(0.0, limit) as u32;
        let max_row = (y0.max(y1) + reach).ceil().clamp(0.0, limit) as u32;

        let (dx, dy) = (x1 - x0, y1 - y0);
        let length2 = dx * dx + dy * dy;

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let (px, py) = (col as f32 + 0.5, row as f32 + 0.5);
                let t = if length2 == 0.0 {
                    0.0
                } else {
                    (((px - x0) * dx + (py - y0) * dy) / length2).clamp(0.0, 1.0)
                };
                let (nx, ny) = (x0 + t * dx, y0 + t * dy);
                let distance = ((px - nx).powi(2) + (py - ny).powi(2)).sqrt();
                let coverage = (half_width + 0.5 - distance).clamp(0.0, 1.0);

                let cell = &mut self.coverage[(row * self.size + col) as usize];
                if coverage > *cell {
                    *cell = coverage;
                }
            }
        }
    }

    fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native() -> Rasterizer {
        Rasterizer::new(IMAGE_SIZE, STROKE_WIDTH, None).unwrap()
    }

    #[test]
    fn empty_drawing_is_background_test() {
        let grid = native().rasterize(&[]);
        assert_eq!(grid.size(), 256);
        for row in 0..grid.size() {
            for col in 0..grid.size() {
                assert_eq!(grid.get(row, col), BACKGROUND);
            }
        }
    }

    #[test]
    fn horizontal_line_test() {
        let stroke = Stroke((0..=10).collect(), vec![0; 11]);
        let grid = native().rasterize(&[stroke]);

        // the full run of the segment is marked on its own row
        for col in 0..=10 {
            assert_ne!(grid.get(0, col), BACKGROUND, "column {} not drawn", col);
        }

        // rows under the center line are fully covered, the last row of the
        // thickness envelope carries exactly half coverage of white
        assert_eq!(grid.get(1, 5), [255, 255, 255]);
        assert_eq!(grid.get(2, 5), [128, 128, 128]);

        // everything beyond the stroke's thickness envelope stays background
        for row in 4..grid.size() {
            for col in 0..grid.size() {
                assert_eq!(grid.get(row, col), BACKGROUND, "row {} col {}", row, col);
            }
        }
        for row in 0..4 {
            for col in 14..grid.size() {
                assert_eq!(grid.get(row, col), BACKGROUND, "row {} col {}", row, col);
            }
        }
    }

    #[test]
    fn single_point_stroke_leaves_no_mark_test() {
        let grid = native().rasterize(&[Stroke(vec![100], vec![100])]);
        assert_eq!(grid.get(100, 100), BACKGROUND);
    }

    #[test]
    fn palette_cycles_test() {
        // 11 horizontal strokes, 20 rows apart; stroke 10 reuses color 0
        let drawing: Vec<_> = (0..11)
            .map(|index| {
                let y = (index * 20) as u8;
                Stroke(vec![40, 80], vec![y, y])
            })
            .collect();
        let grid = native().rasterize(&drawing);

        for (index, stroke) in drawing.iter().enumerate() {
            let row = stroke.ys()[0] as usize;
            let Rgb(expected) = PALETTE[index % PALETTE.len()];
            // a fully covered interior pixel carries the exact palette color
            assert_eq!(grid.get(row, 60), expected, "stroke {}", index);
        }
        assert_eq!(grid.get(200, 60), grid.get(0, 60));
    }

    #[test]
    fn scaled_mode_test() {
        let rasterizer = Rasterizer::default();
        assert_eq!(rasterizer.output_size(), 64);

        let grid = rasterizer.rasterize(&[]);
        assert_eq!(grid.size(), 64);
        assert!(grid.as_flat().iter().all(|&value| value == 0));

        let stroke = Stroke(vec![0, 255], vec![0, 255]);
        let grid = rasterizer.rasterize(&[stroke]);
        assert_eq!(grid.size(), 64);
        assert!(grid.as_flat().iter().any(|&value| value != 0));
    }

    #[test]
    fn canvas_state_does_not_leak_test() {
        let rasterizer = native();
        let stroke = Stroke(vec![0, 255], vec![128, 128]);
        rasterizer.rasterize(&[stroke]);

        // a later call starts from a cleared canvas
        let grid = rasterizer.rasterize(&[]);
        assert_eq!(grid.get(128, 128), BACKGROUND);
    }

    #[test]
    fn save_side_effect_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("drawing.png");

        let stroke = Stroke(vec![10, 200], vec![30, 90]);
        let saved = Rasterizer::default().rasterize_to(&[stroke.clone()], &path)?;
        assert!(path.is_file());

        // saving does not change the readback
        assert_eq!(saved, Rasterizer::default().rasterize(&[stroke]));
        Ok(())
    }

    #[test]
    fn rejects_bad_config_test() {
        assert!(Rasterizer::new(0, 5.0, None).is_err());
        assert!(Rasterizer::new(256, 0.0, None).is_err());
        assert!(Rasterizer::new(256, 5.0, Some(0.0)).is_err());
        assert!(Rasterizer::new(256, 5.0, Some(1.5)).is_err());
    }
}
