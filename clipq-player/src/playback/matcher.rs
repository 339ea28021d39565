//! Region-of-interest cropping and template matching
//!
//! Scores follow mean-subtracted normalized cross-correlation
//! (TM_CCOEFF_NORMED): 1.0 is a perfect match, 0.0 no correlation, -1.0 an
//! inverted match. Window means and energies come from integral images, so a
//! full scan costs one multiply-add per template pixel per position.

use image::imageops::{self, FilterType};
use image::GrayImage;

/// Below this energy a region is treated as flat (no texture to correlate)
const FLAT_EPSILON: f64 = 1e-6;

/// Width × height of the sampled region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiSize {
    pub width: u32,
    pub height: u32,
}

/// Crop a region centred on the frame's geometric centre
///
/// The region is clamped to the frame, so a frame smaller than the ROI is
/// returned whole.
pub fn crop_center(frame: &GrayImage, roi: RoiSize) -> GrayImage {
    let width = roi.width.min(frame.width());
    let height = roi.height.min(frame.height());
    let x = (frame.width() - width) / 2;
    let y = (frame.height() - height) / 2;
    imageops::crop_imm(frame, x, y, width, height).to_image()
}

/// Resize by `scale` (1.0 or above returns a copy)
pub fn downscale(image: &GrayImage, scale: f32) -> GrayImage {
    if !(scale > 0.0 && scale < 1.0) {
        return image.clone();
    }
    let width = ((image.width() as f32 * scale).round() as u32).max(1);
    let height = ((image.height() as f32 * scale).round() as u32).max(1);
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Mean-subtracted template, precomputed once per reference pattern
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    width: u32,
    height: u32,
    /// Template pixels minus the template mean, row-major
    centered: Vec<f64>,
    /// Sum of squared centred pixels
    energy: f64,
}

impl PreparedTemplate {
    /// Prepare a template; None when it is empty or has no texture
    pub fn new(template: &GrayImage) -> Option<Self> {
        let (width, height) = template.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let n = (width * height) as f64;
        let mean = template.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
        let centered: Vec<f64> = template.pixels().map(|p| p.0[0] as f64 - mean).collect();
        let energy: f64 = centered.iter().map(|v| v * v).sum();

        if energy < FLAT_EPSILON {
            return None;
        }

        Some(Self {
            width,
            height,
            centered,
            energy,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Summed-area tables of pixel values and squared values
struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];

        for y in 0..height {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let v = image.get_pixel(x as u32, y as u32).0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }

        Self { stride, sum, sum_sq }
    }

    /// (sum, sum of squares) over the w×h window at (x, y)
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let at = |t: &Vec<u64>, xx: usize, yy: usize| t[yy * s + xx] as i128;
        let rect = |t: &Vec<u64>| {
            at(t, x + w, y + h) - at(t, x, y + h) - at(t, x + w, y) + at(t, x, y)
        };
        (rect(&self.sum) as f64, rect(&self.sum_sq) as f64)
    }
}

/// Best correlation score of `template` anywhere inside `haystack`
///
/// None when the template does not fit inside the haystack.
pub fn best_match(haystack: &GrayImage, template: &PreparedTemplate) -> Option<f32> {
    let (hw, hh) = (haystack.width() as usize, haystack.height() as usize);
    let (tw, th) = (template.width as usize, template.height as usize);
    if tw > hw || th > hh {
        return None;
    }

    let integral = IntegralImage::new(haystack);
    let pixels = haystack.as_raw();
    let n = (tw * th) as f64;
    let mut best = f64::NEG_INFINITY;

    for y in 0..=(hh - th) {
        for x in 0..=(hw - tw) {
            let (sum, sum_sq) = integral.window(x, y, tw, th);
            let window_energy = sum_sq - sum * sum / n;
            if window_energy < FLAT_EPSILON {
                // Flat window: nothing to correlate against
                best = best.max(0.0);
                continue;
            }

            // Σ T'·I equals Σ T'·(I - mean) because Σ T' = 0
            let mut cross = 0.0;
            for ty in 0..th {
                let row = (y + ty) * hw + x;
                let trow = &template.centered[ty * tw..(ty + 1) * tw];
                for (tx, t) in trow.iter().enumerate() {
                    cross += t * pixels[row + tx] as f64;
                }
            }

            let score = cross / (template.energy * window_energy).sqrt();
            if score > best {
                best = score;
            }
        }
    }

    Some(best.clamp(-1.0, 1.0) as f32)
}
