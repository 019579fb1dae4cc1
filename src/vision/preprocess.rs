//! Region preprocessing
//!
//! Turns a raw color frame into one normalized 5×7 glyph per region:
//!
//! 0. Blackout rectangles painted black
//! 1. Global crop/pad (negative offsets pad with white)
//! 2. HSV segmentation of the lit-segment color (ink = 0, background = 255)
//! 3. Rotation about the image center
//! 4. Invert (lit segments become foreground) and 3×3 erosion
//! 5. Crop to the region rectangle
//! 6. Autocrop to the foreground bounding box (empty → 1×1 background)
//! 7. Nearest-neighbour resample to 5×7 and binarize
//!
//! Steps 1–4 are independent of the region, so [`PreparedFrame`] computes them
//! once per frame and then serves any number of regions. Every function here is
//! pure; nothing is shared between calls.

use image::{GrayImage, Luma, Rgb, RgbImage};

use super::glyph::{Glyph, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::config::Rect;

/// Mask value of a lit (ink) pixel before inversion
const INK: u8 = 0;

/// Mask value of background before inversion, also the rotation fill
const PAPER: u8 = 255;

/// Fill color used when a negative crop offset pads the frame
const PAD_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Paint color of blackout rectangles
const BLACKOUT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Binary cutoff applied to separator regions before averaging
const SEPARATOR_BINARY_CUTOFF: u8 = 100;

/// A hue interval (degrees) with minimum saturation and value (0.0–1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueBand {
    /// Lower hue bound in degrees, inclusive
    pub min_hue: f32,
    /// Upper hue bound in degrees, inclusive
    pub max_hue: f32,
    /// Minimum saturation
    pub min_saturation: f32,
    /// Minimum value (brightness)
    pub min_value: f32,
}

impl HueBand {
    /// Create a band
    pub fn new(min_hue: f32, max_hue: f32, min_saturation: f32, min_value: f32) -> Self {
        Self {
            min_hue,
            max_hue,
            min_saturation,
            min_value,
        }
    }

    /// Whether an HSV triple falls inside the band
    pub fn contains(&self, hue: f32, saturation: f32, value: f32) -> bool {
        hue >= self.min_hue
            && hue <= self.max_hue
            && saturation >= self.min_saturation
            && value >= self.min_value
    }

    /// Amber/red LED segments; red wraps the hue origin so it needs two bands
    pub fn amber_red() -> Vec<HueBand> {
        vec![
            HueBand::new(0.0, 40.0, 0.35, 0.35),
            HueBand::new(330.0, 360.0, 0.35, 0.35),
        ]
    }
}

/// Camera-wide preprocessing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessParams {
    /// Rotation correction in degrees, counter-clockwise
    pub rotation_degrees: f32,
    /// Number of 3×3 erosion passes
    pub erosion_iterations: u32,
    /// Columns removed from the left (negative pads with white)
    pub crop_left: i32,
    /// Rows removed from the top (negative pads with white)
    pub crop_top: i32,
    /// Lit-segment color bands, OR'd together
    pub hue_bands: Vec<HueBand>,
    /// Autocrop ignores pixels at or below this intensity
    pub noise_threshold: u8,
    /// Resampled pixels above this intensity are lit
    pub binarize_threshold: u8,
    /// Raw-frame rectangles painted black before anything else
    pub blackouts: Vec<Rect>,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            rotation_degrees: 0.0,
            erosion_iterations: 1,
            crop_left: 0,
            crop_top: 0,
            hue_bands: HueBand::amber_red(),
            noise_threshold: 10,
            binarize_threshold: 127,
            blackouts: Vec::new(),
        }
    }
}

/// Convert RGB to HSV: hue in degrees [0, 360), saturation and value in [0, 1]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

/// Paint a rectangle black, clamped to the frame
///
/// Masks a lit area (an advertising board, a second display) that would
/// otherwise be segmented as digit ink.
pub fn black_out(frame: &mut RgbImage, rect: &Rect) {
    let (w, h) = frame.dimensions();
    for y in rect.top.min(h)..rect.bottom.min(h) {
        for x in rect.left.min(w)..rect.right.min(w) {
            frame.put_pixel(x, y, BLACKOUT_COLOR);
        }
    }
}

/// Apply horizontal then vertical offsets
///
/// A positive offset removes that many columns/rows from the left/top edge, a
/// negative one pads with white so region rectangles keep their meaning when
/// the framing drifts. Padding is capped at the frame's own size; anything
/// beyond that is background only.
pub fn crop_or_pad(frame: &RgbImage, left: i32, top: i32) -> RgbImage {
    let (w, h) = frame.dimensions();

    let horizontal = if left >= 0 {
        let skip = (left as u32).min(w);
        RgbImage::from_fn(w - skip, h, |x, y| *frame.get_pixel(x + skip, y))
    } else {
        let pad = left.unsigned_abs().min(w);
        RgbImage::from_fn(w + pad, h, |x, y| {
            if x < pad {
                PAD_COLOR
            } else {
                *frame.get_pixel(x - pad, y)
            }
        })
    };

    let (w, h) = horizontal.dimensions();
    if top >= 0 {
        let skip = (top as u32).min(h);
        RgbImage::from_fn(w, h - skip, |x, y| *horizontal.get_pixel(x, y + skip))
    } else {
        let pad = top.unsigned_abs().min(h);
        RgbImage::from_fn(w, h + pad, |x, y| {
            if y < pad {
                PAD_COLOR
            } else {
                *horizontal.get_pixel(x, y - pad)
            }
        })
    }
}

/// Mark pixels inside any hue band as ink (0), everything else as background (255)
pub fn segment(img: &RgbImage, bands: &[HueBand]) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        let (hue, saturation, value) = rgb_to_hsv(r, g, b);
        let lit = bands.iter().any(|band| band.contains(hue, saturation, value));
        Luma([if lit { INK } else { PAPER }])
    })
}

/// Rotate about the image center (counter-clockwise for positive angles)
///
/// Nearest-neighbour inverse mapping; the output keeps the input size and
/// uncovered pixels are filled with `fill`.
pub fn rotate(img: &GrayImage, degrees: f32, fill: u8) -> GrayImage {
    if degrees == 0.0 {
        return img.clone();
    }

    let (w, h) = img.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;

    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let sx = (cx + dx * cos - dy * sin).floor();
        let sy = (cy + dx * sin + dy * cos).floor();

        if sx >= 0.0 && sy >= 0.0 && (sx as u32) < w && (sy as u32) < h {
            *img.get_pixel(sx as u32, sy as u32)
        } else {
            Luma([fill])
        }
    })
}

/// Invert a binary mask
pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    image::imageops::invert(&mut out);
    out
}

/// 3×3 minimum filter applied `iterations` times; pixels outside the image are ignored
pub fn erode(img: &GrayImage, iterations: u32) -> GrayImage {
    let mut current = img.clone();
    let (w, h) = current.dimensions();

    for _ in 0..iterations {
        let source = current;
        current = GrayImage::from_fn(w, h, |x, y| {
            let mut min = u8::MAX;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    min = min.min(source.get_pixel(nx, ny)[0]);
                }
            }
            Luma([min])
        });
    }

    current
}

/// Crop to a rectangle clamped to the image; returns an empty image if nothing overlaps
pub fn crop_rect(img: &GrayImage, rect: &Rect) -> GrayImage {
    let (w, h) = img.dimensions();
    let left = rect.left.min(w);
    let top = rect.top.min(h);
    let right = rect.right.min(w).max(left);
    let bottom = rect.bottom.min(h).max(top);

    image::imageops::crop_imm(img, left, top, right - left, bottom - top).to_image()
}

/// Crop to the bounding box of pixels brighter than `noise_threshold`
///
/// Without any such pixel the result is a 1×1 background image.
pub fn autocrop(img: &GrayImage, noise_threshold: u8) -> GrayImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[0] <= noise_threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(img, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => GrayImage::new(1, 1),
    }
}

/// Nearest-neighbour resample to 5×7, then binarize at `threshold`
pub fn normalize(img: &GrayImage, threshold: u8) -> Glyph {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Glyph::BLANK;
    }

    Glyph::from_fn(|x, y| {
        let sx = (((x as f32 + 0.5) * w as f32 / GLYPH_WIDTH as f32) as u32).min(w - 1);
        let sy = (((y as f32 + 0.5) * h as f32 / GLYPH_HEIGHT as f32) as u32).min(h - 1);
        img.get_pixel(sx, sy)[0] > threshold
    })
}

/// A frame after the region-independent steps (1–4)
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Rotated segmentation mask, ink = 0
    mask: GrayImage,
    /// Inverted and eroded mask, lit = 255
    foreground: GrayImage,
}

impl PreparedFrame {
    /// Run blackout, crop/pad, segmentation, rotation, inversion and erosion
    pub fn prepare(frame: &RgbImage, params: &PreprocessParams) -> Self {
        let framed = if params.blackouts.is_empty() {
            crop_or_pad(frame, params.crop_left, params.crop_top)
        } else {
            let mut masked = frame.clone();
            for rect in &params.blackouts {
                black_out(&mut masked, rect);
            }
            crop_or_pad(&masked, params.crop_left, params.crop_top)
        };
        let segmented = segment(&framed, &params.hue_bands);
        let mask = rotate(&segmented, params.rotation_degrees, PAPER);
        let foreground = erode(&invert(&mask), params.erosion_iterations);

        Self { mask, foreground }
    }

    /// Dimensions after crop/pad
    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    /// The eroded foreground image (lit = 255)
    pub fn foreground(&self) -> &GrayImage {
        &self.foreground
    }

    /// Normalized glyph for one region (steps 5–7)
    pub fn glyph(&self, rect: &Rect, params: &PreprocessParams) -> Glyph {
        let region = crop_rect(&self.foreground, rect);
        let content = autocrop(&region, params.noise_threshold);
        normalize(&content, params.binarize_threshold)
    }

    /// Mean intensity of a separator region on the binarized mask
    ///
    /// A lit separator is ink, so a low mean means "present". An empty
    /// region reads as full background (255.0).
    pub fn separator_intensity(&self, rect: &Rect) -> f32 {
        let region = crop_rect(&self.mask, rect);
        let count = region.width() as u64 * region.height() as u64;
        if count == 0 {
            return PAPER as f32;
        }

        let sum: u64 = region
            .pixels()
            .map(|p| if p[0] > SEPARATOR_BINARY_CUTOFF { 255u64 } else { 0 })
            .sum();
        sum as f32 / count as f32
    }
}

/// Preprocess a single region of a frame into a normalized glyph
pub fn preprocess_region(frame: &RgbImage, rect: &Rect, params: &PreprocessParams) -> Glyph {
    PreparedFrame::prepare(frame, params).glyph(rect, params)
}
