// ============================================================================
// REDACTION TRANSFORMS — pure functions over a rectangular RGBA region
// ============================================================================
//
// Both transforms take tightly packed region bytes (`w * h * 4`) and return a
// new buffer of the same shape. They never see display coordinates.
//
//   - Pixelate: center-sampled block mosaic (rayon over cell rows)
//   - Color bar: solid opaque fill
// ============================================================================

use image::Rgb;
use rayon::prelude::*;

use crate::canvas::BYTES_PER_PIXEL;

pub const DEFAULT_BLOCK_SIZE: u32 = 10;
pub const MIN_BLOCK_SIZE: u32 = 2;

/// Default color bar color (black).
pub const DEFAULT_FILL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// A redaction applied to one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionTransform {
    Pixelate { block_size: u32 },
    ColorFill { color: Rgb<u8> },
}

impl RegionTransform {
    /// Run the transform over `src` (`width * height * 4` bytes).
    pub fn apply(&self, src: &[u8], width: u32, height: u32) -> Vec<u8> {
        match *self {
            RegionTransform::Pixelate { block_size } => pixelate_region(src, width, height, block_size),
            RegionTransform::ColorFill { color } => fill_region(src, width, height, color),
        }
    }

    /// History label for an application of this transform.
    pub fn label(&self) -> String {
        match *self {
            RegionTransform::Pixelate { block_size } => {
                format!("Pixelate (Size {})", block_size.max(MIN_BLOCK_SIZE))
            }
            RegionTransform::ColorFill { color } => format!("Color Bar ({})", format_hex_color(color)),
        }
    }
}

// --- Pixelate ---

/// Mosaic the region in `block_size` cells anchored at its top-left corner.
/// Each cell takes the color (alpha included) of the pixel at
/// `origin + block_size / 2`, clamped to the region. Edge cells are clipped.
pub fn pixelate_region(src: &[u8], width: u32, height: u32, block_size: u32) -> Vec<u8> {
    let bs = block_size.max(MIN_BLOCK_SIZE) as usize;
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(src.len(), w * h * BYTES_PER_PIXEL);
    if w == 0 || h == 0 {
        return src.to_vec();
    }

    let stride = w * BYTES_PER_PIXEL;
    let mut dst = vec![0u8; src.len()];

    // One band per row of cells; bands are disjoint so they fill in parallel.
    dst.par_chunks_mut(stride * bs)
        .enumerate()
        .for_each(|(band, band_out)| {
            let cell_y = band * bs;
            let sy = (cell_y + bs / 2).min(h - 1);
            let sample_row = &src[sy * stride..(sy + 1) * stride];

            for cell_x in (0..w).step_by(bs) {
                let sx = (cell_x + bs / 2).min(w - 1);
                let px = &sample_row[sx * BYTES_PER_PIXEL..(sx + 1) * BYTES_PER_PIXEL];
                let cell_end = (cell_x + bs).min(w);

                for row_out in band_out.chunks_exact_mut(stride) {
                    for out in row_out[cell_x * BYTES_PER_PIXEL..cell_end * BYTES_PER_PIXEL]
                        .chunks_exact_mut(BYTES_PER_PIXEL)
                    {
                        out.copy_from_slice(px);
                    }
                }
            }
        });

    dst
}

// --- Color bar ---

/// Opaque solid fill; the source content is ignored.
pub fn fill_region(src: &[u8], width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let len = width as usize * height as usize * BYTES_PER_PIXEL;
    debug_assert_eq!(src.len(), len);
    let px = [color[0], color[1], color[2], 255];
    px.iter().copied().cycle().take(len).collect()
}

// ============================================================================
// PARAMETER PARSING
// ============================================================================

/// Block size from free text. Empty, non-numeric or zero input falls back to
/// the default; the minimum is enforced when the transform runs.
pub fn parse_block_size(input: &str) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(0) | Err(_) => DEFAULT_BLOCK_SIZE,
        Ok(n) => n,
    }
}

/// Parse `#rrggbb` (leading `#` optional) or the short `#rgb` form.
pub fn parse_hex_color(input: &str) -> Option<Rgb<u8>> {
    let hex = input.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some(Rgb(out))
        }
        _ => None,
    }
}

/// Lowercase `#rrggbb`.
pub fn format_hex_color(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x2545_f491u32;
        (0..width * height * 4)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    fn px(buf: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn every_pixel_takes_its_cell_center() {
        let (w, h, bs) = (23, 17, 5);
        let src = noise(w, h);
        let out = pixelate_region(&src, w, h, bs);
        for y in 0..h {
            for x in 0..w {
                let sx = ((x / bs) * bs + bs / 2).min(w - 1);
                let sy = ((y / bs) * bs + bs / 2).min(h - 1);
                assert_eq!(px(&out, w, x, y), px(&src, w, sx, sy), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn pixelate_is_idempotent_on_same_grid() {
        let (w, h) = (40, 30);
        let once = pixelate_region(&noise(w, h), w, h, 10);
        let twice = pixelate_region(&once, w, h, 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn block_size_below_two_is_clamped() {
        let (w, h) = (9, 7);
        let src = noise(w, h);
        assert_eq!(pixelate_region(&src, w, h, 0), pixelate_region(&src, w, h, 2));
        assert_eq!(pixelate_region(&src, w, h, 1), pixelate_region(&src, w, h, 2));
    }

    #[test]
    fn block_larger_than_region_samples_clamped_center() {
        let (w, h) = (3, 2);
        let src = noise(w, h);
        let out = pixelate_region(&src, w, h, 50);
        let expected = px(&src, w, 2, 1);
        for y in 0..h {
            for x in 0..w {
                assert_eq!(px(&out, w, x, y), expected);
            }
        }
    }

    #[test]
    fn fill_is_opaque_and_ignores_source() {
        let out = fill_region(&noise(4, 3), 4, 3, Rgb([255, 0, 0]));
        assert_eq!(out.len(), 48);
        assert!(out.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn labels_match_history_wording() {
        assert_eq!(
            RegionTransform::Pixelate { block_size: 12 }.label(),
            "Pixelate (Size 12)"
        );
        assert_eq!(
            RegionTransform::ColorFill { color: Rgb([255, 0, 16]) }.label(),
            "Color Bar (#ff0010)"
        );
    }

    #[test]
    fn block_size_parsing_falls_back_to_default() {
        assert_eq!(parse_block_size("16"), 16);
        assert_eq!(parse_block_size(" 3 "), 3);
        assert_eq!(parse_block_size(""), DEFAULT_BLOCK_SIZE);
        assert_eq!(parse_block_size("abc"), DEFAULT_BLOCK_SIZE);
        assert_eq!(parse_block_size("0"), DEFAULT_BLOCK_SIZE);
        assert_eq!(parse_block_size("-4"), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#FF0000"), Some(Rgb([255, 0, 0])));
        assert_eq!(parse_hex_color("00ff7f"), Some(Rgb([0, 255, 127])));
        assert_eq!(parse_hex_color("#fff"), Some(Rgb([255, 255, 255])));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(format_hex_color(Rgb([1, 171, 255])), "#01abff");
    }
}
