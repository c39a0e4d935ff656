use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};

use crate::error::{RedactError, Result};
use crate::io::ExportFormat;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest buffer we agree to hold (~256 megapixels).
const MAX_PIXELS: u64 = 256_000_000;

// ============================================================================
// REGION — integer rectangle in buffer space
// ============================================================================

/// Axis-aligned rectangle in buffer space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two buffer positions: floors both corners, then
    /// takes the min corner and the absolute extent.
    pub fn from_positions(a: BufferPos, b: BufferPos) -> Self {
        let (ax, ay) = a.floor();
        let (bx, by) = b.floor();
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: ax.abs_diff(bx),
            height: ay.abs_diff(by),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Number of RGBA bytes covered by this region.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty() && self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Trim the region to a `width × height` buffer. `None` when nothing of it
    /// remains inside.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clamped = Region {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        (!clamped.is_empty()).then_some(clamped)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.width, self.height)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,width,height but got '{}'", s));
        }
        let mut vals = [0u32; 4];
        for (slot, part) in vals.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a non-negative integer", part))?;
        }
        let region = Region::new(vals[0], vals[1], vals[2], vals[3]);
        if region.is_empty() {
            return Err(format!("region '{}' has zero width or height", s));
        }
        Ok(region)
    }
}

// ============================================================================
// PIXEL BUFFER — full-resolution RGBA raster
// ============================================================================

/// The full-resolution working raster. Dimensions are fixed at creation; only
/// pixel contents change, always in place.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Wrap raw row-major RGBA8 data.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RedactError::DecodeFailed(format!(
                "image has zero size ({}x{})",
                width, height
            )));
        }
        if width as u64 * height as u64 > MAX_PIXELS {
            return Err(RedactError::DecodeFailed(format!(
                "image {}x{} exceeds {} pixels",
                width, height, MAX_PIXELS
            )));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        let actual = rgba.len();
        if actual != expected {
            return Err(RedactError::ShapeMismatch { expected, actual });
        }
        let image = RgbaImage::from_raw(width, height, rgba)
            .ok_or(RedactError::ShapeMismatch { expected, actual })?;
        Ok(Self { image })
    }

    /// Buffer of one solid color. Zero dimensions are bumped to 1.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(color)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn memory_bytes(&self) -> usize {
        self.image.as_raw().len()
    }

    fn check_region(&self, region: Region) -> Result<()> {
        if region.fits_within(self.width(), self.height()) {
            Ok(())
        } else {
            Err(RedactError::RegionOutOfBounds {
                region,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Copy out a region as tightly packed RGBA (`w * h * 4` bytes).
    pub fn read_region(&self, region: Region) -> Result<Vec<u8>> {
        self.check_region(region)?;
        let stride = self.width() as usize * BYTES_PER_PIXEL;
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        let x_off = region.x as usize * BYTES_PER_PIXEL;
        let raw = self.image.as_raw();

        let mut out = Vec::with_capacity(region.byte_len());
        for y in region.y as usize..region.bottom() as usize {
            let start = y * stride + x_off;
            out.extend_from_slice(&raw[start..start + row_len]);
        }
        Ok(out)
    }

    /// Overwrite a region with tightly packed RGBA. `data` must be exactly
    /// `region.byte_len()` bytes.
    pub fn write_region(&mut self, region: Region, data: &[u8]) -> Result<()> {
        self.check_region(region)?;
        if data.len() != region.byte_len() {
            return Err(RedactError::ShapeMismatch {
                expected: region.byte_len(),
                actual: data.len(),
            });
        }
        let stride = self.width() as usize * BYTES_PER_PIXEL;
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        let x_off = region.x as usize * BYTES_PER_PIXEL;
        let raw: &mut [u8] = &mut self.image;

        for (row, src) in data.chunks_exact(row_len).enumerate() {
            let start = (region.y as usize + row) * stride + x_off;
            raw[start..start + row_len].copy_from_slice(src);
        }
        Ok(())
    }

    /// Lossless snapshot of the whole buffer.
    pub fn encode(&self) -> Result<Snapshot> {
        let (width, height) = self.dimensions();
        let mut data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut data, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Fast);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(self.image.as_raw())?;
            writer.finish()?;
        }
        Ok(Snapshot {
            width,
            height,
            data,
        })
    }

    /// Rebuild a buffer from a snapshot.
    pub fn decode(snapshot: &Snapshot) -> Result<Self> {
        let decoder = png::Decoder::new(snapshot.as_bytes());
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;

        if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
            return Err(RedactError::DecodeFailed(format!(
                "snapshot is {:?}/{:?}, expected RGBA8",
                info.color_type, info.bit_depth
            )));
        }
        buf.truncate(info.buffer_size());
        Self::from_rgba(info.width, info.height, buf)
    }

    /// Replace every pixel with the snapshot's contents. Dimensions must match.
    pub fn restore_from(&mut self, snapshot: &Snapshot) -> Result<()> {
        let restored = Self::decode(snapshot)?;
        if restored.dimensions() != self.dimensions() {
            return Err(RedactError::ShapeMismatch {
                expected: self.memory_bytes(),
                actual: restored.memory_bytes(),
            });
        }
        self.image = restored.image;
        Ok(())
    }

    /// Encode the buffer for download.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        crate::io::encode_image(&self.image, format)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// ============================================================================
// SNAPSHOT — opaque encoded copy of a buffer
// ============================================================================

/// Full, content-independent copy of a buffer (PNG-encoded).
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Encoded size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot({}x{}, {} bytes)",
            self.width,
            self.height,
            self.data.len()
        )
    }
}

// ============================================================================
// COORDINATE MAPPING — display space <-> buffer space
// ============================================================================

/// Pointer position relative to the top-left of the displayed surface.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen size of the displayed surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Unfloored position in buffer space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BufferPos {
    pub x: f32,
    pub y: f32,
}

impl BufferPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pixel-aligned integer position. Negative values saturate at 0.
    pub fn floor(&self) -> (u32, u32) {
        (self.x.floor().max(0.0) as u32, self.y.floor().max(0.0) as u32)
    }
}

/// Rectangle in display space, used for the selection overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// `displayed / buffer` ratio pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayScale {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl DisplayScale {
    pub fn between(displayed: DisplaySize, buffer_width: u32, buffer_height: u32) -> Option<Self> {
        if !displayed.is_usable() || buffer_width == 0 || buffer_height == 0 {
            return None;
        }
        Some(Self {
            scale_x: displayed.width / buffer_width as f32,
            scale_y: displayed.height / buffer_height as f32,
        })
    }
}

/// Converts between display space and buffer space. Holds only the buffer
/// size; the displayed size is passed on every call since layout can change
/// it at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinateMapper {
    buffer_width: u32,
    buffer_height: u32,
}

impl CoordinateMapper {
    pub fn new(buffer_width: u32, buffer_height: u32) -> Self {
        Self {
            buffer_width,
            buffer_height,
        }
    }

    pub fn for_buffer(buffer: &PixelBuffer) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    pub fn scale(&self, displayed: DisplaySize) -> Option<DisplayScale> {
        DisplayScale::between(displayed, self.buffer_width, self.buffer_height)
    }

    /// `buffer = display * (buffer_dim / displayed_dim)`, unfloored.
    pub fn display_to_buffer(&self, point: DisplayPoint, displayed: DisplaySize) -> Option<BufferPos> {
        let scale = self.scale(displayed)?;
        Some(BufferPos::new(point.x / scale.scale_x, point.y / scale.scale_y))
    }

    pub fn buffer_to_display(&self, pos: BufferPos, displayed: DisplaySize) -> Option<DisplayPoint> {
        let scale = self.scale(displayed)?;
        Some(DisplayPoint::new(pos.x * scale.scale_x, pos.y * scale.scale_y))
    }

    pub fn region_to_display(&self, region: Region, displayed: DisplaySize) -> Option<DisplayRect> {
        let scale = self.scale(displayed)?;
        Some(DisplayRect {
            x: region.x as f32 * scale.scale_x,
            y: region.y as f32 * scale.scale_y,
            width: region.width as f32 * scale.scale_x,
            height: region.height as f32 * scale.scale_y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, 255 - x as u8]);
            }
        }
        PixelBuffer::from_rgba(width, height, rgba).unwrap()
    }

    #[test]
    fn read_region_returns_exact_byte_count() {
        let buf = gradient(8, 6);
        let data = buf.read_region(Region::new(2, 1, 3, 4)).unwrap();
        assert_eq!(data.len(), 3 * 4 * 4);
        assert_eq!(&data[0..4], &buf.pixel(2, 1));
        assert_eq!(&data[data.len() - 4..], &buf.pixel(4, 4));
    }

    #[test]
    fn write_region_rejects_wrong_length() {
        let mut buf = gradient(4, 4);
        let err = buf.write_region(Region::new(0, 0, 2, 2), &[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            RedactError::ShapeMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn write_region_only_touches_region() {
        let mut buf = gradient(6, 6);
        let before = buf.clone();
        let region = Region::new(1, 2, 3, 2);
        buf.write_region(region, &vec![7u8; region.byte_len()]).unwrap();
        for y in 0..6 {
            for x in 0..6 {
                if region.contains(x, y) {
                    assert_eq!(buf.pixel(x, y), [7, 7, 7, 7]);
                } else {
                    assert_eq!(buf.pixel(x, y), before.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_region_is_rejected() {
        let buf = gradient(4, 4);
        assert!(matches!(
            buf.read_region(Region::new(3, 0, 2, 1)),
            Err(RedactError::RegionOutOfBounds { .. })
        ));
        assert!(buf.read_region(Region::new(0, 0, 0, 1)).is_err());
    }

    #[test]
    fn snapshot_round_trip_is_lossless() {
        let buf = gradient(17, 9);
        let snap = buf.encode().unwrap();
        assert_eq!((snap.width(), snap.height()), (17, 9));
        assert_eq!(PixelBuffer::decode(&snap).unwrap(), buf);
    }

    #[test]
    fn restore_from_rejects_other_dimensions() {
        let mut buf = gradient(4, 4);
        let other = gradient(5, 4).encode().unwrap();
        assert!(buf.restore_from(&other).is_err());
        assert_eq!(buf, gradient(4, 4));
    }

    #[test]
    fn zero_sized_buffer_is_rejected() {
        assert!(PixelBuffer::from_rgba(0, 3, Vec::new()).is_err());
    }

    #[test]
    fn region_clamp_trims_to_buffer() {
        assert_eq!(
            Region::new(8, 8, 10, 10).clamp_to(10, 12),
            Some(Region::new(8, 8, 2, 4))
        );
        assert_eq!(Region::new(10, 0, 5, 5).clamp_to(10, 10), None);
    }

    #[test]
    fn region_from_positions_normalises_corners() {
        let r = Region::from_positions(BufferPos::new(30.7, 5.2), BufferPos::new(10.1, 25.9));
        assert_eq!(r, Region::new(10, 5, 20, 20));
    }

    #[test]
    fn region_parses_from_cli_form() {
        assert_eq!("1, 2,3,4".parse::<Region>().unwrap(), Region::new(1, 2, 3, 4));
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("1,2,0,4".parse::<Region>().is_err());
    }

    #[test]
    fn mapper_scales_by_buffer_over_displayed() {
        let mapper = CoordinateMapper::new(1000, 500);
        let displayed = DisplaySize::new(250.0, 125.0);
        let pos = mapper
            .display_to_buffer(DisplayPoint::new(10.0, 20.0), displayed)
            .unwrap();
        assert_eq!(pos, BufferPos::new(40.0, 80.0));
    }

    #[test]
    fn mapper_round_trip_within_one_unit() {
        let mapper = CoordinateMapper::new(1920, 1080);
        let displayed = DisplaySize::new(777.0, 437.0);
        for &(x, y) in &[(0.0, 0.0), (13.3, 400.9), (776.9, 436.9), (333.0, 1.5)] {
            let (bx, by) = mapper
                .display_to_buffer(DisplayPoint::new(x, y), displayed)
                .unwrap()
                .floor();
            let back = mapper
                .buffer_to_display(BufferPos::new(bx as f32, by as f32), displayed)
                .unwrap();
            let scale = mapper.scale(displayed).unwrap();
            assert!((back.x - x).abs() <= scale.scale_x + 1e-3, "x {} -> {}", x, back.x);
            assert!((back.y - y).abs() <= scale.scale_y + 1e-3, "y {} -> {}", y, back.y);
        }
    }

    #[test]
    fn mapper_rejects_degenerate_display() {
        let mapper = CoordinateMapper::new(10, 10);
        assert!(mapper
            .display_to_buffer(DisplayPoint::new(1.0, 1.0), DisplaySize::new(0.0, 10.0))
            .is_none());
    }
}
