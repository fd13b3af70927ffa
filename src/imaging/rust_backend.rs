//! Pure Rust image processing backend on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Verify | `ImageReader::with_guessed_format` + `into_dimensions`, plus a JPEG marker walk |
//! | Decode (JPEG, PNG, TIFF, WebP) | `ImageReader::decode` under `image::Limits` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → PNG | `DynamicImage::write_to` with `ImageFormat::Png` |

use super::backend::{BackendError, Dimensions, ImageBackend, Verified};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
///
/// Only used to pick files out of directories; decoding itself trusts the
/// content signature, not the extension.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Default decoder allocation limit in bytes.
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 512 * 1024 * 1024;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone)]
pub struct RustBackend {
    max_decode_bytes: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_max_decode_bytes(DEFAULT_MAX_DECODE_BYTES)
    }

    /// Refuse to decode images whose pixel buffer would exceed `bytes`.
    pub fn with_max_decode_bytes(bytes: u64) -> Self {
        Self {
            max_decode_bytes: bytes,
        }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_decode_bytes);
        limits
    }

    /// Open a fresh reader over `bytes` with the format guessed from content.
    fn reader<'a>(&self, bytes: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>, BackendError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(BackendError::UnknownFormat);
        }
        reader.limits(self.limits());
        Ok(reader)
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// PNG stores 8/16-bit gray and RGB(A); float images go through 16-bit RGBA.
fn png_compatible(image: &DynamicImage) -> Option<DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => None,
        other => Some(DynamicImage::ImageRgba16(other.to_rgba16())),
    }
}

// ---------------------------------------------------------------------------
// JPEG structure check
// ---------------------------------------------------------------------------

const JPEG_SOI: u8 = 0xD8;
const JPEG_EOI: u8 = 0xD9;
const JPEG_SOS: u8 = 0xDA;

/// Walk a JPEG's marker segments from SOI to EOI.
///
/// The decoder pads missing scan data, so completeness is checked here.
/// Segment lengths are followed exactly, which skips APP1 thumbnails whole.
/// Scan data may only contain stuffed `0xFF00`, restart markers and fill
/// bytes. Bytes after EOI are ignored.
fn check_jpeg_structure(data: &[u8]) -> Result<(), BackendError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != JPEG_SOI {
        return Err(BackendError::Corrupt("missing start-of-image marker".into()));
    }
    let mut pos = 2;
    loop {
        let start = pos;
        let marker = read_marker(data, &mut pos)?;
        match marker {
            JPEG_EOI => return Ok(()),
            JPEG_SOI => {
                return Err(BackendError::Corrupt(format!(
                    "second start-of-image marker at offset {start}"
                )));
            }
            0x01 | 0xD0..=0xD7 => {}
            0xC0..=0xFE => {
                pos = skip_segment(data, pos)?;
                if marker == JPEG_SOS {
                    pos = skip_scan_data(data, pos)?;
                }
            }
            other => {
                return Err(BackendError::Corrupt(format!(
                    "invalid marker 0x{other:02X} at offset {start}"
                )));
            }
        }
    }
}

/// Read the marker at `pos`, skipping fill bytes, and advance past it.
fn read_marker(data: &[u8], pos: &mut usize) -> Result<u8, BackendError> {
    match data.get(*pos) {
        Some(0xFF) => {}
        Some(byte) => {
            return Err(BackendError::Corrupt(format!(
                "expected marker at offset {}, found 0x{byte:02X}",
                *pos
            )));
        }
        None => return Err(BackendError::Truncated),
    }
    while data.get(*pos) == Some(&0xFF) {
        *pos += 1;
    }
    let marker = *data.get(*pos).ok_or(BackendError::Truncated)?;
    *pos += 1;
    Ok(marker)
}

/// Skip a length-prefixed segment whose length field starts at `pos`.
fn skip_segment(data: &[u8], pos: usize) -> Result<usize, BackendError> {
    let len_bytes = data.get(pos..pos + 2).ok_or(BackendError::Truncated)?;
    let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    if len < 2 {
        return Err(BackendError::Corrupt(format!(
            "segment length {len} at offset {pos}"
        )));
    }
    let end = pos + len;
    if end > data.len() {
        return Err(BackendError::Truncated);
    }
    Ok(end)
}

/// Skip entropy-coded data; returns the offset of the next real marker.
fn skip_scan_data(data: &[u8], mut pos: usize) -> Result<usize, BackendError> {
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            0x00 | 0xD0..=0xD7 => pos += 2,
            0xFF => pos += 1,
            _ => return Ok(pos),
        }
    }
    Err(BackendError::Truncated)
}

impl ImageBackend for RustBackend {
    fn verify(&self, bytes: &[u8]) -> Result<Verified, BackendError> {
        let reader = self.reader(bytes)?;
        let format = reader.format().ok_or(BackendError::UnknownFormat)?;
        if format == ImageFormat::Jpeg {
            check_jpeg_structure(bytes)?;
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Verified {
            format,
            dimensions: Dimensions::new(width, height),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        self.reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        target: Dimensions,
    ) -> Result<DynamicImage, BackendError> {
        if target.is_empty() {
            return Err(BackendError::Resize(format!(
                "target size {target} has a zero dimension"
            )));
        }
        Ok(image.resize_exact(target.width, target.height, FilterType::Lanczos3))
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
        let converted = png_compatible(image);
        let source = converted.as_ref().unwrap_or(image);
        let mut buf = Cursor::new(Vec::new());
        source
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
