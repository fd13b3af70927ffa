//! Shared test utilities for the docfit test suite.
//!
//! Provides in-memory image fixtures and a log sink that captures what a
//! single [`Normalizer`](crate::normalize::Normalizer) emits.
//!
//! # Usage
//!
//! ```rust
//! use crate::bounds::BoundsTable;
//! use crate::normalize::Normalizer;
//! use crate::test_helpers::*;
//!
//! let logs = CapturedLogs::default();
//! let normalizer = Normalizer::new(BoundsTable::standard().unwrap(), logs.dispatch());
//!
//! let result = normalizer.process("photo.png", &png_bytes(100, 50), "signature");
//! assert!(logs.contents().contains("photo.png"));
//! ```

use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use tracing::Dispatch;

// =========================================================================
// Image fixtures
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode a gradient of the given size as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Encode a gradient of the given size as baseline JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a PNG fixture to `path`.
pub fn write_png(path: &std::path::Path, width: u32, height: u32) {
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

// =========================================================================
// Log capture
// =========================================================================

/// In-memory log sink. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// A dispatch that writes every event, at every level, into this buffer.
    pub fn dispatch(&self) -> Dispatch {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        Dispatch::new(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
