//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the normalizer
//! needs: verify, decode, resize, and PNG encode. All of them work on
//! in-memory buffers; reading uploads from disk is the caller's business.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in a recording mock.

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("image file is truncated")]
    Truncated,
    #[error("image file is corrupt: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Decode(String),
    #[error("resize failed: {0}")]
    Resize(String),
    #[error("PNG encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        Self::new(image.width(), image.height())
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the structural check learned about a buffer without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub format: ImageFormat,
    pub dimensions: Dimensions,
}

/// Trait for image processing backends.
///
/// `verify` and `decode` must each open the buffer independently: a reader
/// used for verification is never reused for decoding.
pub trait ImageBackend: Sync {
    /// Detect the format from the content signature and parse the header.
    fn verify(&self, bytes: &[u8]) -> Result<Verified, BackendError>;

    /// Fully decode the buffer to pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resample to exactly `target`.
    fn resize(&self, image: &DynamicImage, target: Dimensions)
    -> Result<DynamicImage, BackendError>;

    /// Encode as PNG for preview and download.
    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError>;
}
