//! Dimension normalization for uploaded document images.
//!
//! [`Normalizer::process`] takes the raw bytes of one upload plus the declared
//! category label and runs a fixed sequence of stages:
//!
//! ```text
//! non-empty → verify → decode → resolve bounds → plan size → resize? → result
//! ```
//!
//! The first failing stage ends the call; nothing after it runs. Every call
//! produces exactly one [`NormalizationResult`].
//!
//! ## Logging
//!
//! The normalizer owns a [`tracing::Dispatch`] and installs it only while one
//! of its methods runs. Nothing is registered globally, so two normalizers
//! with different sinks can run side by side and tests can capture the output
//! of a single call.
//!
//! ## Minimum after downscale
//!
//! When a category's minimum and maximum boxes have very different aspect
//! ratios, the downscale phase can push one axis back below its minimum (a
//! 50x50 signature ends at 287x287, under the 354 px minimum width). The size
//! is kept, [`Normalized::meets_minimum`] is set to `false` and a warning is
//! logged; callers needing a hard minimum must check that flag.

use crate::bounds::{BoundsSpec, BoundsTable, Category};
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, RustBackend, ScalePlan, plan_target_size,
};
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{Dispatch, debug, error, info, info_span, warn};

/// Classification of a failed normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyInput,
    InvalidImage,
    UnknownCategory,
    ResizeFailed,
    /// The upload could not be read from disk.
    ReadFailed,
    /// The normalized PNG could not be encoded or written.
    WriteFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{filename} is empty")]
    EmptyInput { filename: String },
    #[error("{filename} is not a valid image: {reason}")]
    InvalidImage { filename: String, reason: String },
    #[error("unknown category '{label}' (expected portrait-photo, signature or company-logo)")]
    UnknownCategory { label: String },
    #[error("could not resize {filename} to {target}: {reason}")]
    ResizeFailed {
        filename: String,
        target: Dimensions,
        reason: String,
    },
}

impl NormalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NormalizeError::EmptyInput { .. } => ErrorKind::EmptyInput,
            NormalizeError::InvalidImage { .. } => ErrorKind::InvalidImage,
            NormalizeError::UnknownCategory { .. } => ErrorKind::UnknownCategory,
            NormalizeError::ResizeFailed { .. } => ErrorKind::ResizeFailed,
        }
    }
}

/// A successfully normalized upload.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub filename: String,
    pub category: Category,
    /// The resized bitmap, or the decoded original when no resize was needed.
    pub image: DynamicImage,
    pub original: Dimensions,
    pub resized: Dimensions,
    pub bounds: BoundsSpec,
    /// Whether the image went through the resampler.
    pub resampled: bool,
    /// Whether `resized` reaches the category minimum on both axes.
    pub meets_minimum: bool,
}

pub type NormalizationResult = Result<Normalized, NormalizeError>;

/// Decodes, checks and resizes uploads against a [`BoundsTable`].
///
/// Holds only read-only state, so one instance can serve any number of
/// concurrent calls.
pub struct Normalizer<B = RustBackend> {
    backend: B,
    bounds: BoundsTable,
    dispatch: Dispatch,
}

impl Normalizer<RustBackend> {
    pub fn new(bounds: BoundsTable, dispatch: Dispatch) -> Self {
        Self::with_backend(RustBackend::new(), bounds, dispatch)
    }
}

impl<B: ImageBackend> Normalizer<B> {
    pub fn with_backend(backend: B, bounds: BoundsTable, dispatch: Dispatch) -> Self {
        Self {
            backend,
            bounds,
            dispatch,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn bounds(&self) -> &BoundsTable {
        &self.bounds
    }

    /// The log sink this normalizer writes to, for callers that report
    /// failures around it.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    fn logged<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Check the buffer holds a decodable raster image and decode it.
    ///
    /// Verification and decoding each open their own reader over `bytes`.
    pub fn decode_and_validate(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DynamicImage, NormalizeError> {
        self.logged(|| self.decode_stage(filename, bytes))
    }

    /// Look up the bounds for a category label.
    pub fn resolve_bounds(&self, label: &str) -> Result<(Category, BoundsSpec), NormalizeError> {
        self.logged(|| self.bounds_stage(label))
    }

    /// Resample `image` to exactly `target`.
    pub fn resize(
        &self,
        filename: &str,
        image: &DynamicImage,
        target: Dimensions,
    ) -> Result<DynamicImage, NormalizeError> {
        self.logged(|| self.resize_stage(filename, image, target))
    }

    /// Run the whole pipeline for one upload.
    pub fn process(&self, filename: &str, bytes: &[u8], label: &str) -> NormalizationResult {
        self.logged(|| {
            let span = info_span!("normalize", file = filename, category = label);
            let _enter = span.enter();

            debug!(bytes = bytes.len(), "start processing upload");
            let result = self.run_stages(filename, bytes, label);
            match &result {
                Ok(done) => info!(
                    original = %done.original,
                    resized = %done.resized,
                    "upload processed"
                ),
                Err(e) => error!(kind = ?e.kind(), "processing failed: {e}"),
            }
            result
        })
    }

    /// Encode a normalized image as PNG for preview and download.
    pub fn encode_png(&self, normalized: &Normalized) -> Result<Vec<u8>, BackendError> {
        self.logged(|| {
            let png = self.backend.encode_png(&normalized.image)?;
            debug!(file = %normalized.filename, bytes = png.len(), "encoded PNG");
            Ok(png)
        })
    }

    fn run_stages(&self, filename: &str, bytes: &[u8], label: &str) -> NormalizationResult {
        let image = self.decode_stage(filename, bytes)?;
        let (category, bounds) = self.bounds_stage(label)?;

        let original = Dimensions::of(&image);
        debug!(%original, min = %bounds.min, max = %bounds.max, "original size");

        let plan = plan_target_size(original, &bounds);
        log_plan(&plan);
        let target = plan.target();

        let (image, resampled) = if plan.needs_resize() {
            (self.resize_stage(filename, &image, target)?, true)
        } else {
            (image, false)
        };

        let meets_minimum = bounds.meets_minimum(target);
        if !meets_minimum {
            warn!(
                resized = %target,
                min = %bounds.min,
                "normalized size is below the category minimum"
            );
        }

        Ok(Normalized {
            filename: filename.to_string(),
            category,
            image,
            original,
            resized: target,
            bounds,
            resampled,
            meets_minimum,
        })
    }

    fn decode_stage(&self, filename: &str, bytes: &[u8]) -> Result<DynamicImage, NormalizeError> {
        if bytes.is_empty() {
            error!(file = filename, "empty upload");
            return Err(NormalizeError::EmptyInput {
                filename: filename.to_string(),
            });
        }

        let invalid = |reason: String| {
            error!(file = filename, %reason, "failed to load image");
            NormalizeError::InvalidImage {
                filename: filename.to_string(),
                reason,
            }
        };

        let verified = self
            .backend
            .verify(bytes)
            .map_err(|e| invalid(e.to_string()))?;
        if verified.dimensions.is_empty() {
            return Err(invalid(format!(
                "image has a zero dimension ({})",
                verified.dimensions
            )));
        }
        debug!(format = ?verified.format, size = %verified.dimensions, "verified");

        let image = self
            .backend
            .decode(bytes)
            .map_err(|e| invalid(e.to_string()))?;
        if Dimensions::of(&image).is_empty() {
            return Err(invalid("decoded image has a zero dimension".into()));
        }
        debug!(file = filename, "image decoded");
        Ok(image)
    }

    fn bounds_stage(&self, label: &str) -> Result<(Category, BoundsSpec), NormalizeError> {
        match label.parse::<Category>() {
            Ok(category) => Ok((category, self.bounds.get(category))),
            Err(_) => {
                error!(label, "unknown category");
                Err(NormalizeError::UnknownCategory {
                    label: label.to_string(),
                })
            }
        }
    }

    fn resize_stage(
        &self,
        filename: &str,
        image: &DynamicImage,
        target: Dimensions,
    ) -> Result<DynamicImage, NormalizeError> {
        let original = Dimensions::of(image);
        let failed = |reason: String| NormalizeError::ResizeFailed {
            filename: filename.to_string(),
            target,
            reason,
        };

        if target.is_empty() {
            return Err(failed("target has a zero dimension".into()));
        }
        let resized = self
            .backend
            .resize(image, target)
            .map_err(|e| failed(e.to_string()))?;
        info!(from = %original, to = %target, "resized");
        Ok(resized)
    }
}

fn log_plan(plan: &ScalePlan) {
    if let Some(up) = plan.after_upscale {
        debug!(size = %up, "upscaled to reach minimum");
    }
    if let Some(down) = plan.after_downscale {
        debug!(size = %down, "downscaled to fit maximum");
    }
}

/// Flat, serializable view of a [`NormalizationResult`] for display and JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resized_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meets_minimum: Option<bool>,
    /// Where the PNG was written, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Report {
    pub fn from_result(filename: &str, result: &NormalizationResult) -> Self {
        match result {
            Ok(done) => Self {
                filename: filename.to_string(),
                success: true,
                category: Some(done.category),
                error: None,
                error_kind: None,
                orig_size: Some(done.original.as_tuple()),
                resized_size: Some(done.resized.as_tuple()),
                min_size: Some(done.bounds.min.as_tuple()),
                max_size: Some(done.bounds.max.as_tuple()),
                meets_minimum: Some(done.meets_minimum),
                output: None,
            },
            Err(e) => Self::failure(filename, Some(e.kind()), e.to_string()),
        }
    }

    /// A failed report for errors raised outside the normalizer (I/O, encoding).
    pub fn failure(filename: &str, kind: Option<ErrorKind>, message: String) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            category: None,
            error: Some(message),
            error_kind: kind,
            orig_size: None,
            resized_size: None,
            min_size: None,
            max_size: None,
            meets_minimum: None,
            output: None,
        }
    }
}
