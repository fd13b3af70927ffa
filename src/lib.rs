//! # docfit
//!
//! Normalizes uploaded document images (passport-style photos, signatures,
//! company logos) to the pixel bounds an application form demands. Each
//! category has a minimum and a maximum bounding box; an image is scaled
//! uniformly, never cropped or stretched, until it fits.
//!
//! # Pipeline
//!
//! ```text
//! bytes + category ─► verify ─► decode ─► bounds ─► target size ─► resize? ─► result
//! ```
//!
//! The target size comes from two ordered phases: scale *up* until both axes
//! reach the minimum, then scale *down* until neither exceeds the maximum.
//! Pixel sizes are truncated, never rounded. See
//! [`imaging::plan_target_size`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`bounds`] | The closed category set and its validated bounds table |
//! | [`imaging`] | Pure size calculations and the `image`-crate backend |
//! | [`normalize`] | The [`Normalizer`](normalize::Normalizer): stage sequencing, error classification, reports |
//! | [`batch`] | Reads files, runs them in parallel, writes `resized_*.png` |
//! | [`config`] | `docfit.toml` loading, merging and validation |
//! | [`logging`] | Builds the injected `tracing` dispatch (console + optional file) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Injected Logger
//!
//! The library never installs a global subscriber. [`logging::build`]
//! returns a `Dispatch` which the caller passes to the normalizer; the
//! normalizer enters it for the duration of each call. Tests hand in a
//! capturing dispatch and assert on exactly what one call logged.
//!
//! ## Results, Not Panics
//!
//! Every failure is a [`NormalizeError`](normalize::NormalizeError) value
//! with an [`ErrorKind`](normalize::ErrorKind). A call always ends in exactly
//! one `Result`; nothing is retried and nothing is swallowed.
//!
//! ## PNG Output
//!
//! Whatever the input format, the normalized image is written as PNG so no
//! further quality is lost after resampling.

pub mod batch;
pub mod bounds;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod normalize;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
