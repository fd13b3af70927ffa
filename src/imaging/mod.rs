//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Verify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::ImageReader::decode` |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Encode** | PNG encoder |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Verified};
pub use calculations::{ScalePlan, compute_target_size, plan_target_size};
pub use rust_backend::{RustBackend, supported_input_extensions};
