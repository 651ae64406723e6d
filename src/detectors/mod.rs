//! Structural feature detectors
//!
//! Each submodule derives one family of features from an OHLCV window:
//!
//! - **levels**: pivot extraction and support/resistance level merging
//! - **trend_lines**: swing points and ascending/descending line fitting
//! - **consolidation**: low-volatility trading ranges and their breakouts
//! - **fibonacci**: retracement/extension levels from window extremes
//! - **volume_profile**: price/volume histogram, point of control, value area
//!
//! All detectors are total functions: undersized input yields the documented
//! empty or `None` result, never an error.

pub mod consolidation;
pub mod fibonacci;
pub mod helpers;
pub mod levels;
pub mod trend_lines;
pub mod volume_profile;

pub use consolidation::*;
pub use fibonacci::*;
pub use helpers::*;
pub use levels::*;
pub use trend_lines::*;
pub use volume_profile::*;
