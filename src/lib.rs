//! Skin-color based hand and face tracking.
//!
//! The crate finds skin regions in video frames with Bayesian color histograms ([`skin`]), splits
//! them into connected regions ([`label`], [`contour`]), and follows hands, faces and other skin
//! regions across frames ([`track`]). Hands are recognized from the fingertips on a region's
//! outline ([`hand`]).
//!
//! # Overview
//!
//! ```no_run
//! use skintrack::{skin::SkinModels, track::Tracker};
//!
//! # fn frames() -> Vec<skintrack::grid::ColorImage> { Vec::new() }
//! let models = SkinModels::load("hue.hist", "crcb.hist", "rgb.hist")?;
//! let mut tracker = Tracker::new(models);
//! for frame in frames() {
//!     for target in tracker.track(&frame) {
//!         println!("{} {:?} at {:?}", target.id(), target.kind(), target.position());
//!     }
//! }
//! # Ok::<_, skintrack::Error>(())
//! ```
//!
//! # Logging
//!
//! All components log through the [`log`] crate. Binaries can call [`init_logger!`] to log to
//! *stderr*; the `RUST_LOG` environment variable overrides the default filter, eg.
//! `RUST_LOG=skintrack::track=trace` shows every association and merge decision.

pub mod color;
pub mod contour;
pub mod edge;
pub mod error;
pub mod geom;
pub mod grid;
pub mod hand;
pub mod label;
pub mod num;
pub mod rect;
pub mod report;
pub mod skin;
pub mod timer;
pub mod track;

#[cfg(test)]
mod test;

pub use error::{Error, Result};

use log::LevelFilter;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
