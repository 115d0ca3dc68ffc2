//! Per-frame debug output of the tracker.
//!
//! A [`Reporter`] is handed the intermediate results of every frame once the pipeline is done
//! with it. It is the hook for visualization or recording; the tracker itself never draws.

use crate::{contour::Contours, grid::Mask, track::Target};

/// Intermediate results of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameReport<'a> {
    /// Index of the frame since the tracker was created.
    pub frame_index: u64,
    /// The skin confidence mask.
    pub mask: &'a Mask,
    pub contours: &'a Contours,
    /// The targets at the end of the frame.
    pub targets: &'a [Target],
}

impl FrameReport<'_> {
    /// Number of targets that were followed or recovered in this frame.
    pub fn succeeded(&self) -> usize {
        self.targets.iter().filter(|t| t.succeeded()).count()
    }
}

/// Receives the intermediate results of every frame.
pub trait Reporter {
    fn report(&mut self, report: &FrameReport<'_>);
}

/// Discards all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _: &FrameReport<'_>) {}
}

/// Logs a one-line summary per frame and one line per target at *debug* level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, report: &FrameReport<'_>) {
        log::debug!(
            "frame {}: {} skin pixels, {} contours, {}/{} targets followed",
            report.frame_index,
            report.mask.count_nonzero(),
            report.contours.len(),
            report.succeeded(),
            report.targets.len(),
        );
        for target in report.targets {
            log::debug!(
                "  {} {:?} roi={:?} features={}/{} pos=({:.2}, {:.2}) scale={:.2}",
                target.id(),
                target.kind(),
                target.roi(),
                target.features().len(),
                target.max_features(),
                target.position().x,
                target.position().y,
                target.scale(),
            );
        }
    }
}

impl<F: FnMut(&FrameReport<'_>)> Reporter for F {
    fn report(&mut self, report: &FrameReport<'_>) {
        self(report)
    }
}
