//! Feature budgets.
//!
//! A target keeps about one feature per 16 contour points. Segmentation noise makes contour
//! lengths jitter from frame to frame, so the budget follows a smoothed perimeter instead of the
//! raw one.

/// `perimeter >> FEATURE_SHIFT` features per target.
const FEATURE_SHIFT: u32 = 4;

/// Number of features a target with the given perimeter should have.
pub fn for_perimeter(perimeter: f32) -> usize {
    (perimeter.max(0.0) as usize) >> FEATURE_SHIFT
}

/// Smooths a series of perimeters, returning the damped value of the newest one.
///
/// The mean frame-to-frame change ratio of the whole series is the largest step the smoothed
/// value may take per sample. A sample within that ratio of the current smoothed value is adopted
/// as is; a sample further away moves the smoothed value towards it by one step.
///
/// Non-positive samples are ignored. Returns [`None`] if no sample is left.
pub fn smooth(samples: &[f32]) -> Option<f32> {
    let samples = samples
        .iter()
        .copied()
        .filter(|&s| s > 0.0)
        .collect::<Vec<_>>();
    let (&first, rest) = samples.split_first()?;
    if rest.is_empty() {
        return Some(first);
    }

    let ratio = samples
        .windows(2)
        .map(|w| change(w[0], w[1]))
        .sum::<f32>()
        / rest.len() as f32;

    let mut smoothed = first;
    for &sample in rest {
        if change(smoothed, sample) <= ratio {
            smoothed = sample;
        } else if smoothed < sample {
            smoothed *= ratio;
        } else {
            smoothed /= ratio;
        }
    }
    Some(smoothed)
}

/// Ratio between two positive values, always `>= 1`.
fn change(a: f32, b: f32) -> f32 {
    (a / b).max(b / a)
}
