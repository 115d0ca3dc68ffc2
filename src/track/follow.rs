//! Advancing target features with optical flow.

use crate::{geom, grid::GrayImage, rect::Rect};

use super::{
    feature::{self, Feature},
    flow::OpticalFlow,
    target::Target,
    Frame,
};

/// Follows the features of every target that was associated with a contour this frame.
///
/// All points go through a single optical flow call. Targets that lose all their features are
/// marked as not succeeded and left for evaluation.
pub(super) fn follow_all(
    targets: &mut [Target],
    frame: &Frame<'_>,
    prev: &GrayImage,
    flow: &dyn OpticalFlow,
) {
    let points = targets
        .iter()
        .filter(|t| is_followed(t))
        .flat_map(|t| t.last_features().iter().map(|f| f.position))
        .collect::<Vec<_>>();
    let mut tracked = flow.track(prev, frame.gray, &points).into_iter();

    for target in targets.iter_mut().filter(|t| is_followed(t)) {
        let last = target.last_features().to_vec();
        let moved = tracked.by_ref().take(last.len()).collect::<Vec<_>>();
        let pairs = last
            .into_iter()
            .zip(moved)
            .filter(|(_, t)| t.is_tracked())
            .map(|(last, t)| (last, t.position))
            .collect();
        follow(target, frame, pairs);
    }
}

fn is_followed(target: &Target) -> bool {
    target.contour.is_some() && !target.last_features().is_empty()
}

/// Runs one target's follow step on the flow results `(previous feature, new position)`.
fn follow(target: &mut Target, frame: &Frame<'_>, pairs: Vec<(Feature, geom::PointF)>) {
    let options = frame.options;
    let Some(index) = target.contour else { return };
    let pairs = remove_strays(pairs, frame, index, options.min_feature_distance);
    if pairs.is_empty() {
        log::trace!("target {} lost all features", target.id);
        target.succeeded = false;
        return;
    }

    let relevance = target.kind.relevance();
    target.features = pairs
        .iter()
        .map(|(last, position)| Feature {
            position: *position,
            relevance: relevance.score(last, *position),
        })
        .collect();

    if let Some(median) = feature::median_point(&target.features, options.median_power) {
        target.median = median;
    }
    let (width, height) = frame.size();
    if let Some(bounds) = Rect::bounding_f32(target.features.iter().map(|f| f.position)) {
        target.roi = bounds.pad(options.roi_padding).limit(width, height);
    }

    let relocations = (target.features.len() as f32 * options.relocation_fraction) as usize;
    for _ in 0..relocations {
        feature::relocate_farthest(&mut target.features, target.median);
    }

    let roi = target.roi;
    frame.complement(target, roi);
    target.succeeded = true;
}

/// Drops features that left the image or their region, then features crowding a later one.
fn remove_strays(
    pairs: Vec<(Feature, geom::PointF)>,
    frame: &Frame<'_>,
    index: usize,
    min_distance: f32,
) -> Vec<(Feature, geom::PointF)> {
    let on_region = pairs
        .into_iter()
        .filter(|(_, p)| frame.contours.region_contains(index, geom::round(*p)))
        .collect::<Vec<_>>();

    on_region
        .iter()
        .enumerate()
        .filter(|&(i, (_, p))| {
            on_region[i + 1..]
                .iter()
                .all(|(_, q)| geom::distance4f(*p, *q) >= min_distance)
        })
        .map(|(_, pair)| *pair)
        .collect()
}
