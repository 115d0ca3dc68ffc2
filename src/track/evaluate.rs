//! Recovery, merging and eviction of targets at the end of a frame.

use crate::{geom::Point, rect::Rect};

use super::{
    feature,
    moments::Moments,
    target::{Target, TargetType},
    Frame, MergeThresholds,
};

/// Tries to recover failed targets, merges duplicates, drops what could not be recovered, and
/// refines the survivors.
///
/// Removed targets are only marked while iterating, then compacted in one pass.
pub(super) fn evaluate(targets: &mut Vec<Target>, frame: &Frame<'_>) {
    let merge = &frame.options.merge;
    let mut removed = vec![false; targets.len()];

    for i in 0..targets.len() {
        if removed[i] {
            continue;
        }
        if !targets[i].succeeded {
            reinitialize(&mut targets[i], frame);
        }
        if !targets[i].succeeded {
            log::trace!("target {} could not be recovered", targets[i].id);
            removed[i] = true;
            continue;
        }

        for j in 0..targets.len() {
            if i == j || removed[j] {
                continue;
            }
            let Some(victim) = merge_victim(&targets[i], &targets[j], merge) else { continue };
            let drop = if victim == targets[i].id { i } else { j };
            log::trace!(
                "merging targets {} and {}, dropping {}",
                targets[i].id,
                targets[j].id,
                victim
            );
            removed[drop] = true;
            if drop == i {
                break;
            }
        }

        if !removed[i] {
            refine(&mut targets[i], frame);
        }
    }

    let mut flags = removed.into_iter();
    targets.retain(|_| !flags.next().unwrap_or(false));
}

/// Decides which of two targets on the same contour is a duplicate of the other.
///
/// An unknown target mostly inside another one is dropped. Two hands (or two faces) whose ROIs
/// mostly cover each other and whose median points are close are merged. In both cases, the
/// newer one goes if neither is preferred.
fn merge_victim(a: &Target, b: &Target, thresholds: &MergeThresholds) -> Option<super::TargetId> {
    if a.contour.is_none() || a.contour != b.contour {
        return None;
    }
    let newer = a.id.max(b.id);
    let one_inside = a.roi.max_coverage(&b.roi) > thresholds.one_inside;
    let both_inside = a.roi.min_coverage(&b.roi) > thresholds.both_inside;
    let close = nalgebra::distance(&a.median, &b.median) < thresholds.max_distance;

    match (a.kind, b.kind) {
        (TargetType::Unknown, TargetType::Unknown) if one_inside => Some(newer),
        (TargetType::Unknown, _) if one_inside => Some(a.id),
        (_, TargetType::Unknown) if one_inside => Some(b.id),
        (TargetType::Hand, TargetType::Hand) | (TargetType::Face, TargetType::Face)
            if both_inside && close =>
        {
            Some(newer)
        }
        _ => None,
    }
}

/// Restarts a target that could not be followed from where its ROI was heading.
///
/// A target without a contour adopts the region covering most of its predicted ROI. New features
/// are then requested in the previous, current and predicted ROIs.
fn reinitialize(target: &mut Target, frame: &Frame<'_>) {
    let (width, height) = frame.size();
    // an unmatched target kept its ROI, so its last snapshot holds the current one
    let back = usize::from(target.contour.is_none());
    let previous = match target.before_last(back) {
        Some(s) if !s.roi.is_empty() => s.roi,
        _ => return,
    };
    let roi = target.roi;
    let next = roi
        .move_by(roi.x() - previous.x(), roi.y() - previous.y())
        .limit(width, height);

    if target.contour.is_none() {
        let Some(index) = dominant_region(frame, next) else { return };
        let Some(contour) = frame.contours.get(index) else { return };
        log::trace!("target {} re-associated with contour {index}", target.id);
        target.contour = Some(index);
        target.outline = contour.points.clone();
    }

    for area in [previous, roi, next] {
        frame.complement(target, area);
    }

    if target.features.is_empty() {
        return;
    }
    if let Some(median) = feature::median_point(&target.features, frame.options.median_power) {
        target.median = median;
    }
    if let Some(bounds) = Rect::bounding_f32(target.features.iter().map(|f| f.position)) {
        target.roi = bounds.limit(width, height);
    }
    target.succeeded = true;
}

/// The contour whose region covers the most pixels of `rect`.
fn dominant_region(frame: &Frame<'_>, rect: Rect) -> Option<usize> {
    let mut counts = vec![0usize; frame.contours.len()];
    for y in rect.y()..rect.bottom() {
        for x in rect.x()..rect.right() {
            if let Some(index) = frame.contours.id_at(Point::new(x, y)) {
                counts[index] += 1;
            }
        }
    }
    counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .max_by_key(|(_, &count)| count)
        .map(|(index, _)| index)
}

/// Recomputes the mid point and ellipse from the region pixels inside the ROI.
fn refine(target: &mut Target, frame: &Frame<'_>) {
    let Some(contour) = target.contour.and_then(|i| frame.contours.get(i)) else { return };
    let roi = target.roi;
    let map = &frame.contours.map;
    let pixels = contour
        .pixels
        .iter()
        .map(|&i| {
            let (x, y) = map.coords(i);
            Point::new(x as i32, y as i32)
        })
        .filter(|&p| roi.contains_point(p));
    let moments = Moments::of_pixels(pixels);
    if let Some(mid) = moments.centroid() {
        target.mid = mid;
    }
    target.ellipse = moments.ellipse();
}
