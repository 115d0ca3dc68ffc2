//! Matching targets to the contours of a new frame.

use crate::contour::Contours;

use super::{feature, target::Target};

/// Matches every target to the contour its most central feature falls into.
///
/// Features are tried in order of 4-distance to the target's median point; the first one that
/// lies in a region decides. Unmatched targets without features are dropped. Returns, per
/// contour, whether a target claimed it.
pub(super) fn associate(targets: &mut Vec<Target>, contours: &Contours) -> Vec<bool> {
    let (width, height) = contours.map.size();
    let mut claimed = vec![false; contours.len()];

    targets.retain_mut(|target| {
        let mut ranked = target.features.clone();
        feature::sort_by_distance(&mut ranked, target.median);
        let hit = ranked.iter().find_map(|f| contours.id_at(f.pixel()));

        match hit.and_then(|index| Some((index, contours.get(index)?))) {
            Some((index, contour)) => {
                claimed[index] = true;
                log::trace!("target {} -> contour {index}", target.id);
                target.advance(index, contour.points.clone(), contour.bounds.limit(width, height));
                true
            }
            None if target.features.is_empty() => {
                log::trace!("target {} has no features left, dropping", target.id);
                false
            }
            None => {
                log::trace!("target {} is not on any contour", target.id);
                target.advance_unmatched();
                true
            }
        }
    });

    claimed
}
