use crate::geom::{self, Point};

use super::{
    corner::{self, GroupedCorner},
    DetectionParams, Hand,
};

/// Maximum ratio between the distances of two neighboring fingertip pairs.
const MAX_SPREAD_RATIO: f32 = 1.4;

/// Finds open hands on region contours.
#[derive(Debug, Clone)]
pub struct HandDetector {
    min_perimeter: usize,
}

impl Default for HandDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector {
    /// Contours with fewer points are too small to show individual fingers.
    pub const DEFAULT_MIN_PERIMETER: usize = 200;

    /// Number of consecutive fingertips that make up a hand.
    pub const MIN_HAND_SIZE: usize = 3;

    pub fn new() -> Self {
        Self {
            min_perimeter: Self::DEFAULT_MIN_PERIMETER,
        }
    }

    pub fn set_min_perimeter(&mut self, min_perimeter: usize) {
        self.min_perimeter = min_perimeter;
    }

    pub fn min_perimeter(&self) -> usize {
        self.min_perimeter
    }

    /// Detects hands on a closed contour.
    pub fn detect(&self, contour: &[Point]) -> Vec<Hand> {
        if contour.len() <= self.min_perimeter {
            return Vec::new();
        }
        let params = DetectionParams::from_perimeter(contour.len());
        let corners = corner::extract(contour, &params);
        let hands = walk(&corners);
        log::trace!(
            "{} corner groups on a contour of {} points, {} hands",
            corners.len(),
            contour.len(),
            hands.len()
        );
        hands
    }

    /// Returns the fingertip candidates of a closed contour, without matching a hand pattern.
    pub fn detect_fingers(&self, contour: &[Point]) -> Vec<Point> {
        if contour.is_empty() {
            return Vec::new();
        }
        let params = DetectionParams::from_perimeter(contour.len()).relaxed();
        corner::extract(contour, &params)
            .into_iter()
            .filter(|c| c.direction > 0)
            .map(|c| c.point)
            .collect()
    }
}

/// Splits the corner groups into runs of alternating fingertips and valleys and matches each run.
///
/// A group that breaks the alternation (or has no clear direction) ends the current run and is
/// dropped.
fn walk(corners: &[GroupedCorner]) -> Vec<Hand> {
    let mut hands = Vec::new();
    let mut fingers = Vec::new();
    let mut valleys = Vec::new();
    // a run starts with a fingertip
    let mut last = -1;
    for c in corners {
        if c.direction * last < 0 {
            if c.direction > 0 {
                fingers.push(c.point);
            } else {
                valleys.push(c.point);
            }
            last = c.direction;
        } else {
            hands.extend(match_hands(&fingers, &valleys));
            fingers.clear();
            valleys.clear();
            last = -1;
        }
    }
    hands.extend(match_hands(&fingers, &valleys));
    hands
}

/// Finds hands in an alternating run of fingertips and valleys.
///
/// Valley `i` is expected to lie between fingertips `i` and `i + 1`. After a match, the search
/// continues past the matched fingertips.
pub fn match_hands(fingers: &[Point], valleys: &[Point]) -> Vec<Hand> {
    let size = HandDetector::MIN_HAND_SIZE;
    let mut hands = Vec::new();
    let mut i = 0;
    while i + size <= fingers.len() && i + size - 1 <= valleys.len() {
        if pattern_matches(&fingers[i..i + 3], &valleys[i..i + 2]) {
            hands.push(Hand::new(fingers, valleys, i));
            i += size;
        } else {
            i += 1;
        }
    }
    hands
}

/// Checks the spacing of three fingertips and the two valleys between them.
///
/// The valleys must be closer together than either pair of neighboring fingertips, the two
/// fingertip distances must be similar, and every fingertip must be far from its valleys.
fn pattern_matches(f: &[Point], v: &[Point]) -> bool {
    let tips_left = geom::distance(f[0], f[1]);
    let tips_right = geom::distance(f[1], f[2]);
    let valleys = geom::distance(v[0], v[1]);

    if valleys >= tips_left || valleys >= tips_right {
        return false;
    }
    if tips_left >= MAX_SPREAD_RATIO * tips_right || tips_right >= MAX_SPREAD_RATIO * tips_left {
        return false;
    }

    let longest = tips_left.max(tips_right);
    [(0, 0), (1, 0), (1, 1), (2, 1)]
        .into_iter()
        .all(|(fi, vi)| 2.0 * geom::distance(f[fi], v[vi]) > longest)
}
