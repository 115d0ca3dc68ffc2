//! Hand detection on region contours.
//!
//! Fingertips and the valleys between them show up as sharp convex and concave bends of a region's
//! outline. [`corner`] finds those bends, and [`HandDetector`] looks for the fingertip/valley
//! spacing of an open hand in them.

pub mod corner;
mod detector;

pub use detector::{match_hands, HandDetector};

use crate::{
    geom::{self, Point, PointF},
    rect::Rect,
};

/// Ratio from the middle fingertip through the valley midpoint to the palm center.
const PALM_EXTRAPOLATION: f32 = 1.7;
const PALM_RADIUS_FACTOR: f32 = 0.9;

/// A detected open hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    fingers: Vec<Point>,
    valleys: Vec<Point>,
    palm: PointF,
    radius: f32,
    rect: Rect,
}

impl Hand {
    /// Builds a hand from the fingertips and valleys starting at `offset`.
    ///
    /// The fingers at `offset + 1` and the valleys at `offset` and `offset + 1` must exist.
    fn new(fingers: &[Point], valleys: &[Point], offset: usize) -> Self {
        let fingers = fingers[offset..].to_vec();
        let valleys = valleys.get(offset..).unwrap_or_default().to_vec();

        let mid = geom::to_f32(fingers[1]);
        let base = geom::extrapolate(geom::to_f32(valleys[0]), geom::to_f32(valleys[1]), 0.5);
        let palm = geom::extrapolate(mid, base, PALM_EXTRAPOLATION);
        let radius = PALM_RADIUS_FACTOR * nalgebra::distance(&mid, &palm);

        Self {
            fingers,
            valleys,
            palm,
            radius,
            rect: Rect::around(palm, radius),
        }
    }

    /// Fingertips, in contour order.
    pub fn fingers(&self) -> &[Point] {
        &self.fingers
    }

    /// Valleys between consecutive fingertips, in contour order.
    pub fn valleys(&self) -> &[Point] {
        &self.valleys
    }

    /// The fingertip the palm is estimated from.
    pub fn middle_finger(&self) -> Point {
        self.fingers[1]
    }

    /// Estimated palm center.
    pub fn palm(&self) -> PointF {
        self.palm
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Square around the palm, with sides of twice the palm radius.
    pub fn rect(&self) -> Rect {
        self.rect
    }
}

/// Detector parameters, derived from the length of the contour they are used on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Longest expected finger, in contour points.
    pub max_distance: usize,
    /// Shortest expected finger, in contour points.
    pub min_distance: usize,
    pub mid_distance: usize,
    /// Corner groups with fewer corners are noise.
    pub min_group_size: usize,
    /// Corner groups with more corners are smooth bends, not fingertips.
    pub max_group_size: usize,
    /// Maximum 4-distance between neighboring corner groups of one hand.
    pub max_group_distance: u32,
    /// Minimum number of corner groups that make up a hand.
    pub min_groups: usize,
    pub min_cosine: f32,
}

impl DetectionParams {
    /// Parameters for a contour with `perimeter` points.
    pub fn from_perimeter(perimeter: usize) -> Self {
        let p = perimeter as f32;
        let max_distance = (p * 0.0553 + 5.7818) as usize;
        let min_distance = (p * 0.0368 + 1.7797) as usize;
        Self {
            max_distance,
            min_distance,
            mid_distance: (max_distance + min_distance) / 2,
            min_group_size: min_distance / 3,
            max_group_size: (max_distance as f32 * 1.5) as usize,
            max_group_distance: min_distance as u32,
            min_groups: HandDetector::MIN_HAND_SIZE * 2 - 1,
            min_cosine: 0.0,
        }
    }

    /// Looser grouping used when looking for fingertips alone.
    pub fn relaxed(mut self) -> Self {
        self.max_group_distance = 2 * self.min_distance as u32;
        self.min_groups = 1;
        self
    }

    /// Arc distances at which corners are measured.
    pub fn distances(&self) -> [usize; 3] {
        [self.max_distance, self.min_distance, self.mid_distance]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn params_scale_with_perimeter() {
        let params = DetectionParams::from_perimeter(820);
        assert_eq!(params.max_distance, 51);
        assert_eq!(params.min_distance, 31);
        assert_eq!(params.mid_distance, 41);
        assert_eq!(params.min_group_size, 10);
        assert_eq!(params.max_group_size, 76);
        assert_eq!(params.max_group_distance, 31);
        assert_eq!(params.min_groups, 5);
        assert_eq!(params.distances(), [51, 31, 41]);

        let relaxed = params.relaxed();
        assert_eq!(relaxed.max_group_distance, 62);
        assert_eq!(relaxed.min_groups, 1);
        assert_eq!(relaxed.min_group_size, params.min_group_size);
    }

    #[test]
    fn palm_geometry() {
        let fingers = [Point::new(0, 0), Point::new(20, 0), Point::new(40, 0)];
        let valleys = [Point::new(14, 40), Point::new(26, 40)];
        let hand = Hand::new(&fingers, &valleys, 0);
        assert_eq!(hand.middle_finger(), Point::new(20, 0));
        assert_relative_eq!(hand.palm(), PointF::new(20.0, 68.0), epsilon = 1e-4);
        assert_relative_eq!(hand.radius(), 0.9 * 68.0, epsilon = 1e-4);
        let r = hand.radius();
        assert_eq!(
            hand.rect(),
            Rect::from_top_left(
                (20.0 - r) as i32,
                (68.0 - r) as i32,
                (2.0 * r) as i32,
                (2.0 * r) as i32
            )
        );
    }

    #[test]
    fn hand_keeps_points_from_offset() {
        let fingers = (0..5).map(|i| Point::new(i * 20, 0)).collect::<Vec<_>>();
        let valleys = (0..4).map(|i| Point::new(i * 20 + 10, 30)).collect::<Vec<_>>();
        let hand = Hand::new(&fingers, &valleys, 2);
        assert_eq!(hand.fingers(), &fingers[2..]);
        assert_eq!(hand.valleys(), &valleys[2..]);
        assert_eq!(hand.middle_finger(), Point::new(60, 0));
    }
}
