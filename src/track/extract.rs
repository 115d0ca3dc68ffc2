//! Interest point and object detectors used to seed and classify targets.

use itertools::Itertools;

use crate::{
    geom::PointF,
    grid::{GrayImage, Grid, Mask},
    num::TotalF32,
    rect::Rect,
};

/// Finds well-distributed points that optical flow can follow.
pub trait FeatureExtractor {
    /// Returns at most `max` points inside `roi` whose `mask` value is nonzero, best first.
    fn extract(&self, gray: &GrayImage, mask: &Mask, roi: Rect, max: usize) -> Vec<PointF>;
}

/// Finds face (or other object) rectangles in a grayscale region.
///
/// Rectangles are in the coordinates of the image passed to `detect`.
pub trait CascadeDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<Rect>;
}

/// Shi-Tomasi corners: the smaller eigenvalue of the gradient structure tensor.
#[derive(Debug, Clone)]
pub struct ShiTomasi {
    quality: f32,
    min_distance: f32,
}

impl Default for ShiTomasi {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiTomasi {
    /// Corners weaker than this fraction of the strongest one are ignored.
    pub const DEFAULT_QUALITY: f32 = 0.001;

    pub const DEFAULT_MIN_DISTANCE: f32 = 3.0;

    pub fn new() -> Self {
        Self {
            quality: Self::DEFAULT_QUALITY,
            min_distance: Self::DEFAULT_MIN_DISTANCE,
        }
    }

    pub fn set_quality(&mut self, quality: f32) {
        self.quality = quality;
    }

    /// Sets the minimum Euclidean distance between two returned corners.
    pub fn set_min_distance(&mut self, min_distance: f32) {
        self.min_distance = min_distance;
    }
}

impl FeatureExtractor for ShiTomasi {
    fn extract(&self, gray: &GrayImage, mask: &Mask, roi: Rect, max: usize) -> Vec<PointF> {
        let roi = roi.limit(gray.width(), gray.height());
        if max == 0 || roi.is_empty() {
            return Vec::new();
        }

        let response = min_eigenvalues(gray, roi);
        let strongest = response
            .as_slice()
            .iter()
            .copied()
            .fold(0.0f32, f32::max);
        if strongest <= 0.0 {
            return Vec::new();
        }
        let threshold = strongest * self.quality;

        let (w, h) = response.size();
        let is_peak = |x: usize, y: usize| {
            let v = response[(x, y)];
            (x.saturating_sub(1)..=(x + 1).min(w - 1))
                .cartesian_product(y.saturating_sub(1)..=(y + 1).min(h - 1))
                .all(|(nx, ny)| response[(nx, ny)] <= v)
        };

        let candidates = (0..h)
            .cartesian_product(0..w)
            .filter(|&(y, x)| {
                let (gx, gy) = (x + roi.x() as usize, y + roi.y() as usize);
                mask[(gx, gy)] != 0 && response[(x, y)] >= threshold && is_peak(x, y)
            })
            .sorted_by_key(|&(y, x)| std::cmp::Reverse(TotalF32(response[(x, y)])));

        let min_sq = self.min_distance * self.min_distance;
        let mut corners: Vec<PointF> = Vec::new();
        for (y, x) in candidates {
            let p = PointF::new((x as i32 + roi.x()) as f32, (y as i32 + roi.y()) as f32);
            if corners
                .iter()
                .all(|c| nalgebra::distance_squared(c, &p) >= min_sq)
            {
                corners.push(p);
                if corners.len() == max {
                    break;
                }
            }
        }
        corners
    }
}

/// Minimum eigenvalue of the 3x3-summed Sobel structure tensor, for every pixel of `roi`.
///
/// Gradients near the image border are computed on clamped coordinates.
fn min_eigenvalues(gray: &GrayImage, roi: Rect) -> Grid<f32> {
    let (iw, ih) = (gray.width() as i32, gray.height() as i32);
    let px = |x: i32, y: i32| f32::from(gray[(x.clamp(0, iw - 1) as usize, y.clamp(0, ih - 1) as usize)]);

    // gradients over the roi plus a 1 pixel margin
    let (ox, oy) = (roi.x() - 1, roi.y() - 1);
    let (gw, gh) = (roi.width() as usize + 2, roi.height() as usize + 2);
    let gradients = Grid::from_fn(gw, gh, |gx, gy| {
        let (x, y) = (gx as i32 + ox, gy as i32 + oy);
        let dx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
            - px(x - 1, y - 1)
            - 2.0 * px(x - 1, y)
            - px(x - 1, y + 1);
        let dy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
            - px(x - 1, y - 1)
            - 2.0 * px(x, y - 1)
            - px(x + 1, y - 1);
        (dx, dy)
    });

    Grid::from_fn(roi.width() as usize, roi.height() as usize, |x, y| {
        let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
        for (nx, ny) in (x..x + 3).cartesian_product(y..y + 3) {
            let (dx, dy) = gradients[(nx, ny)];
            a += dx * dx;
            b += dx * dy;
            c += dy * dy;
        }
        let half_trace = (a + c) * 0.5;
        half_trace - (((a - c) * 0.5).powi(2) + b * b).sqrt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark 10x10 squares on a bright background; every square has 4 corners.
    fn checker() -> GrayImage {
        GrayImage::from_fn(60, 40, |x, y| {
            let inside = |x0: usize, y0: usize| (x0..x0 + 10).contains(&x) && (y0..y0 + 10).contains(&y);
            if inside(10, 10) || inside(35, 15) {
                20
            } else {
                220
            }
        })
    }

    #[test]
    fn finds_square_corners() {
        let gray = checker();
        let mask = Mask::filled(60, 40, 255);
        let corners = ShiTomasi::new().extract(&gray, &mask, Rect::from_top_left(0, 0, 60, 40), 100);
        assert!(corners.len() >= 8, "{corners:?}");
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                assert!(nalgebra::distance(a, b) >= 3.0);
            }
        }
        // there is a corner near the top-left corner of the first square
        assert!(corners
            .iter()
            .any(|c| (c.x - 10.0).abs() <= 2.0 && (c.y - 10.0).abs() <= 2.0));
    }

    #[test]
    fn budget_mask_and_roi() {
        let gray = checker();
        let mask = Mask::filled(60, 40, 255);
        let full = Rect::from_top_left(0, 0, 60, 40);
        let extractor = ShiTomasi::new();
        assert_eq!(extractor.extract(&gray, &mask, full, 3).len(), 3);
        assert!(extractor.extract(&gray, &mask, full, 0).is_empty());

        // only the right square is inside the roi
        let right = Rect::from_top_left(30, 0, 30, 40);
        let corners = extractor.extract(&gray, &mask, right, 100);
        assert!(!corners.is_empty());
        assert!(corners.iter().all(|c| right.contains_point_f32(*c)));

        // nothing under an empty mask
        let empty = Mask::new(60, 40);
        assert!(extractor.extract(&gray, &empty, full, 100).is_empty());

        // roi outside the image
        assert!(extractor
            .extract(&gray, &mask, Rect::from_top_left(100, 100, 5, 5), 10)
            .is_empty());
    }

    #[test]
    fn flat_image_has_no_corners() {
        let gray = GrayImage::filled(20, 20, 128);
        let mask = Mask::filled(20, 20, 255);
        let corners = ShiTomasi::new().extract(&gray, &mask, Rect::from_top_left(0, 0, 20, 20), 10);
        assert!(corners.is_empty());
    }
}
