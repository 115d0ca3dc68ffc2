//! Edge maps that block region growing.

use crate::grid::{GrayImage, Mask};

/// Computes a binary edge map for a grayscale frame.
///
/// Nonzero pixels in the returned mask stop skin regions from growing across them. The mask must
/// have the same size as the input.
pub trait EdgeDetector {
    fn detect(&self, gray: &GrayImage) -> Mask;
}

/// Produces an empty edge map, turning region growing into an unconstrained flood fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEdges;

impl EdgeDetector for NoEdges {
    fn detect(&self, gray: &GrayImage) -> Mask {
        Mask::new(gray.width(), gray.height())
    }
}

/// Thresholds the Sobel gradient magnitude.
#[derive(Debug, Clone, Copy)]
pub struct GradientEdges {
    threshold: f32,
}

impl Default for GradientEdges {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientEdges {
    pub const DEFAULT_THRESHOLD: f32 = 150.0;

    pub fn new() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    /// Sets the gradient magnitude at or above which a pixel is an edge.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl EdgeDetector for GradientEdges {
    fn detect(&self, gray: &GrayImage) -> Mask {
        let (w, h) = gray.size();
        let mut edges = Mask::new(w, h);
        if w < 3 || h < 3 {
            return edges;
        }

        let px = |x: usize, y: usize| f32::from(gray[(x, y)]);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                    - px(x - 1, y - 1)
                    - 2.0 * px(x - 1, y)
                    - px(x - 1, y + 1);
                let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                    - px(x - 1, y - 1)
                    - 2.0 * px(x, y - 1)
                    - px(x + 1, y - 1);
                if gx.hypot(gy) >= self.threshold {
                    edges[(x, y)] = 255;
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn step_edge() {
        let gray: GrayImage = Grid::from_fn(8, 5, |x, _| if x < 4 { 0 } else { 200 });
        let edges = GradientEdges::new().detect(&gray);
        for y in 1..4 {
            assert_eq!(edges.row(y), &[0, 0, 0, 255, 255, 0, 0, 0]);
        }
        assert_eq!(edges.row(0), &[0; 8]);
    }

    #[test]
    fn flat_and_tiny() {
        let flat = GrayImage::filled(6, 6, 90);
        assert_eq!(GradientEdges::new().detect(&flat).count_nonzero(), 0);

        let tiny = GrayImage::filled(2, 2, 90);
        assert_eq!(GradientEdges::new().detect(&tiny).size(), (2, 2));
        assert_eq!(NoEdges.detect(&tiny).count_nonzero(), 0);
    }
}
