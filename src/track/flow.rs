//! Sparse optical flow.

use crate::{
    geom::PointF,
    grid::{GrayImage, Grid},
};

/// Outcome of following one point from the previous frame into the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Tracked,
    /// The gradient matrix around the point was singular.
    Lost,
    /// The point left the image.
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tracked {
    /// New position. Unreliable unless `status` is [`FlowStatus::Tracked`].
    pub position: PointF,
    pub status: FlowStatus,
}

impl Tracked {
    pub fn is_tracked(&self) -> bool {
        self.status == FlowStatus::Tracked
    }
}

/// Follows points from one grayscale frame into the next.
///
/// Implementations return exactly one [`Tracked`] per input point, in input order.
pub trait OpticalFlow {
    fn track(&self, prev: &GrayImage, curr: &GrayImage, points: &[PointF]) -> Vec<Tracked>;
}

/// Pyramidal forward-additive Lucas-Kanade.
#[derive(Debug, Clone)]
pub struct LucasKanade {
    half_window: usize,
    levels: usize,
    max_iterations: usize,
    epsilon: f32,
}

impl Default for LucasKanade {
    fn default() -> Self {
        Self::new()
    }
}

impl LucasKanade {
    /// Half the side of the square window matched around each point (15x15 window).
    pub const DEFAULT_HALF_WINDOW: usize = 7;

    pub const DEFAULT_LEVELS: usize = 3;

    pub const DEFAULT_MAX_ITERATIONS: usize = 20;

    /// Iteration stops once an update moves the point by less than this many pixels.
    pub const DEFAULT_EPSILON: f32 = 0.03;

    const MIN_DETERMINANT: f32 = 1e-6;

    pub fn new() -> Self {
        Self {
            half_window: Self::DEFAULT_HALF_WINDOW,
            levels: Self::DEFAULT_LEVELS,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }

    pub fn set_half_window(&mut self, half_window: usize) {
        self.half_window = half_window;
    }

    /// Sets the number of pyramid levels, including the full-resolution one.
    pub fn set_levels(&mut self, levels: usize) {
        self.levels = levels.max(1);
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    fn track_point(&self, prev: &[Grid<f32>], curr: &[Grid<f32>], point: PointF) -> Tracked {
        let mut d = [0.0f32; 2];
        for level in (0..prev.len()).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let at = [point.x * scale, point.y * scale];
            match self.refine(&prev[level], &curr[level], at, d) {
                Some(refined) => d = refined,
                None => {
                    return Tracked {
                        position: PointF::new(point.x + d[0] / scale, point.y + d[1] / scale),
                        status: FlowStatus::Lost,
                    }
                }
            }
            if level > 0 {
                d = [d[0] * 2.0, d[1] * 2.0];
            }
        }

        let position = PointF::new(point.x + d[0], point.y + d[1]);
        let (w, h) = prev[0].size();
        let status = if in_bounds(position, w, h) {
            FlowStatus::Tracked
        } else {
            FlowStatus::OutOfBounds
        };
        Tracked { position, status }
    }

    /// Iterates the displacement `d` of the window around `at` on one pyramid level.
    ///
    /// Returns [`None`] if the gradient matrix becomes singular.
    fn refine(&self, prev: &Grid<f32>, curr: &Grid<f32>, at: [f32; 2], mut d: [f32; 2]) -> Option<[f32; 2]> {
        let r = self.half_window as i32;
        for _ in 0..self.max_iterations {
            let (mut h00, mut h01, mut h11) = (0.0f32, 0.0f32, 0.0f32);
            let (mut b0, mut b1) = (0.0f32, 0.0f32);
            for wy in -r..=r {
                for wx in -r..=r {
                    let (px, py) = (at[0] + wx as f32, at[1] + wy as f32);
                    let (cx, cy) = (px + d[0], py + d[1]);

                    let template = bilinear(prev, px, py);
                    let warped = bilinear(curr, cx, cy);
                    let gx = (bilinear(curr, cx + 1.0, cy) - bilinear(curr, cx - 1.0, cy)) * 0.5;
                    let gy = (bilinear(curr, cx, cy + 1.0) - bilinear(curr, cx, cy - 1.0)) * 0.5;

                    let err = template - warped;
                    h00 += gx * gx;
                    h01 += gx * gy;
                    h11 += gy * gy;
                    b0 += gx * err;
                    b1 += gy * err;
                }
            }

            let det = h00 * h11 - h01 * h01;
            if det.abs() < Self::MIN_DETERMINANT {
                return None;
            }
            let step = [(h11 * b0 - h01 * b1) / det, (h00 * b1 - h01 * b0) / det];
            d = [d[0] + step[0], d[1] + step[1]];
            if step[0] * step[0] + step[1] * step[1] < self.epsilon * self.epsilon {
                break;
            }
        }
        Some(d)
    }
}

impl OpticalFlow for LucasKanade {
    fn track(&self, prev: &GrayImage, curr: &GrayImage, points: &[PointF]) -> Vec<Tracked> {
        if points.is_empty() {
            return Vec::new();
        }
        let prev = pyramid(prev, self.levels);
        let curr = pyramid(curr, self.levels);
        let levels = prev.len().min(curr.len());
        points
            .iter()
            .map(|&p| self.track_point(&prev[..levels], &curr[..levels], p))
            .collect()
    }
}

fn in_bounds(p: PointF, width: usize, height: usize) -> bool {
    p.x >= 0.0 && p.y >= 0.0 && p.x < width as f32 && p.y < height as f32
}

/// Builds up to `levels` levels by repeated 2x2 averaging. Stops early at images smaller than
/// 2x2.
fn pyramid(image: &GrayImage, levels: usize) -> Vec<Grid<f32>> {
    let mut pyramid = vec![image.map(|&v| f32::from(v))];
    while pyramid.len() < levels {
        let Some(last) = pyramid.last() else { break };
        let (w, h) = (last.width() / 2, last.height() / 2);
        if w == 0 || h == 0 {
            break;
        }
        let next = Grid::from_fn(w, h, |x, y| {
            let (x, y) = (x * 2, y * 2);
            (last[(x, y)] + last[(x + 1, y)] + last[(x, y + 1)] + last[(x + 1, y + 1)]) * 0.25
        });
        pyramid.push(next);
    }
    pyramid
}

/// Samples with bilinear interpolation, clamping coordinates to the image.
fn bilinear(image: &Grid<f32>, x: f32, y: f32) -> f32 {
    let (w, h) = image.size();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let top = image[(x0, y0)] * (1.0 - fx) + image[(x1, y0)] * fx;
    let bottom = image[(x0, y1)] * (1.0 - fx) + image[(x1, y1)] * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn texture(dx: f32, dy: f32) -> GrayImage {
        GrayImage::from_fn(96, 96, |x, y| {
            let (x, y) = (x as f32 - dx, y as f32 - dy);
            (128.0 + 50.0 * (x * 0.3).sin() * (y * 0.25).cos() + 30.0 * (0.2 * (x + y)).sin()) as u8
        })
    }

    #[test]
    fn follows_a_shift() {
        let flow = LucasKanade::new();
        let prev = texture(0.0, 0.0);
        let curr = texture(2.0, 1.0);
        let tracked = flow.track(&prev, &curr, &[PointF::new(48.0, 48.0), PointF::new(40.0, 55.0)]);
        assert_eq!(tracked.len(), 2);
        for (t, start) in tracked.iter().zip([PointF::new(48.0, 48.0), PointF::new(40.0, 55.0)]) {
            assert!(t.is_tracked(), "{t:?}");
            assert_relative_eq!(t.position, start + nalgebra::Vector2::new(2.0, 1.0), epsilon = 0.25);
        }
    }

    #[test]
    fn flat_images_lose_points() {
        let flat = GrayImage::filled(64, 64, 100);
        let tracked = LucasKanade::new().track(&flat, &flat, &[PointF::new(30.0, 30.0)]);
        assert_eq!(tracked[0].status, FlowStatus::Lost);
        assert!(LucasKanade::new().track(&flat, &flat, &[]).is_empty());
    }

    #[test]
    fn bounds() {
        assert!(in_bounds(PointF::new(0.0, 0.0), 10, 10));
        assert!(in_bounds(PointF::new(9.9, 9.9), 10, 10));
        assert!(!in_bounds(PointF::new(10.0, 5.0), 10, 10));
        assert!(!in_bounds(PointF::new(-0.1, 5.0), 10, 10));
    }

    #[test]
    fn pyramid_levels() {
        let image = GrayImage::from_fn(8, 6, |x, _| (x * 10) as u8);
        let pyr = pyramid(&image, 3);
        assert_eq!(pyr.len(), 3);
        assert_eq!(pyr[1].size(), (4, 3));
        assert_eq!(pyr[2].size(), (2, 1));
        assert_relative_eq!(pyr[1][(0, 0)], 5.0);

        let tiny = GrayImage::new(3, 1);
        assert_eq!(pyramid(&tiny, 3).len(), 1);
    }

    #[test]
    fn bilinear_sampling() {
        let image = Grid::from_fn(2, 2, |x, y| (x + 2 * y) as f32);
        assert_relative_eq!(bilinear(&image, 0.5, 0.5), 1.5);
        assert_relative_eq!(bilinear(&image, -3.0, 0.0), 0.0);
        assert_relative_eq!(bilinear(&image, 5.0, 5.0), 3.0);
    }
}
