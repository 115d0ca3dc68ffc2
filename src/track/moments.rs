//! Region moments.

use nalgebra::{Matrix2, SymmetricEigen};

use crate::{
    geom::{Point, PointF},
    rect::Rect,
};

/// An oriented ellipse fitted to a pixel region by its second-order moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    /// Centroid of the region.
    pub center: PointF,
    /// Full length of the major axis.
    pub length: f32,
    /// Full length of the minor axis.
    pub width: f32,
    /// Angle of the major axis against the x axis, in degrees, in `0.0..180.0`.
    pub angle: f32,
}

impl Ellipse {
    /// Axis-aligned bounding rectangle of the ellipse, limited to an image of the given size.
    pub fn bounds(&self, width: usize, height: usize) -> Rect {
        let theta = self.angle.to_radians();
        let (sin, cos) = theta.sin_cos();
        let (a, b) = (self.length * 0.5, self.width * 0.5);
        let half_w = ((a * cos).powi(2) + (b * sin).powi(2)).sqrt();
        let half_h = ((a * sin).powi(2) + (b * cos).powi(2)).sqrt();
        Rect::from_top_left(
            (self.center.x - half_w).floor() as i32,
            (self.center.y - half_h).floor() as i32,
            (2.0 * half_w).ceil() as i32 + 1,
            (2.0 * half_h).ceil() as i32 + 1,
        )
        .limit(width, height)
    }
}

/// Raw and central moments up to second order of a set of pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl Moments {
    /// Computes the moments of the given pixels, each weighing 1.
    pub fn of_pixels<I: IntoIterator<Item = Point>>(pixels: I) -> Self {
        let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
        let (mut m20, mut m11, mut m02) = (0.0, 0.0, 0.0);
        for p in pixels {
            let (x, y) = (f64::from(p.x), f64::from(p.y));
            m00 += 1.0;
            m10 += x;
            m01 += y;
            m20 += x * x;
            m11 += x * y;
            m02 += y * y;
        }
        if m00 == 0.0 {
            return Self::default();
        }
        let (xc, yc) = (m10 / m00, m01 / m00);
        Self {
            m00,
            m10,
            m01,
            mu20: m20 - xc * m10,
            mu11: m11 - xc * m01,
            mu02: m02 - yc * m01,
        }
    }

    /// Centroid, or [`None`] for an empty region.
    pub fn centroid(&self) -> Option<PointF> {
        (self.m00 > 0.0).then(|| {
            PointF::new(
                (self.m10 / self.m00) as f32,
                (self.m01 / self.m00) as f32,
            )
        })
    }

    /// Fits an ellipse whose axes are 4 standard deviations long.
    ///
    /// Returns [`None`] for an empty region.
    pub fn ellipse(&self) -> Option<Ellipse> {
        let center = self.centroid()?;
        let covariance = Matrix2::new(self.mu20, self.mu11, self.mu11, self.mu02) / self.m00;
        let eigen = SymmetricEigen::new(covariance);
        let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };
        let axis = eigen.eigenvectors.column(major);
        let mut angle = axis[1].atan2(axis[0]).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if angle >= 180.0 {
            angle -= 180.0;
        }

        Some(Ellipse {
            center,
            length: 4.0 * eigen.eigenvalues[major].max(0.0).sqrt() as f32,
            width: 4.0 * eigen.eigenvalues[minor].max(0.0).sqrt() as f32,
            angle: angle as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn rect_pixels(x: i32, y: i32, w: i32, h: i32) -> impl Iterator<Item = Point> {
        (y..y + h).flat_map(move |py| (x..x + w).map(move |px| Point::new(px, py)))
    }

    #[test]
    fn empty_region() {
        let m = Moments::of_pixels(std::iter::empty());
        assert_eq!(m.centroid(), None);
        assert_eq!(m.ellipse(), None);
    }

    #[test]
    fn horizontal_bar() {
        let m = Moments::of_pixels(rect_pixels(10, 20, 40, 4));
        assert_eq!(m.m00, 160.0);
        assert_relative_eq!(m.centroid().unwrap(), PointF::new(29.5, 21.5));

        let e = m.ellipse().unwrap();
        assert!(e.length > e.width);
        assert!(e.angle < 1.0 || e.angle > 179.0, "{}", e.angle);
        // variance of 40 uniformly spaced pixels is (40^2 - 1) / 12
        assert_relative_eq!(e.length, 4.0 * (1599.0f32 / 12.0).sqrt(), epsilon = 1e-3);

        let bounds = e.bounds(1000, 1000);
        assert!(bounds.contains_point(Point::new(10, 21)));
        assert!(bounds.contains_point(Point::new(49, 21)));
    }

    #[test]
    fn diagonal_line() {
        let m = Moments::of_pixels((0..30).map(|i| Point::new(i, i)));
        let e = m.ellipse().unwrap();
        assert_relative_eq!(e.angle, 45.0, epsilon = 1e-3);
        assert_relative_eq!(e.width, 0.0, epsilon = 1e-2);
    }

    #[test]
    fn single_pixel() {
        let e = Moments::of_pixels([Point::new(3, 4)]).ellipse().unwrap();
        assert_eq!(e.center, PointF::new(3.0, 4.0));
        assert_eq!(e.length, 0.0);
        assert_eq!(e.width, 0.0);
        assert_eq!(e.bounds(2, 2), Rect::from_top_left(2, 2, 0, 0));
    }
}
