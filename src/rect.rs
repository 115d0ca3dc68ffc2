//! Integer rectangles.
//!
//! These are used for regions of interest, contour bounds and detector outputs.

use std::fmt;

use crate::geom::{Point, PointF};

/// An axis-aligned rectangle on the pixel grid.
///
/// The rectangle covers `x..x + width` and `y..y + height`. Width and height are never negative;
/// a rectangle with zero width or height is *empty*.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    ///
    /// Negative sizes are clamped to zero.
    #[inline]
    pub fn from_top_left(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    /// Creates a square of side `2 * radius` centered on `center`.
    pub fn around(center: PointF, radius: f32) -> Self {
        Self::from_top_left(
            (center.x - radius) as i32,
            (center.y - radius) as i32,
            (radius * 2.0) as i32,
            (radius * 2.0) as i32,
        )
    }

    /// Computes the bounding rectangle of `points`.
    ///
    /// The result is inclusive: a single point yields a 1x1 rectangle. Returns [`None`] if `points`
    /// is empty.
    pub fn bounding<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Some(Self::from_top_left(
            min.x,
            min.y,
            max.x - min.x + 1,
            max.y - min.y + 1,
        ))
    }

    /// Bounding rectangle of sub-pixel points, truncated the way pixel coordinates are.
    pub fn bounding_f32<I: IntoIterator<Item = PointF>>(points: I) -> Option<Self> {
        Self::bounding(
            points
                .into_iter()
                .map(|p| Point::new(p.x.floor() as i32, p.y.floor() as i32)),
        )
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// X coordinate one past the right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Y coordinate one past the bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn center(&self) -> PointF {
        PointF::new(
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }

    #[inline]
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sum of all four sides.
    #[inline]
    pub fn perimeter(&self) -> u32 {
        (2 * self.width + 2 * self.height) as u32
    }

    /// Moves the rectangle by the given offset.
    #[must_use]
    pub fn move_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Adds `amount` pixels to every side.
    #[must_use]
    pub fn pad(&self, amount: i32) -> Self {
        Self::from_top_left(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2,
            self.height + amount * 2,
        )
    }

    /// Clips this rectangle to an image of the given size.
    #[must_use]
    pub fn limit(&self, width: usize, height: usize) -> Self {
        let x0 = self.x.clamp(0, width as i32);
        let y0 = self.y.clamp(0, height as i32);
        let x1 = self.right().clamp(0, width as i32);
        let y1 = self.bottom().clamp(0, height as i32);
        Self::from_top_left(x0, y0, x1 - x0, y1 - y0)
    }

    #[inline]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Returns whether a sub-pixel point falls into one of the rectangle's pixels.
    #[inline]
    pub fn contains_point_f32(&self, p: PointF) -> bool {
        self.contains_point(Point::new(p.x.floor() as i32, p.y.floor() as i32))
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::from_top_left(x0, y0, x1 - x0, y1 - y0))
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = match self.intersection(other) {
            Some(rect) => rect.area(),
            None => return 0.0,
        };
        let union = self.area() + other.area() - inter;
        inter as f32 / union as f32
    }

    /// Fraction of each rectangle covered by the intersection.
    ///
    /// Returns `(inter / self.area(), inter / other.area())`, or zeros if the rectangles do not
    /// overlap.
    pub fn coverage(&self, other: &Rect) -> (f32, f32) {
        match self.intersection(other) {
            Some(inter) => {
                let inter = inter.area() as f32;
                (inter / self.area() as f32, inter / other.area() as f32)
            }
            None => (0.0, 0.0),
        }
    }

    /// The larger of the two coverage ratios: how much the smaller rectangle lies inside the
    /// other.
    pub fn max_coverage(&self, other: &Rect) -> f32 {
        let (a, b) = self.coverage(other);
        a.max(b)
    }

    /// The smaller of the two coverage ratios: how much both rectangles lie inside each other.
    pub fn min_coverage(&self, other: &Rect) -> f32 {
        let (a, b) = self.coverage(other);
        a.min(b)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}
