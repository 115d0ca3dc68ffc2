//! Points and distances.

use nalgebra::{Point2, Vector2};

/// An integer pixel position, as found on contours.
pub type Point = Point2<i32>;

/// A sub-pixel position, as produced by optical flow.
pub type PointF = Point2<f32>;

/// City-block (4-connectivity) distance.
#[inline]
pub fn distance4(a: Point, b: Point) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// City-block (4-connectivity) distance between sub-pixel positions.
#[inline]
pub fn distance4f(a: PointF, b: PointF) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

#[inline]
pub fn distance(a: Point, b: Point) -> f32 {
    nalgebra::distance(&to_f32(a), &to_f32(b))
}

#[inline]
pub fn to_f32(p: Point) -> PointF {
    PointF::new(p.x as f32, p.y as f32)
}

/// Rounds a sub-pixel position to the nearest pixel.
#[inline]
pub fn round(p: PointF) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

/// Cosine of the angle at `b` subtended by `a` and `c`.
///
/// Returns [`None`] if `b` coincides with `a` or `c`.
pub fn cosine(a: Point, b: Point, c: Point) -> Option<f32> {
    let v1 = vector(a, b);
    let v2 = vector(c, b);
    let norms = v1.norm() * v2.norm();
    (norms > 0.0).then(|| v1.dot(&v2) / norms)
}

/// Signed turn of the polyline `a -> b -> c`, as the z component of `(b - a) x (b - c)`.
pub fn turn(a: Point, b: Point, c: Point) -> f32 {
    let v1 = vector(a, b);
    let v2 = vector(c, b);
    v1.x * v2.y - v1.y * v2.x
}

fn vector(from: Point, to: Point) -> Vector2<f32> {
    Vector2::new((to.x - from.x) as f32, (to.y - from.y) as f32)
}

/// Moves `t` times the distance from `from` towards `through`, starting at `from`.
///
/// `t = 0.5` yields the midpoint; `t > 1` extrapolates past `through`.
pub fn extrapolate(from: PointF, through: PointF, t: f32) -> PointF {
    from + (through - from) * t
}
