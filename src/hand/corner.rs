//! Curvature corners along a closed contour and their grouping into fingertip and valley
//! candidates.

use crate::geom::{self, Point};

use super::DetectionParams;

/// Maximum 4-distance between consecutive corners of one group.
const ADJACENT: u32 = 2;

/// A contour point with high curvature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub point: Point,
    /// Cosine of the sharpest angle found at this point. `1` is a contour folding back onto itself.
    pub cosine: f32,
    /// `1` if the contour turns outward (convex) at this point, `-1` if it turns inward.
    pub direction: i32,
}

/// A group of corners reduced to a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupedCorner {
    /// Mean position of the group's corners.
    pub point: Point,
    /// `1` if all corners of the group are convex, `-1` if all are concave, `0` if they disagree.
    pub direction: i32,
}

/// An inclusive, possibly wrapping range of indices into a cyclic list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn single(i: usize) -> Self {
        Self { start: i, end: i }
    }

    fn len(&self, cycle: usize) -> usize {
        if self.end < self.start {
            self.end + cycle - self.start + 1
        } else {
            self.end - self.start + 1
        }
    }

    fn indices(self, cycle: usize) -> impl Iterator<Item = usize> {
        (self.start..self.start + self.len(cycle)).map(move |i| i % cycle)
    }
}

/// Finds every contour point whose sharpest angle exceeds `min_cosine`.
///
/// For point `i`, the angle is measured between the points `distance` steps before and after it,
/// for each of the given distances, and the sharpest one is kept.
pub fn find_corners(contour: &[Point], distances: &[usize], min_cosine: f32) -> Vec<Corner> {
    let n = contour.len();
    if n == 0 {
        return Vec::new();
    }
    let orientation = orientation(contour);

    let mut corners = Vec::new();
    for (i, &b) in contour.iter().enumerate() {
        let mut best: Option<Corner> = None;
        for &d in distances {
            let d = d % n;
            let a = contour[(i + n - d) % n];
            let c = contour[(i + d) % n];
            let Some(cosine) = geom::cosine(a, b, c) else { continue };
            if best.map_or(true, |best| cosine > best.cosine) {
                let convex = geom::turn(a, b, c) * orientation < 0.0;
                best = Some(Corner {
                    point: b,
                    cosine,
                    direction: if convex { 1 } else { -1 },
                });
            }
        }
        if let Some(corner) = best.filter(|c| c.cosine > min_cosine) {
            corners.push(corner);
        }
    }
    corners
}

/// Sign of the contour's shoelace area: positive if it runs clockwise on screen.
fn orientation(contour: &[Point]) -> f32 {
    let twice_area: i64 = contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(p, q)| i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y))
        .sum();
    if twice_area >= 0 {
        1.0
    } else {
        -1.0
    }
}

/// Groups runs of adjacent corners, dropping groups outside `min_size..=max_size`.
fn group_corners(corners: &[Corner], min_size: usize, max_size: usize) -> Vec<Span> {
    let mut groups: Vec<Span> = Vec::new();
    let mut last: Option<Point> = None;
    for (i, corner) in corners.iter().enumerate() {
        match (last, groups.last_mut()) {
            (Some(p), Some(group)) if geom::distance4(p, corner.point) <= ADJACENT => {
                group.end = i;
            }
            _ => groups.push(Span::single(i)),
        }
        last = Some(corner.point);
    }

    // the contour is closed, so the last group may continue into the first one
    if groups.len() >= 2 {
        let (first, last) = (groups[0], groups[groups.len() - 1]);
        if geom::distance4(corners[first.start].point, corners[last.end].point) <= ADJACENT {
            groups[0].start = last.start;
            groups.pop();
        }
    }

    let n = corners.len();
    groups.retain(|g| (min_size..=max_size).contains(&g.len(n)));
    groups
}

/// Groups corner groups that lie within `max_distance` of each other, dropping groups made of
/// fewer than `min_groups` corner groups.
fn group_groups(
    corners: &[Corner],
    groups: &[Span],
    max_distance: u32,
    min_groups: usize,
) -> Vec<Span> {
    let mut great: Vec<Span> = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        let close = i > 0 && {
            let prev = groups[i - 1];
            geom::distance4(corners[prev.end].point, corners[group.start].point) <= max_distance
        };
        match great.last_mut() {
            Some(g) if close => g.end = i,
            _ => great.push(Span::single(i)),
        }
    }

    if great.len() > 1 {
        let (first, last) = (great[0], great[great.len() - 1]);
        let head = corners[groups[first.start].start].point;
        let tail = corners[groups[last.end].end].point;
        if geom::distance4(tail, head) <= max_distance {
            great[0].start = last.start;
            great.pop();
        }
    }

    let n = groups.len();
    great.retain(|g| g.len(n) >= min_groups);
    great
}

fn summarize(corners: &[Corner], group: Span) -> GroupedCorner {
    let n = corners.len();
    let size = group.len(n) as i64;
    let (mut x, mut y, mut votes) = (0i64, 0i64, 0i64);
    for i in group.indices(n) {
        let c = &corners[i];
        x += i64::from(c.point.x);
        y += i64::from(c.point.y);
        votes += if c.direction > 0 { 1 } else { -1 };
    }
    GroupedCorner {
        point: Point::new((x / size) as i32, (y / size) as i32),
        direction: (votes / size) as i32,
    }
}

/// Runs the full corner pipeline on a closed contour.
///
/// Returns one [`GroupedCorner`] per surviving corner group, in contour order.
pub fn extract(contour: &[Point], params: &DetectionParams) -> Vec<GroupedCorner> {
    let corners = find_corners(contour, &params.distances(), params.min_cosine);
    let groups = group_corners(&corners, params.min_group_size, params.max_group_size);
    let great = group_groups(
        &corners,
        &groups,
        params.max_group_distance,
        params.min_groups,
    );

    great
        .into_iter()
        .flat_map(|g| g.indices(groups.len()))
        .map(|i| summarize(&corners, groups[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;

    fn corner(x: i32, y: i32, direction: i32) -> Corner {
        Corner {
            point: Point::new(x, y),
            cosine: 0.5,
            direction,
        }
    }

    #[test]
    fn span_wraps() {
        let span = Span { start: 8, end: 1 };
        assert_eq!(span.len(10), 4);
        assert_eq!(span.indices(10).collect::<Vec<_>>(), [8, 9, 0, 1]);
        assert_eq!(Span::single(3).len(10), 1);
    }

    #[test]
    fn corners_of_a_square() {
        let square = test::polygon_contour(&[(0, 0), (40, 0), (40, 40), (0, 40)], 1);
        // right angles give a cosine of 0, which is not above the threshold
        assert!(find_corners(&square, &[5], 0.0).is_empty());

        let corners = find_corners(&square, &[5], -0.5);
        assert!(corners.iter().all(|c| c.direction == 1));
        assert!(corners.iter().any(|c| c.point == Point::new(40, 40)));
    }

    #[test]
    fn convexity_follows_the_shape() {
        let hand = test::hand_contour(1);
        let reversed = hand.iter().rev().copied().collect::<Vec<_>>();
        let tip = Point::new(50, 0);
        let valley = Point::new(57, 50);
        for contour in [&hand, &reversed] {
            let corners = find_corners(contour, &[20], 0.0);
            let at = |p| corners.iter().find(|c| c.point == p).map(|c| c.direction);
            assert_eq!(at(tip), Some(1));
            assert_eq!(at(valley), Some(-1));
        }
    }

    #[test]
    fn grouping_stitches_wrap_around() {
        let corners = [
            corner(0, 0, 1),
            corner(1, 0, 1),
            corner(10, 0, -1),
            corner(11, 0, -1),
            corner(12, 0, -1),
            corner(0, 2, 1),
        ];
        let groups = group_corners(&corners, 1, 10);
        assert_eq!(
            groups,
            [Span { start: 5, end: 1 }, Span { start: 2, end: 4 }]
        );
        // size bounds apply to the stitched group
        assert!(group_corners(&corners, 1, 2).is_empty());
        assert!(group_corners(&corners, 4, 10).is_empty());

        let summary = summarize(&corners, groups[0]);
        assert_eq!(summary.point, Point::new(0, 0));
        assert_eq!(summary.direction, 1);
    }

    #[test]
    fn mixed_groups_have_no_direction() {
        let corners = [corner(0, 0, 1), corner(1, 0, -1), corner(2, 0, 1)];
        let summary = summarize(&corners, Span { start: 0, end: 2 });
        assert_eq!(summary.direction, 0);
        assert_eq!(summary.point, Point::new(1, 0));
    }

    #[test]
    fn great_groups() {
        let corners = [
            corner(0, 0, 1),
            corner(10, 0, -1),
            corner(20, 0, 1),
            corner(100, 0, 1),
        ];
        let groups = (0..4).map(Span::single).collect::<Vec<_>>();
        let great = group_groups(&corners, &groups, 10, 1);
        assert_eq!(great, [Span { start: 0, end: 2 }, Span::single(3)]);
        assert_eq!(group_groups(&corners, &groups, 10, 2), [Span { start: 0, end: 2 }]);
        // everything is within reach: the last group is stitched onto the first
        let great = group_groups(&corners, &groups, 100, 1);
        assert_eq!(great, [Span { start: 0, end: 3 }]);
    }

    #[test]
    fn finds_fingers_and_valleys() {
        let contour = test::hand_contour(1);
        let params = DetectionParams::from_perimeter(contour.len());
        let corners = extract(&contour, &params);
        let directions = corners.iter().map(|c| c.direction).collect::<Vec<_>>();
        assert_eq!(directions, [1, -1, 1, -1, 1, -1, 1, -1, 1]);
    }

    #[test]
    fn scale_invariance() {
        let count = |scale| {
            let contour = test::hand_contour(scale);
            let params = DetectionParams::from_perimeter(contour.len());
            extract(&contour, &params).len()
        };
        let base = count(1);
        assert_eq!(base, 9);
        assert_eq!(count(2), base);
        assert_eq!(count(3), base);
    }
}
