//! Region boundaries.

use crate::{
    geom::Point,
    grid::{Grid, Mask},
    label::RunLabeler,
    rect::Rect,
};

/// Clockwise Moore neighborhood, starting east (y points down).
const MOORE: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const WEST: usize = 4;

/// The outer boundary of one connected skin region.
#[derive(Debug, Clone)]
pub struct Contour {
    /// Boundary pixels in clockwise order. The first point is not repeated at the end.
    pub points: Vec<Point>,
    /// Number of pixels in the region.
    pub area: usize,
    /// Bounding box of the region.
    pub bounds: Rect,
    /// Linear indices of the region's pixels.
    pub pixels: Vec<usize>,
}

impl Contour {
    /// Number of boundary points.
    pub fn perimeter(&self) -> usize {
        self.points.len()
    }
}

/// The contours found in one frame, plus a map from pixels to the region they belong to.
#[derive(Debug, Clone)]
pub struct Contours {
    pub contours: Vec<Contour>,
    /// `i + 1` for pixels of contour `i`, `0` elsewhere.
    pub map: Grid<u32>,
}

impl Contours {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            contours: Vec::new(),
            map: Grid::new(width, height),
        }
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Contour> {
        self.contours.get(index)
    }

    /// Index of the contour whose region contains `p`.
    pub fn id_at(&self, p: Point) -> Option<usize> {
        match self.map.at(p) {
            Some(&id) if id != 0 => Some(id as usize - 1),
            _ => None,
        }
    }

    /// Returns whether `p` lies in the region of contour `index`.
    pub fn region_contains(&self, index: usize, p: Point) -> bool {
        self.id_at(p) == Some(index)
    }

    /// A mask with 255 on the pixels of contour `index`'s region.
    ///
    /// Returns an empty mask for an unknown index.
    pub fn region_mask(&self, index: usize) -> Mask {
        let mut mask = Mask::new(self.map.width(), self.map.height());
        if let Some(contour) = self.contours.get(index) {
            for &i in &contour.pixels {
                mask[i] = 255;
            }
        }
        mask
    }
}

/// Splits a mask into regions and traces their boundaries.
pub trait ContourExtractor {
    fn extract(&mut self, mask: &Mask) -> Contours;
}

/// Labels the mask with a [`RunLabeler`] and traces every sufficiently large component with
/// Moore-neighbor tracing.
#[derive(Debug)]
pub struct TracingExtractor {
    min_area: usize,
    labeler: RunLabeler,
}

impl Default for TracingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingExtractor {
    pub const DEFAULT_MIN_AREA: usize = 400;

    pub fn new() -> Self {
        Self {
            min_area: Self::DEFAULT_MIN_AREA,
            labeler: RunLabeler::new(),
        }
    }

    /// Sets the minimum number of pixels a region needs to be kept.
    pub fn set_min_area(&mut self, min_area: usize) {
        self.min_area = min_area;
    }

    pub fn min_area(&self) -> usize {
        self.min_area
    }
}

impl ContourExtractor for TracingExtractor {
    fn extract(&mut self, mask: &Mask) -> Contours {
        let labeling = self.labeler.label(mask);
        let mut out = Contours::empty(mask.width(), mask.height());

        for (i, pixels) in labeling.components.into_iter().enumerate() {
            if pixels.len() < self.min_area {
                continue;
            }
            let id = i as u32 + 1;
            let points = trace(&labeling.labels, id, pixels[0]);
            let bounds = Rect::bounding(pixels.iter().map(|&p| {
                let (x, y) = mask.coords(p);
                Point::new(x as i32, y as i32)
            }))
            .unwrap_or_default();

            let index = out.contours.len() as u32 + 1;
            for &p in &pixels {
                out.map[p] = index;
            }
            out.contours.push(Contour {
                points,
                area: pixels.len(),
                bounds,
                pixels,
            });
        }

        log::trace!(
            "extracted {} contours (min area {})",
            out.len(),
            self.min_area
        );
        out
    }
}

/// Traces the outer boundary of component `id`, starting at its first pixel in scan order.
fn trace(labels: &Grid<u32>, id: u32, first: usize) -> Vec<Point> {
    let (x, y) = labels.coords(first);
    let start = Point::new(x as i32, y as i32);
    let inside = |p: Point| labels.at(p) == Some(&id);

    let mut points = vec![start];
    let mut current = start;
    // the west neighbor of the first pixel in scan order is background
    let mut backtrack = WEST;
    let mut first_move = None;
    let max_steps = 4 * labels.len() + 8;

    for _ in 0..max_steps {
        let step = (1..=8)
            .map(|k| (backtrack + k) % 8)
            .find(|&d| inside(offset(current, d)));
        let Some(d) = step else {
            // isolated pixel
            break;
        };

        if current == start {
            match first_move {
                None => first_move = Some(d),
                Some(f) if f == d => break,
                Some(_) => {}
            }
        }

        current = offset(current, d);
        backtrack = (d + 6 - (d & 1)) % 8;
        if current != start {
            points.push(current);
        }
    }
    points
}

fn offset(p: Point, direction: usize) -> Point {
    let (dx, dy) = MOORE[direction];
    Point::new(p.x + dx, p.y + dy)
}
