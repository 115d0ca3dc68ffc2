//! Tracked interest points.

use crate::{
    geom::{self, Point, PointF},
    num::TotalF32,
};

/// A point followed by optical flow, with a relevance weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub position: PointF,
    pub relevance: f32,
}

impl Feature {
    /// Creates a feature with relevance 1.
    pub fn new(position: PointF) -> Self {
        Self {
            position,
            relevance: 1.0,
        }
    }

    /// The pixel this feature lies on.
    pub fn pixel(&self) -> Point {
        geom::round(self.position)
    }
}

/// How a target weighs its features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// Every feature weighs 1.
    Uniform,
    /// Features weigh as much as they moved since the last frame.
    Velocity,
    /// Features weigh as many frames as they have been followed.
    Age,
}

impl Relevance {
    /// Relevance of a feature that moved from `last` to `position`.
    pub fn score(self, last: &Feature, position: PointF) -> f32 {
        match self {
            Relevance::Uniform => 1.0,
            Relevance::Velocity => nalgebra::distance(&last.position, &position),
            Relevance::Age => last.relevance + 1.0,
        }
    }
}

/// Relevance-weighted mean of the feature positions, with weights raised to `power`.
///
/// Falls back to the unweighted mean when all weights are zero. Returns [`None`] for an empty
/// feature set.
pub fn median_point(features: &[Feature], power: i32) -> Option<PointF> {
    if features.is_empty() {
        return None;
    }
    let weighted = |weight: &dyn Fn(&Feature) -> f64| {
        let (mut x, mut y, mut sum) = (0.0f64, 0.0f64, 0.0f64);
        for f in features {
            let w = weight(f);
            x += f64::from(f.position.x) * w;
            y += f64::from(f.position.y) * w;
            sum += w;
        }
        (sum > 0.0).then(|| PointF::new((x / sum) as f32, (y / sum) as f32))
    };
    weighted(&|f| f64::from(f.relevance).powi(power)).or_else(|| weighted(&|_| 1.0))
}

/// Moves the feature farthest from `median` halfway towards it.
pub fn relocate_farthest(features: &mut [Feature], median: PointF) {
    let farthest = features
        .iter_mut()
        .max_by_key(|f| TotalF32(nalgebra::distance(&f.position, &median)));
    if let Some(f) = farthest {
        f.position = geom::extrapolate(f.position, median, 0.5);
    }
}

/// Orders features by 4-distance from `point`, nearest first.
pub fn sort_by_distance(features: &mut [Feature], point: PointF) {
    features.sort_by_key(|f| TotalF32(geom::distance4f(f.position, point)));
}
