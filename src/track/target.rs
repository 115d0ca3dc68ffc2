use std::collections::VecDeque;
use std::fmt;

use crate::{
    geom::{Point, PointF},
    rect::Rect,
};

use super::{
    budget,
    feature::{Feature, Relevance},
    moments::Ellipse,
};

/// Unique ID of a [`Target`], issued by the tracker that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(super) u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a target is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Hand,
    Face,
    Body,
    Unknown,
}

impl TargetType {
    /// How features of a target of this type are weighed.
    pub fn relevance(self) -> Relevance {
        match self {
            TargetType::Hand => Relevance::Velocity,
            TargetType::Face => Relevance::Age,
            TargetType::Body | TargetType::Unknown => Relevance::Uniform,
        }
    }
}

/// The state of a target at the end of an earlier frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Number of points on the target's contour, 0 if it had none.
    pub perimeter: usize,
    pub features: Vec<Feature>,
    pub roi: Rect,
    pub median: PointF,
    pub mid: PointF,
    pub succeeded: bool,
}

/// A hand, face or unknown skin region followed across frames.
#[derive(Debug, Clone)]
pub struct Target {
    pub(super) id: TargetId,
    pub(super) kind: TargetType,
    pub(super) roi: Rect,
    /// Index of the matched contour in the current frame.
    pub(super) contour: Option<usize>,
    pub(super) outline: Vec<Point>,
    pub(super) features: Vec<Feature>,
    pub(super) median: PointF,
    pub(super) mid: PointF,
    pub(super) ellipse: Option<Ellipse>,
    hand_probability: f32,
    face_probability: f32,
    hand_decrement: f32,
    face_decrement: f32,
    pub(super) succeeded: bool,
    pub(super) max_features: usize,
    history: VecDeque<Snapshot>,
    history_len: usize,
    pub(super) position: PointF,
    pub(super) scale: f32,
}

impl Target {
    /// Creates an [`TargetType::Unknown`] target around `roi`, with a feature budget derived
    /// from the ROI perimeter.
    pub(super) fn new(id: TargetId, roi: Rect, history_len: usize) -> Self {
        Self {
            id,
            kind: TargetType::Unknown,
            roi,
            contour: None,
            outline: Vec::new(),
            features: Vec::new(),
            median: roi.center(),
            mid: roi.center(),
            ellipse: None,
            hand_probability: 0.0,
            face_probability: 0.0,
            hand_decrement: 0.0,
            face_decrement: 0.0,
            succeeded: false,
            max_features: budget::for_perimeter(roi.perimeter() as f32),
            history: VecDeque::new(),
            history_len,
            position: PointF::origin(),
            scale: 0.0,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn kind(&self) -> TargetType {
        self.kind
    }

    /// Region of interest in frame pixels.
    pub fn roi(&self) -> Rect {
        self.roi
    }

    /// Index of the contour this target was matched to in the last frame.
    pub fn contour(&self) -> Option<usize> {
        self.contour
    }

    /// Copy of the matched contour's points.
    pub fn outline(&self) -> &[Point] {
        &self.outline
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Relevance-weighted mean of the feature positions.
    pub fn median(&self) -> PointF {
        self.median
    }

    /// Mean of the region pixels inside the ROI, or the palm center of a detected hand.
    pub fn mid(&self) -> PointF {
        self.mid
    }

    /// Oriented ellipse of the region, available after a successful frame.
    pub fn ellipse(&self) -> Option<&Ellipse> {
        self.ellipse.as_ref()
    }

    pub fn hand_probability(&self) -> f32 {
        self.hand_probability
    }

    pub fn face_probability(&self) -> f32 {
        self.face_probability
    }

    /// Whether the target was followed or recovered in the last frame.
    ///
    /// The representative points, ROI and ellipse are only meaningful if this is `true`.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Number of features the target tries to keep.
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Mid point in frame-relative coordinates, `(0, 0)` being the frame center.
    pub fn position(&self) -> PointF {
        self.position
    }

    /// Smaller ROI side relative to the smaller frame side.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Earlier states, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.history.iter()
    }

    /// The state at the end of the previous frame.
    pub fn last(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    /// The snapshot `n` frames before [`Target::last`].
    pub fn before_last(&self, n: usize) -> Option<&Snapshot> {
        self.history.len().checked_sub(n + 1).and_then(|i| self.history.get(i))
    }

    /// Features the target ended the previous frame with.
    pub fn last_features(&self) -> &[Feature] {
        self.last().map_or(&[], |s| &s.features)
    }

    /// Adds to the hand probability. Reaching 1 makes this a hand for good.
    pub fn increase_hand_probability(&mut self, increment: f32) {
        self.hand_probability += increment;
        if self.hand_probability >= 1.0 {
            self.kind = TargetType::Hand;
            self.hand_probability = 1.0;
            self.face_probability = 0.0;
        }
    }

    /// Adds to the face probability. Reaching 1 makes this a face for good.
    pub fn increase_face_probability(&mut self, increment: f32) {
        self.face_probability += increment;
        if self.face_probability >= 1.0 {
            self.kind = TargetType::Face;
            self.face_probability = 1.0;
            self.hand_probability = 0.0;
        }
    }

    /// Lowers the hand probability by a penalty that grows with every call.
    pub fn decrease_hand_probability(&mut self, decrement: f32) {
        self.hand_decrement += decrement;
        self.hand_probability -= self.hand_decrement;
    }

    /// Lowers the face probability by a penalty that grows with every call.
    pub fn decrease_face_probability(&mut self, decrement: f32) {
        self.face_decrement += decrement;
        self.face_probability -= self.face_decrement;
    }

    /// Starts a frame in which the target was matched to contour `index`.
    ///
    /// The current state moves into the history and the feature set is emptied; the follower
    /// rebuilds it from [`Target::last_features`].
    pub(super) fn advance(&mut self, index: usize, outline: Vec<Point>, roi: Rect) {
        self.push_snapshot();
        self.contour = Some(index);
        self.outline = outline;
        self.roi = roi;
        self.succeeded = false;
        self.update_budget();
    }

    /// Starts a frame in which no contour was found for the target.
    pub(super) fn advance_unmatched(&mut self) {
        self.push_snapshot();
        self.contour = None;
        self.outline.clear();
        self.succeeded = false;
    }

    fn push_snapshot(&mut self) {
        self.history.push_back(Snapshot {
            perimeter: self.outline.len(),
            features: std::mem::take(&mut self.features),
            roi: self.roi,
            median: self.median,
            mid: self.mid,
            succeeded: self.succeeded,
        });
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
    }

    /// Smooths the contour perimeter over the history and derives the feature budget from it.
    fn update_budget(&mut self) {
        let perimeters = self
            .history
            .iter()
            .map(|s| s.perimeter)
            .chain([self.outline.len()])
            .map(|p| p as f32)
            .collect::<Vec<_>>();
        if let Some(smoothed) = budget::smooth(&perimeters) {
            self.max_features = budget::for_perimeter(smoothed);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn target() -> Target {
        Target::new(TargetId(7), Rect::from_top_left(0, 0, 40, 40), 3)
    }

    fn outline(len: usize) -> Vec<Point> {
        (0..len as i32).map(|i| Point::new(i, 0)).collect()
    }

    #[test]
    fn fresh_target() {
        let t = target();
        assert_eq!(t.id().to_string(), "#7");
        assert_eq!(t.kind(), TargetType::Unknown);
        assert_eq!(t.max_features(), 10);
        assert_eq!(t.median(), PointF::new(20.0, 20.0));
        assert!(t.last().is_none());
        assert!(t.last_features().is_empty());
        assert!(!t.succeeded());
    }

    #[test]
    fn hand_probability_fixes_type() {
        let mut t = target();
        t.increase_face_probability(0.34);
        t.increase_hand_probability(0.51);
        assert_eq!(t.kind(), TargetType::Unknown);
        t.increase_hand_probability(0.51);
        assert_eq!(t.kind(), TargetType::Hand);
        assert_eq!(t.hand_probability(), 1.0);
        assert_eq!(t.face_probability(), 0.0);
    }

    #[test]
    fn decrements_accumulate() {
        let mut t = target();
        t.decrease_face_probability(1.0);
        assert_relative_eq!(t.face_probability(), -1.0);
        t.decrease_face_probability(1.0);
        // second penalty is 2
        assert_relative_eq!(t.face_probability(), -3.0);
        t.increase_face_probability(0.05);
        assert_relative_eq!(t.face_probability(), -2.95);
        assert_eq!(t.kind(), TargetType::Unknown);

        t.decrease_hand_probability(0.5);
        t.decrease_hand_probability(0.5);
        assert_relative_eq!(t.hand_probability(), -1.5);
    }

    #[test]
    fn advancing_keeps_a_capped_history() {
        let mut t = target();
        t.features.push(Feature::new(PointF::new(5.0, 5.0)));
        t.advance(2, outline(320), Rect::from_top_left(1, 1, 30, 30));

        assert_eq!(t.contour(), Some(2));
        assert!(t.features().is_empty());
        assert_eq!(t.last_features().len(), 1);
        assert_eq!(t.last().unwrap().roi, Rect::from_top_left(0, 0, 40, 40));
        // a lone sample is adopted as is
        assert_eq!(t.max_features(), 20);

        for _ in 0..5 {
            t.advance(2, outline(320), t.roi());
        }
        assert_eq!(t.history().count(), 3);
        assert_eq!(t.before_last(1).unwrap().perimeter, 320);
        assert!(t.before_last(3).is_none());
    }

    #[test]
    fn budget_follows_a_damped_perimeter() {
        let mut t = Target::new(TargetId(0), Rect::from_top_left(0, 0, 10, 10), 200);
        for _ in 0..4 {
            t.advance(0, outline(160), t.roi());
        }
        assert_eq!(t.max_features(), 10);
        t.advance(0, outline(320), t.roi());
        let budget = t.max_features();
        assert!(budget > 10 && budget < 20, "{budget}");
    }

    #[test]
    fn unmatched_frames() {
        let mut t = target();
        t.advance(0, outline(160), t.roi());
        t.advance_unmatched();
        assert_eq!(t.contour(), None);
        assert!(t.outline().is_empty());
        assert_eq!(t.last().unwrap().perimeter, 160);
        assert_eq!(t.before_last(1).unwrap().perimeter, 0);
    }

    #[test]
    fn relevance_by_type() {
        assert_eq!(TargetType::Hand.relevance(), Relevance::Velocity);
        assert_eq!(TargetType::Face.relevance(), Relevance::Age);
        assert_eq!(TargetType::Unknown.relevance(), Relevance::Uniform);
    }
}
