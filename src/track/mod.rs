//! Multi-target tracking.
//!
//! Every call to [`Tracker::track`] runs the whole pipeline on one frame:
//!
//! 1. The frame is segmented into a skin confidence mask, and the mask is split into contours.
//! 2. Existing targets are matched to contours through their features.
//! 3. Contours no target claimed spawn new targets; unknown targets are checked for hands and
//!    faces.
//! 4. Optical flow advances the features of every matched target.
//! 5. Failed targets get one recovery attempt, duplicates are merged, and the rest is refined.
//!
//! Targets that cannot be recovered are dropped. A hand or face that shows up again later gets a
//! new [`TargetId`].

mod associate;
pub mod budget;
mod detect;
mod evaluate;
pub mod extract;
pub mod feature;
pub mod flow;
mod follow;
pub mod moments;
mod target;

pub use target::{Snapshot, Target, TargetId, TargetType};

use crate::{
    color::{ColorConverter, StandardConverter},
    contour::{ContourExtractor, Contours, TracingExtractor},
    edge::{EdgeDetector, GradientEdges},
    error::{Error, Result},
    grid::{ColorImage, GrayImage, Mask},
    hand::HandDetector,
    rect::Rect,
    report::{FrameReport, NullReporter, Reporter},
    skin::{ColorPlanes, GrowOptions, RegionGrower, SkinModels, SkinSegmenter},
    timer::Timer,
};

use self::{
    extract::{CascadeDetector, FeatureExtractor, ShiTomasi},
    feature::Feature,
    flow::{LucasKanade, OpticalFlow},
};

/// Thresholds that decide when two targets on the same contour are one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeThresholds {
    /// An unknown target is dropped if this much of the smaller ROI lies inside the other one.
    pub one_inside: f32,
    /// Two typed targets are merged if this much of each ROI lies inside the other one...
    pub both_inside: f32,
    /// ...and their median points are closer than this many pixels.
    pub max_distance: f32,
}

impl MergeThresholds {
    pub const DEFAULT_ONE_INSIDE: f32 = 0.7;
    pub const DEFAULT_BOTH_INSIDE: f32 = 0.8;
    pub const DEFAULT_MAX_DISTANCE: f32 = 50.0;
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            one_inside: Self::DEFAULT_ONE_INSIDE,
            both_inside: Self::DEFAULT_BOTH_INSIDE,
            max_distance: Self::DEFAULT_MAX_DISTANCE,
        }
    }
}

/// Tunables of a [`Tracker`].
///
/// The distance thresholds are in pixels and were picked for 640x480 frames.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    roi_padding: i32,
    min_area: usize,
    min_feature_distance: f32,
    relocation_fraction: f32,
    median_power: i32,
    history_len: usize,
    hand_increment: f32,
    face_increment: f32,
    face_penalty: f32,
    face_recovery: f32,
    merge: MergeThresholds,
    detect_hands: bool,
    detect_faces: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            roi_padding: Self::DEFAULT_ROI_PADDING,
            min_area: TracingExtractor::DEFAULT_MIN_AREA,
            min_feature_distance: Self::DEFAULT_MIN_FEATURE_DISTANCE,
            relocation_fraction: Self::DEFAULT_RELOCATION_FRACTION,
            median_power: Self::DEFAULT_MEDIAN_POWER,
            history_len: Self::DEFAULT_HISTORY_LEN,
            hand_increment: Self::DEFAULT_HAND_INCREMENT,
            face_increment: Self::DEFAULT_FACE_INCREMENT,
            face_penalty: Self::DEFAULT_FACE_PENALTY,
            face_recovery: Self::DEFAULT_FACE_RECOVERY,
            merge: MergeThresholds::default(),
            detect_hands: true,
            detect_faces: true,
        }
    }
}

impl TrackerOptions {
    pub const DEFAULT_ROI_PADDING: i32 = 20;
    pub const DEFAULT_MIN_FEATURE_DISTANCE: f32 = 10.0;
    pub const DEFAULT_RELOCATION_FRACTION: f32 = 0.05;
    pub const DEFAULT_MEDIAN_POWER: i32 = 1;
    pub const DEFAULT_HISTORY_LEN: usize = 200;
    pub const DEFAULT_HAND_INCREMENT: f32 = 0.51;
    pub const DEFAULT_FACE_INCREMENT: f32 = 0.34;
    pub const DEFAULT_FACE_PENALTY: f32 = 1.0;
    pub const DEFAULT_FACE_RECOVERY: f32 = 0.05;

    /// Sets the number of pixels added around feature bounds and new contours.
    pub fn roi_padding(mut self, padding: i32) -> Self {
        self.roi_padding = padding;
        self
    }

    /// Sets the number of pixels a region needs to become a contour.
    pub fn min_area(mut self, min_area: usize) -> Self {
        self.min_area = min_area;
        self
    }

    /// Sets the 4-distance below which the earlier of two features is dropped.
    pub fn min_feature_distance(mut self, distance: f32) -> Self {
        self.min_feature_distance = distance;
        self
    }

    /// Sets the fraction of features pulled towards the median every frame.
    pub fn relocation_fraction(mut self, fraction: f32) -> Self {
        self.relocation_fraction = fraction;
        self
    }

    /// Sets the power relevance weights are raised to when computing the median point.
    pub fn median_power(mut self, power: i32) -> Self {
        self.median_power = power;
        self
    }

    /// Sets the number of past frames every target remembers.
    pub fn history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// Sets the hand probability added per detected hand.
    pub fn hand_increment(mut self, increment: f32) -> Self {
        self.hand_increment = increment;
        self
    }

    /// Sets the face probability added per frame with a detected face.
    pub fn face_increment(mut self, increment: f32) -> Self {
        self.face_increment = increment;
        self
    }

    /// Sets the growth of the face penalty per frame without a detected face.
    pub fn face_penalty(mut self, penalty: f32) -> Self {
        self.face_penalty = penalty;
        self
    }

    /// Sets how much a negative face probability recovers per frame.
    pub fn face_recovery(mut self, recovery: f32) -> Self {
        self.face_recovery = recovery;
        self
    }

    pub fn merge(mut self, thresholds: MergeThresholds) -> Self {
        self.merge = thresholds;
        self
    }

    pub fn detect_hands(mut self, detect: bool) -> Self {
        self.detect_hands = detect;
        self
    }

    /// Enables face detection. Has no effect unless a [`CascadeDetector`] is installed.
    pub fn detect_faces(mut self, detect: bool) -> Self {
        self.detect_faces = detect;
        self
    }

    fn validate(&self) -> Result<()> {
        let fraction = |v: f32| (0.0..=1.0).contains(&v);
        if self.roi_padding < 0 {
            return Err(Error::InvalidParameter("ROI padding must not be negative"));
        }
        if self.history_len == 0 {
            return Err(Error::InvalidParameter("history length must be at least 1"));
        }
        if !fraction(self.relocation_fraction) {
            return Err(Error::InvalidParameter("relocation fraction must be in 0..=1"));
        }
        if !fraction(self.merge.one_inside) || !fraction(self.merge.both_inside) {
            return Err(Error::InvalidParameter("merge overlaps must be in 0..=1"));
        }
        if self.min_feature_distance < 0.0 || self.merge.max_distance < 0.0 {
            return Err(Error::InvalidParameter("distances must not be negative"));
        }
        Ok(())
    }
}

/// Inputs shared by the pipeline stages of one frame.
struct Frame<'a> {
    gray: &'a GrayImage,
    contours: &'a Contours,
    options: &'a TrackerOptions,
    extractor: &'a dyn FeatureExtractor,
}

impl Frame<'_> {
    fn size(&self) -> (usize, usize) {
        self.gray.size()
    }

    /// Tops up a target's features to its budget with points from its region inside `roi`.
    fn complement(&self, target: &mut Target, roi: Rect) {
        let Some(index) = target.contour else { return };
        let missing = target.max_features.saturating_sub(target.features.len());
        if missing == 0 {
            return;
        }
        let mask = self.contours.region_mask(index);
        let points = self.extractor.extract(self.gray, &mask, roi, missing);
        target.features.extend(points.into_iter().map(Feature::new));
    }
}

/// Tracks hands, faces and other skin regions across the frames of a video.
pub struct Tracker {
    models: SkinModels,
    options: TrackerOptions,
    converter: Box<dyn ColorConverter>,
    segmenter: Box<dyn SkinSegmenter>,
    edges: Box<dyn EdgeDetector>,
    contour_extractor: Box<dyn ContourExtractor>,
    hands: HandDetector,
    flow: Box<dyn OpticalFlow>,
    extractor: Box<dyn FeatureExtractor>,
    cascade: Option<Box<dyn CascadeDetector>>,
    reporter: Box<dyn Reporter>,

    targets: Vec<Target>,
    next_id: u64,
    frame_index: u64,
    last_gray: Option<GrayImage>,
    mask: Mask,
    contours: Contours,

    t_segment: Timer,
    t_label: Timer,
    t_detect: Timer,
    t_follow: Timer,
    t_evaluate: Timer,
}

impl Tracker {
    /// Creates a tracker with the default options.
    pub fn new(models: SkinModels) -> Self {
        let options = TrackerOptions::default();
        let mut extractor = TracingExtractor::new();
        extractor.set_min_area(options.min_area);
        Self {
            models,
            options,
            converter: Box::new(StandardConverter),
            segmenter: Box::new(RegionGrower::new(GrowOptions::default())),
            edges: Box::new(GradientEdges::new()),
            contour_extractor: Box::new(extractor),
            hands: HandDetector::new(),
            flow: Box::new(LucasKanade::new()),
            extractor: Box::new(ShiTomasi::new()),
            cascade: None,
            reporter: Box::new(NullReporter),
            targets: Vec::new(),
            next_id: 0,
            frame_index: 0,
            last_gray: None,
            mask: Mask::new(0, 0),
            contours: Contours::empty(0, 0),
            t_segment: Timer::new("segment"),
            t_label: Timer::new("label"),
            t_detect: Timer::new("detect"),
            t_follow: Timer::new("follow"),
            t_evaluate: Timer::new("evaluate"),
        }
    }

    /// Creates a tracker with custom options.
    ///
    /// Returns [`Error::InvalidParameter`] if an option is out of range.
    pub fn with_options(models: SkinModels, options: TrackerOptions) -> Result<Self> {
        options.validate()?;
        let mut tracker = Self::new(models);
        let mut extractor = TracingExtractor::new();
        extractor.set_min_area(options.min_area);
        tracker.contour_extractor = Box::new(extractor);
        tracker.options = options;
        Ok(tracker)
    }

    pub fn set_converter<C: ColorConverter + 'static>(&mut self, converter: C) {
        self.converter = Box::new(converter);
    }

    pub fn set_segmenter<S: SkinSegmenter + 'static>(&mut self, segmenter: S) {
        self.segmenter = Box::new(segmenter);
    }

    pub fn set_edge_detector<E: EdgeDetector + 'static>(&mut self, edges: E) {
        self.edges = Box::new(edges);
    }

    pub fn set_contour_extractor<E: ContourExtractor + 'static>(&mut self, extractor: E) {
        self.contour_extractor = Box::new(extractor);
    }

    pub fn set_optical_flow<F: OpticalFlow + 'static>(&mut self, flow: F) {
        self.flow = Box::new(flow);
    }

    pub fn set_feature_extractor<F: FeatureExtractor + 'static>(&mut self, extractor: F) {
        self.extractor = Box::new(extractor);
    }

    /// Installs the detector used to recognize faces on unknown targets.
    pub fn set_cascade<C: CascadeDetector + 'static>(&mut self, cascade: C) {
        self.cascade = Some(Box::new(cascade));
    }

    pub fn set_reporter<R: Reporter + 'static>(&mut self, reporter: R) {
        self.reporter = Box::new(reporter);
    }

    pub fn hand_detector_mut(&mut self) -> &mut HandDetector {
        &mut self.hands
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn models(&self) -> &SkinModels {
        &self.models
    }

    /// Gives access to the skin models, eg. to adapt them with [`SkinModels::update`] between
    /// frames.
    pub fn models_mut(&mut self) -> &mut SkinModels {
        &mut self.models
    }

    /// The targets after the last call to [`Tracker::track`].
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The skin mask of the last frame.
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// The contours of the last frame.
    pub fn contours(&self) -> &Contours {
        &self.contours
    }

    /// Stage timers, for use with [`FpsCounter::tick_with`](crate::timer::FpsCounter::tick_with).
    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [
            &self.t_segment,
            &self.t_label,
            &self.t_detect,
            &self.t_follow,
            &self.t_evaluate,
        ]
    }

    /// Forgets all targets and the previous frame.
    pub fn reset(&mut self) {
        self.targets.clear();
        self.last_gray = None;
    }

    /// Runs the pipeline on the next frame and returns the targets found in it.
    pub fn track(&mut self, frame: &ColorImage) -> &[Target] {
        let gray = self.converter.gray(frame);
        let resized = self
            .last_gray
            .as_ref()
            .map_or(false, |last| !last.same_size(&gray));
        if resized {
            log::debug!(
                "frame size changed to {:?}, dropping {} targets",
                gray.size(),
                self.targets.len()
            );
            self.reset();
        }

        self.t_segment.time(|| {
            let planes = ColorPlanes::convert(&*self.converter, frame);
            let edges = self.edges.detect(&gray);
            self.mask = self.segmenter.segment(&self.models, &planes, &edges);
        });

        let claimed = self.t_label.time(|| {
            self.contours = self.contour_extractor.extract(&self.mask);
            associate::associate(&mut self.targets, &self.contours)
        });

        let ctx = Frame {
            gray: &gray,
            contours: &self.contours,
            options: &self.options,
            extractor: &*self.extractor,
        };

        self.t_detect.time(|| {
            detect::classify(&mut self.targets, &ctx, &self.hands, self.cascade.as_deref());
            detect::spawn(
                &mut self.targets,
                &claimed,
                &ctx,
                &self.hands,
                &mut self.next_id,
            );
        });

        if let Some(prev) = &self.last_gray {
            self.t_follow
                .time(|| follow::follow_all(&mut self.targets, &ctx, prev, &*self.flow));
        }

        self.t_evaluate
            .time(|| evaluate::evaluate(&mut self.targets, &ctx));

        let (width, height) = gray.size();
        for target in &mut self.targets {
            normalize(target, width, height);
        }

        log::debug!(
            "frame {}: {} contours, {} targets",
            self.frame_index,
            self.contours.len(),
            self.targets.len()
        );
        self.reporter.report(&FrameReport {
            frame_index: self.frame_index,
            mask: &self.mask,
            contours: &self.contours,
            targets: &self.targets,
        });

        self.frame_index += 1;
        self.last_gray = Some(gray);
        &self.targets
    }
}

/// Computes the frame-relative position and scale of a target.
fn normalize(target: &mut Target, width: usize, height: usize) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    target.position = crate::geom::PointF::new(target.mid.x / w - 0.5, target.mid.y / h - 0.5);
    let side = target.roi.width().min(target.roi.height()) as f32;
    target.scale = side / w.min(h);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{edge::NoEdges, geom::PointF, test};

    fn tracker(options: TrackerOptions) -> Tracker {
        let mut tracker = Tracker::with_options(test::skin_models().clone(), options).unwrap();
        tracker.set_converter(test::TestConverter);
        tracker.set_edge_detector(NoEdges);
        tracker
    }

    fn skin_frame(blobs: &[(usize, usize, usize, usize)]) -> ColorImage {
        test::paint(&test::blobs(100, 80, blobs), test::SKIN)
    }

    #[test]
    fn options_are_validated() {
        let models = test::skin_models().clone();
        let err = Tracker::with_options(models.clone(), TrackerOptions::default().history_len(0))
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(Tracker::with_options(
            models.clone(),
            TrackerOptions::default().relocation_fraction(1.5)
        )
        .is_err());
        assert!(Tracker::with_options(models, TrackerOptions::default().roi_padding(-1)).is_err());
    }

    #[test]
    fn two_blobs_two_targets() {
        let mut tracker = tracker(TrackerOptions::default().min_area(20));
        // two 50 pixel blobs
        let targets = tracker.track(&skin_frame(&[(10, 10, 10, 5), (60, 50, 5, 10)]));
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.kind() == TargetType::Unknown));
        assert!(targets.iter().all(|t| t.succeeded()));
        assert_ne!(targets[0].id(), targets[1].id());
        assert_eq!(tracker.contours().len(), 2);
        assert_eq!(tracker.mask().count_nonzero(), 100);
    }

    #[test]
    fn small_regions_are_ignored() {
        let mut tracker = tracker(TrackerOptions::default());
        assert!(tracker.track(&skin_frame(&[(10, 10, 10, 5)])).is_empty());
        assert!(tracker.track(&skin_frame(&[])).is_empty());
    }

    #[test]
    fn identity_persists_while_moving() {
        let mut tracker = tracker(TrackerOptions::default());
        let first = tracker.track(&skin_frame(&[(20, 20, 40, 30)]));
        assert_eq!(first.len(), 1);
        let id = first[0].id();

        let second = tracker.track(&skin_frame(&[(22, 21, 40, 30)]));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id(), id);
        assert!(second[0].succeeded());
        assert_eq!(second[0].history().count(), 1);
        assert!(!second[0].features().is_empty());

        // the region vanishes: nothing to recover from
        assert!(tracker.track(&skin_frame(&[])).is_empty());

        // and reappears under a new identity
        let third = tracker.track(&skin_frame(&[(22, 21, 40, 30)]));
        assert_eq!(third.len(), 1);
        assert_ne!(third[0].id(), id);
    }

    #[test]
    fn normalized_output() {
        let mut target = Target::new(TargetId(0), Rect::from_top_left(0, 0, 20, 40), 1);
        target.mid = PointF::new(50.0, 20.0);
        normalize(&mut target, 100, 80);
        assert_relative_eq!(target.position(), PointF::new(0.0, -0.25));
        assert_relative_eq!(target.scale(), 0.25);
    }

    #[test]
    fn size_change_resets() {
        let mut tracker = tracker(TrackerOptions::default());
        assert_eq!(tracker.track(&skin_frame(&[(20, 20, 40, 30)])).len(), 1);
        let small = test::paint(&test::blobs(50, 40, &[]), test::SKIN);
        assert!(tracker.track(&small).is_empty());
        assert_eq!(tracker.timers().into_iter().count(), 5);
    }
}
