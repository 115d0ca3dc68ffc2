//! Spawning targets on new regions and classifying unknown ones.

use crate::hand::HandDetector;

use super::{
    extract::CascadeDetector,
    feature,
    target::{Target, TargetId, TargetType},
    Frame,
};

/// Looks for hands and faces on the regions of associated [`TargetType::Unknown`] targets.
pub(super) fn classify(
    targets: &mut [Target],
    frame: &Frame<'_>,
    hands: &HandDetector,
    cascade: Option<&dyn CascadeDetector>,
) {
    let (width, height) = frame.size();
    let options = frame.options;
    for target in targets.iter_mut() {
        let Some(index) = target.contour else { continue };
        if target.kind != TargetType::Unknown {
            continue;
        }
        let Some(contour) = frame.contours.get(index) else { continue };

        if options.detect_hands {
            let found = hands.detect(&contour.points);
            for hand in &found {
                target.increase_hand_probability(options.hand_increment);
                target.roi = hand.rect().limit(width, height);
                target.mid = hand.palm();
            }
            if !found.is_empty() {
                log::trace!(
                    "target {}: {} hands, p(hand) = {}",
                    target.id,
                    found.len(),
                    target.hand_probability()
                );
                continue;
            }
        }

        let Some(cascade) = cascade.filter(|_| options.detect_faces) else { continue };
        if target.face_probability() >= 0.0 {
            let region = contour.bounds.pad(options.roi_padding).limit(width, height);
            let faces = cascade.detect(&frame.gray.crop(region));
            match faces.first() {
                Some(face) => {
                    target.increase_face_probability(options.face_increment);
                    target.roi = face.move_by(region.x(), region.y()).limit(width, height);
                }
                None => target.decrease_face_probability(options.face_penalty),
            }
            log::trace!("target {}: p(face) = {}", target.id, target.face_probability());
        } else {
            target.increase_face_probability(options.face_recovery);
        }
    }
}

/// Creates a new target for every contour no existing target claimed.
pub(super) fn spawn(
    targets: &mut Vec<Target>,
    claimed: &[bool],
    frame: &Frame<'_>,
    hands: &HandDetector,
    next_id: &mut u64,
) {
    let (width, height) = frame.size();
    let options = frame.options;
    for (index, contour) in frame.contours.contours.iter().enumerate() {
        if claimed.get(index).copied().unwrap_or(false) {
            continue;
        }

        let id = TargetId(*next_id);
        *next_id += 1;
        let roi = contour.bounds.pad(options.roi_padding).limit(width, height);
        let mut target = Target::new(id, roi, options.history_len);
        target.contour = Some(index);
        target.outline = contour.points.clone();

        if options.detect_hands {
            for hand in hands.detect(&contour.points) {
                target.increase_hand_probability(options.hand_increment);
                target.roi = hand.rect();
                target.mid = hand.palm();
            }
        }
        target.roi = target.roi.limit(width, height);

        let roi = target.roi;
        frame.complement(&mut target, roi);
        target.median = feature::median_point(&target.features, options.median_power)
            .unwrap_or_else(|| target.roi.center());
        target.succeeded = true;

        log::trace!(
            "new target {id} on contour {index} with {} features",
            target.features.len()
        );
        targets.push(target);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        contour::{ContourExtractor, Contours, TracingExtractor},
        geom::Point,
        grid::GrayImage,
        rect::Rect,
        test,
        track::{extract::ShiTomasi, TrackerOptions},
    };

    struct FixedFaces(Vec<Rect>);

    impl CascadeDetector for FixedFaces {
        fn detect(&self, _: &GrayImage) -> Vec<Rect> {
            self.0.clone()
        }
    }

    struct Scene {
        gray: GrayImage,
        contours: Contours,
        options: TrackerOptions,
        extractor: ShiTomasi,
    }

    impl Scene {
        fn new() -> Self {
            let mask = test::blobs(120, 80, &[(10, 10, 40, 40), (70, 20, 30, 30)]);
            Self {
                gray: mask.map(|&m| if m != 0 { 200 } else { 30 }),
                contours: TracingExtractor::new().extract(&mask),
                options: TrackerOptions::default(),
                extractor: ShiTomasi::new(),
            }
        }

        fn frame(&self) -> Frame<'_> {
            Frame {
                gray: &self.gray,
                contours: &self.contours,
                options: &self.options,
                extractor: &self.extractor,
            }
        }
    }

    #[test]
    fn spawns_on_unclaimed_contours() {
        let scene = Scene::new();
        let frame = scene.frame();
        let left = frame.contours.id_at(Point::new(20, 20)).unwrap();
        let right = frame.contours.id_at(Point::new(80, 30)).unwrap();
        let mut claimed = vec![false; 2];
        claimed[left] = true;

        let mut targets = Vec::new();
        let mut next_id = 4;
        spawn(&mut targets, &claimed, &frame, &HandDetector::new(), &mut next_id);

        assert_eq!(next_id, 5);
        assert_eq!(targets.len(), 1);
        let target = &targets[0];
        assert_eq!(target.id(), TargetId(4));
        assert_eq!(target.kind(), TargetType::Unknown);
        assert_eq!(target.contour(), Some(right));
        assert_eq!(target.roi(), Rect::from_top_left(50, 0, 70, 70));
        assert!(target.succeeded());
        assert!(!target.features().is_empty());
        assert!(target.features().len() <= target.max_features());
        assert!(target
            .features()
            .iter()
            .all(|f| frame.contours.region_contains(right, f.pixel())));
        assert!(Rect::from_top_left(70, 20, 30, 30).contains_point_f32(target.median()));
    }

    fn unknown_on(frame: &Frame<'_>, p: Point) -> Target {
        let index = frame.contours.id_at(p).unwrap();
        let contour = frame.contours.get(index).unwrap();
        let mut target = Target::new(TargetId(0), contour.bounds, 10);
        target.contour = Some(index);
        target
    }

    #[test]
    fn faces_need_a_cascade() {
        let scene = Scene::new();
        let frame = scene.frame();
        let mut targets = vec![unknown_on(&frame, Point::new(80, 30))];
        let hands = HandDetector::new();

        classify(&mut targets, &frame, &hands, None);
        assert_eq!(targets[0].face_probability(), 0.0);

        let faces = FixedFaces(vec![Rect::from_top_left(5, 5, 20, 20)]);
        classify(&mut targets, &frame, &hands, Some(&faces));
        assert_relative_eq!(targets[0].face_probability(), 0.34);
        // relative to the padded contour bounds at (50, 0)
        assert_eq!(targets[0].roi(), Rect::from_top_left(55, 5, 20, 20));

        classify(&mut targets, &frame, &hands, Some(&faces));
        classify(&mut targets, &frame, &hands, Some(&faces));
        assert_eq!(targets[0].kind(), TargetType::Face);
        assert_eq!(targets[0].face_probability(), 1.0);
    }

    #[test]
    fn missed_faces_are_penalized() {
        let scene = Scene::new();
        let frame = scene.frame();
        let mut targets = vec![unknown_on(&frame, Point::new(20, 20))];
        let hands = HandDetector::new();
        let nothing = FixedFaces(Vec::new());

        classify(&mut targets, &frame, &hands, Some(&nothing));
        assert_relative_eq!(targets[0].face_probability(), -1.0);
        // no detection while negative; the probability recovers instead
        classify(&mut targets, &frame, &hands, Some(&nothing));
        assert_relative_eq!(targets[0].face_probability(), -0.95);
        assert_eq!(targets[0].kind(), TargetType::Unknown);

        // unassociated targets are left alone
        targets[0].contour = None;
        classify(&mut targets, &frame, &hands, Some(&nothing));
        assert_relative_eq!(targets[0].face_probability(), -0.95);
    }
}
