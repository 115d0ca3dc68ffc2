//! Properties of labeling and contour extraction on random masks.

use skintrack::{
    contour::{ContourExtractor, TracingExtractor},
    geom::Point,
    grid::Mask,
    label::RunLabeler,
};

fn random_mask(rng: &mut fastrand::Rng) -> Mask {
    let (w, h) = (rng.usize(1..50), rng.usize(1..50));
    let density = rng.u8(40..220);
    Mask::from_fn(w, h, |_, _| if rng.u8(..) < density { 255 } else { 0 })
}

#[test]
fn small_component_removal() {
    let mut rng = fastrand::Rng::with_seed(77);
    let mut labeler = RunLabeler::new();
    for round in 0..200 {
        let mut mask = random_mask(&mut rng);
        let min_size = rng.usize(1..12);
        let before = labeler.label(&mask);

        let removed = labeler.remove_small_components(&mut mask, min_size);
        let after = labeler.label(&mask);

        assert_eq!(after.count() + removed, before.count(), "round {round}");
        assert!(after.sizes().iter().all(|&s| s >= min_size), "round {round}");
    }
}

#[test]
fn contours_cover_their_regions() {
    let mut rng = fastrand::Rng::with_seed(4242);
    let mut labeler = RunLabeler::new();
    for round in 0..200 {
        let mask = random_mask(&mut rng);
        let min_area = rng.usize(1..20);
        let mut extractor = TracingExtractor::new();
        extractor.set_min_area(min_area);
        let contours = extractor.extract(&mask);

        let expected = labeler
            .label(&mask)
            .sizes()
            .into_iter()
            .filter(|&s| s >= min_area)
            .count();
        assert_eq!(contours.len(), expected, "round {round}");

        for (i, contour) in contours.contours.iter().enumerate() {
            assert_eq!(contour.area, contour.pixels.len());
            assert!(!contour.points.is_empty());
            for &p in &contour.points {
                assert!(contour.bounds.contains_point(p), "round {round}");
                assert_eq!(contours.id_at(p), Some(i), "round {round}");
            }
            for &index in &contour.pixels {
                let (x, y) = mask.coords(index);
                assert!(contours.region_contains(i, Point::new(x as i32, y as i32)));
            }
        }
    }
}
