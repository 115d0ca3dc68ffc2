//! Synthetic fixtures shared by the unit tests.
//!
//! Frames are encoded as *swatch codes*: the red channel of a pixel selects one of a few fixed
//! colors, which [`TestConverter`] expands into hand-picked HSV, YCrCb and RGB values. The skin
//! models returned by [`skin_models`] are trained so that every swatch gets a known probability
//! under each model.

use std::sync::OnceLock;

use crate::{
    color::{ColorConverter, ColorSpace},
    geom::Point,
    grid::{ColorImage, Grid, GrayImage, Mask},
    skin::{ColorPlanes, ModelKind, SkinHistogram, SkinModels},
};

/// Not skin under any model.
pub const BACKGROUND: u8 = 0;
/// Passes the strict hue and chroma gates.
pub const SKIN: u8 = 1;
/// Passes the relaxed chroma gate only.
pub const GOOD: u8 = 2;
/// Passes the relaxed RGB gate only.
pub const BAD: u8 = 3;
/// Passes the strict chroma gate but fails every hue gate.
pub const CHROMA: u8 = 4;

struct Swatch {
    hsv: [u8; 3],
    ycrcb: [u8; 3],
    rgb: [u8; 3],
    gray: u8,
    /// `(skin, non-skin)` training samples for the hue, chroma and RGB models.
    samples: [(usize, usize); 3],
}

const SWATCHES: [Swatch; 5] = [
    Swatch {
        hsv: [90, 20, 20],
        ycrcb: [20, 100, 160],
        rgb: [20, 20, 20],
        gray: 20,
        samples: [(0, 10), (0, 10), (0, 10)],
    },
    Swatch {
        hsv: [10, 100, 150],
        ycrcb: [120, 160, 100],
        rgb: [200, 150, 120],
        gray: 200,
        samples: [(10, 0), (10, 0), (10, 0)],
    },
    Swatch {
        hsv: [50, 100, 150],
        ycrcb: [120, 140, 120],
        rgb: [100, 200, 100],
        gray: 160,
        samples: [(0, 10), (4, 6), (0, 10)],
    },
    Swatch {
        hsv: [130, 100, 150],
        ycrcb: [120, 120, 140],
        rgb: [60, 60, 200],
        gray: 120,
        samples: [(0, 10), (0, 10), (2, 8)],
    },
    Swatch {
        hsv: [170, 100, 150],
        ycrcb: [120, 170, 90],
        rgb: [180, 140, 110],
        gray: 180,
        samples: [(0, 10), (10, 0), (0, 10)],
    },
];

fn swatch(code: u8) -> &'static Swatch {
    SWATCHES
        .get(usize::from(code))
        .unwrap_or(&SWATCHES[usize::from(BACKGROUND)])
}

/// Expands swatch codes into their fixed color values.
pub struct TestConverter;

impl ColorConverter for TestConverter {
    fn convert(&self, image: &ColorImage, space: ColorSpace) -> ColorImage {
        image.map(|px| {
            let s = swatch(px[0]);
            match space {
                ColorSpace::Hsv => s.hsv,
                ColorSpace::YCrCb => s.ycrcb,
                ColorSpace::Rgb => s.rgb,
            }
        })
    }

    fn gray(&self, image: &ColorImage) -> GrayImage {
        image.map(|px| swatch(px[0]).gray)
    }
}

/// Builds a frame of swatch codes from rows.
pub fn frame(rows: &[&[u8]]) -> ColorImage {
    let width = rows.first().map_or(0, |r| r.len());
    Grid::from_fn(width, rows.len(), |x, y| [rows[y][x], 0, 0])
}

/// Builds a frame of swatch codes and converts it.
pub fn planes(rows: &[&[u8]]) -> ColorPlanes {
    ColorPlanes::convert(&TestConverter, &frame(rows))
}

/// Paints swatch `code` wherever `mask` is nonzero, and [`BACKGROUND`] elsewhere.
pub fn paint(mask: &Mask, code: u8) -> ColorImage {
    mask.map(|&m| if m != 0 { [code, 0, 0] } else { [BACKGROUND, 0, 0] })
}

fn train(kind: ModelKind, axes: &[(usize, usize)]) -> SkinHistogram {
    let mut hist = SkinHistogram::with_axes(axes).unwrap();
    for s in &SWATCHES {
        let color = match kind {
            ModelKind::Hue => s.hsv,
            ModelKind::CrCb => s.ycrcb,
            ModelKind::Rgb => s.rgb,
        };
        let (pos, neg) = s.samples[ModelKind::ALL.iter().position(|&k| k == kind).unwrap()];
        let image = ColorImage::filled(pos + neg, 1, color);
        let mask = Mask::from_fn(pos + neg, 1, |x, _| if x < pos { 255 } else { 0 });
        hist.train(&image, &mask).unwrap();
    }
    hist.normalize();
    hist
}

/// Skin models trained on the swatches.
///
/// Probabilities (percent) per swatch and model:
///
/// | swatch       | hue | chroma | rgb |
/// |--------------|-----|--------|-----|
/// | [`BACKGROUND`] | 0   | 0      | 0   |
/// | [`SKIN`]       | 99  | 99     | 99  |
/// | [`GOOD`]       | 0   | 39     | 0   |
/// | [`BAD`]        | 0   | 0      | 19  |
/// | [`CHROMA`]     | 0   | 99     | 0   |
pub fn skin_models() -> &'static SkinModels {
    static MODELS: OnceLock<SkinModels> = OnceLock::new();
    MODELS.get_or_init(|| {
        SkinModels::new(
            train(ModelKind::Hue, &[(45, 180)]),
            train(ModelKind::CrCb, &[(32, 256), (32, 256)]),
            train(ModelKind::Rgb, &[(32, 256), (32, 256), (32, 256)]),
        )
        .unwrap()
    })
}

#[test]
fn swatch_probabilities() {
    let planes = planes(&[&[BACKGROUND, SKIN, GOOD, BAD, CHROMA]]);
    let models = skin_models();
    let table = ModelKind::ALL.map(|kind| {
        (0..5)
            .map(|i| models.probability(kind, &planes, i))
            .collect::<Vec<_>>()
    });
    assert_eq!(table[0], [0, 99, 0, 0, 0]);
    assert_eq!(table[1], [0, 99, 39, 0, 99]);
    assert_eq!(table[2], [0, 99, 0, 19, 0]);
}

/// Outline of an open hand with five fanned fingers.
///
/// Fingertips lie on `y = 0`, 20 pixels apart; the valleys between them lie on `y = 50` and are
/// closer together. The palm is a 100x110 rectangle below. All coordinates are multiplied by
/// `scale`.
pub const HAND: [(i32, i32); 13] = [
    (0, 160),
    (0, 50),
    (10, 0),
    (29, 50),
    (30, 0),
    (43, 50),
    (50, 0),
    (57, 50),
    (70, 0),
    (71, 50),
    (90, 0),
    (100, 50),
    (100, 160),
];

/// Traces a closed polygon as an 8-connected point sequence, clockwise on screen for clockwise
/// vertices. The first vertex is not repeated at the end.
pub fn polygon_contour(vertices: &[(i32, i32)], scale: i32) -> Vec<Point> {
    let mut points = Vec::new();
    for (i, &(x0, y0)) in vertices.iter().enumerate() {
        let (x1, y1) = vertices[(i + 1) % vertices.len()];
        let (x0, y0, x1, y1) = (x0 * scale, y0 * scale, x1 * scale, y1 * scale);
        let steps = (x1 - x0).abs().max((y1 - y0).abs());
        for s in 0..steps {
            let t = s as f32 / steps as f32;
            points.push(Point::new(
                x0 + ((x1 - x0) as f32 * t).round() as i32,
                y0 + ((y1 - y0) as f32 * t).round() as i32,
            ));
        }
    }
    points
}

/// The [`HAND`] outline at the given scale.
pub fn hand_contour(scale: i32) -> Vec<Point> {
    polygon_contour(&HAND, scale)
}

/// A `width`x`height` mask with a filled rectangle at `(x, y)` for every entry of `blobs`.
pub fn blobs(width: usize, height: usize, blobs: &[(usize, usize, usize, usize)]) -> Mask {
    Mask::from_fn(width, height, |px, py| {
        let inside = blobs
            .iter()
            .any(|&(x, y, w, h)| (x..x + w).contains(&px) && (y..y + h).contains(&py));
        if inside {
            255
        } else {
            0
        }
    })
}
