use crate::grid::Mask;

use super::{ColorPlanes, ModelKind, SkinModels, SkinSegmenter};

/// A decision rule for one skin model.
///
/// A pixel passes if the model assigns it a probability of at least `probability` percent, and
/// every channel with a window lies strictly inside that window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub probability: u8,
    /// Open `(min, max)` intervals per channel of the model's color space.
    pub windows: [Option<(u8, u8)>; 3],
}

impl Gate {
    /// A gate without channel windows.
    pub const fn new(probability: u8) -> Self {
        Self {
            probability,
            windows: [None; 3],
        }
    }

    pub fn passes(&self, probability: u8, pixel: [u8; 3]) -> bool {
        probability >= self.probability
            && self
                .windows
                .iter()
                .zip(pixel)
                .all(|(window, c)| window.map_or(true, |(min, max)| c > min && c < max))
    }
}

/// Threshold strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// High recall.
    #[default]
    Low,
    /// High precision.
    High,
}

/// One [`Gate`] per skin model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub hue: Gate,
    pub crcb: Gate,
    pub rgb: Gate,
}

impl Thresholds {
    pub const LOW: Self = Self {
        hue: Gate {
            probability: 1,
            windows: [None, Some((30, 170)), Some((40, 230))],
        },
        crcb: Gate {
            probability: 30,
            windows: [Some((40, 210)), None, None],
        },
        rgb: Gate::new(11),
    };

    pub const HIGH: Self = Self {
        hue: Gate {
            probability: 43,
            windows: [None, Some((35, 140)), Some((110, 190))],
        },
        crcb: Gate {
            probability: 50,
            windows: [Some((60, 190)), None, None],
        },
        rgb: Gate::new(70),
    };

    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Low => Self::LOW,
            Level::High => Self::HIGH,
        }
    }

    pub fn get(&self, kind: ModelKind) -> &Gate {
        match kind {
            ModelKind::Hue => &self.hue,
            ModelKind::CrCb => &self.crcb,
            ModelKind::Rgb => &self.rgb,
        }
    }

    pub fn get_mut(&mut self, kind: ModelKind) -> &mut Gate {
        match kind {
            ModelKind::Hue => &mut self.hue,
            ModelKind::CrCb => &mut self.crcb,
            ModelKind::Rgb => &mut self.rgb,
        }
    }
}

/// Classifies every pixel independently using a single model.
///
/// Passing pixels are set to 255. The edge map is ignored.
#[derive(Debug, Clone)]
pub struct GlobalSegmenter {
    kind: ModelKind,
    thresholds: Thresholds,
}

impl GlobalSegmenter {
    pub fn new(kind: ModelKind, level: Level) -> Self {
        Self {
            kind,
            thresholds: Thresholds::for_level(level),
        }
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl SkinSegmenter for GlobalSegmenter {
    fn segment(&self, models: &SkinModels, planes: &ColorPlanes, _edges: &Mask) -> Mask {
        let (w, h) = planes.size();
        let gate = self.thresholds.get(self.kind);
        let mut mask = Mask::new(w, h);
        for (i, m) in mask.as_mut_slice().iter_mut().enumerate() {
            if models.passes(self.kind, gate, planes, i) {
                *m = 255;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{self, BACKGROUND, BAD, GOOD, SKIN};

    fn segment(kind: ModelKind, level: Level) -> Vec<u8> {
        let planes = test::planes(&[&[BACKGROUND, SKIN, GOOD, BAD]]);
        let edges = Mask::new(4, 1);
        GlobalSegmenter::new(kind, level)
            .segment(test::skin_models(), &planes, &edges)
            .into_vec()
    }

    #[test]
    fn per_model_levels() {
        assert_eq!(segment(ModelKind::Hue, Level::Low), [0, 255, 0, 0]);
        assert_eq!(segment(ModelKind::Hue, Level::High), [0, 255, 0, 0]);
        assert_eq!(segment(ModelKind::CrCb, Level::Low), [0, 255, 255, 0]);
        assert_eq!(segment(ModelKind::CrCb, Level::High), [0, 255, 0, 0]);
        assert_eq!(segment(ModelKind::Rgb, Level::Low), [0, 255, 0, 255]);
        assert_eq!(segment(ModelKind::Rgb, Level::High), [0, 255, 0, 0]);
    }

    #[test]
    fn windows() {
        let gate = Thresholds::HIGH.hue;
        assert!(gate.passes(50, [0, 100, 150]));
        assert!(!gate.passes(42, [0, 100, 150]));
        // saturation window is open
        assert!(!gate.passes(50, [0, 140, 150]));
        assert!(!gate.passes(50, [0, 100, 110]));
        assert!(Thresholds::LOW.rgb.passes(11, [0, 0, 0]));
    }

    #[test]
    fn custom_thresholds() {
        let planes = test::planes(&[&[SKIN, GOOD]]);
        let mut seg = GlobalSegmenter::new(ModelKind::CrCb, Level::High);
        let mut thresholds = *seg.thresholds();
        thresholds.get_mut(ModelKind::CrCb).probability = 35;
        seg.set_thresholds(thresholds);
        let mask = seg.segment(test::skin_models(), &planes, &Mask::new(2, 1));
        assert_eq!(mask.as_slice(), &[255, 255]);
    }
}
