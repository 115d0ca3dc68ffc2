//! Skin segmentation.
//!
//! Three [`SkinHistogram`]s make up a [`SkinModels`] set: a 1-D hue model, a 2-D Cr/Cb chroma
//! model, and a 3-D RGB model. Segmenters read them through per-model [`Gate`]s, which combine a
//! probability threshold with windows on the channels the model does not look at (saturation and
//! value for hue, luma for chroma).
//!
//! Two segmenters are provided:
//!
//! - [`GlobalSegmenter`] classifies every pixel independently against one model.
//! - [`RegionGrower`] seeds from pixels that pass a strict test and propagates a decaying
//!   potential into neighboring pixels, stopping at edges.

mod grow;
mod histogram;
mod segment;

use std::path::Path;

pub use grow::{potential, GrowOptions, GrowOrder, Growth, RegionGrower, Tier};
pub use histogram::{Axis, SkinHistogram, MAX_DIMS};
pub use segment::{Gate, GlobalSegmenter, Level, Thresholds};

use crate::{
    color::{ColorConverter, ColorSpace},
    error::{Error, Result},
    grid::{ColorImage, Mask},
};

/// Produces a confidence mask the size of the frame.
///
/// Nonzero mask values mark skin; higher values mean higher confidence.
pub trait SkinSegmenter {
    fn segment(&self, models: &SkinModels, planes: &ColorPlanes, edges: &Mask) -> Mask;
}

/// One frame converted into every color space the models read.
#[derive(Debug, Clone)]
pub struct ColorPlanes {
    pub hsv: ColorImage,
    pub ycrcb: ColorImage,
    pub rgb: ColorImage,
}

impl ColorPlanes {
    pub fn convert(converter: &dyn ColorConverter, frame: &ColorImage) -> Self {
        Self {
            hsv: converter.convert(frame, ModelKind::Hue.color_space()),
            ycrcb: converter.convert(frame, ModelKind::CrCb.color_space()),
            rgb: converter.convert(frame, ModelKind::Rgb.color_space()),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        self.rgb.size()
    }

    pub fn plane(&self, kind: ModelKind) -> &ColorImage {
        match kind {
            ModelKind::Hue => &self.hsv,
            ModelKind::CrCb => &self.ycrcb,
            ModelKind::Rgb => &self.rgb,
        }
    }
}

/// Identifies one of the three models in a [`SkinModels`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Hue,
    CrCb,
    Rgb,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Hue, ModelKind::CrCb, ModelKind::Rgb];

    /// The histogram dimensionality this model must have.
    pub fn dims(self) -> usize {
        match self {
            ModelKind::Hue => 1,
            ModelKind::CrCb => 2,
            ModelKind::Rgb => 3,
        }
    }

    pub fn color_space(self) -> ColorSpace {
        match self {
            ModelKind::Hue => ColorSpace::Hsv,
            ModelKind::CrCb => ColorSpace::YCrCb,
            ModelKind::Rgb => ColorSpace::Rgb,
        }
    }
}

/// The trained hue, chroma and RGB skin models.
#[derive(Debug, Clone)]
pub struct SkinModels {
    hue: SkinHistogram,
    crcb: SkinHistogram,
    rgb: SkinHistogram,
}

impl SkinModels {
    /// Bundles three trained models.
    ///
    /// Returns [`Error::InvalidParameter`] if a model does not have the dimensionality its slot
    /// requires (1 for hue, 2 for chroma, 3 for RGB).
    pub fn new(hue: SkinHistogram, crcb: SkinHistogram, rgb: SkinHistogram) -> Result<Self> {
        if hue.dims() != 1 {
            return Err(Error::InvalidParameter("hue model must be 1-dimensional"));
        }
        if crcb.dims() != 2 {
            return Err(Error::InvalidParameter("chroma model must be 2-dimensional"));
        }
        if rgb.dims() != 3 {
            return Err(Error::InvalidParameter("RGB model must be 3-dimensional"));
        }
        Ok(Self { hue, crcb, rgb })
    }

    pub fn load(
        hue: impl AsRef<Path>,
        crcb: impl AsRef<Path>,
        rgb: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new(
            SkinHistogram::load(hue)?,
            SkinHistogram::load(crcb)?,
            SkinHistogram::load(rgb)?,
        )
    }

    pub fn get(&self, kind: ModelKind) -> &SkinHistogram {
        match kind {
            ModelKind::Hue => &self.hue,
            ModelKind::CrCb => &self.crcb,
            ModelKind::Rgb => &self.rgb,
        }
    }

    pub fn get_mut(&mut self, kind: ModelKind) -> &mut SkinHistogram {
        match kind {
            ModelKind::Hue => &mut self.hue,
            ModelKind::CrCb => &mut self.crcb,
            ModelKind::Rgb => &mut self.rgb,
        }
    }

    /// Skin probability of pixel `index` under one model, in percent.
    #[inline]
    pub fn probability(&self, kind: ModelKind, planes: &ColorPlanes, index: usize) -> u8 {
        self.get(kind).lookup(planes.plane(kind)[index])
    }

    /// Tests pixel `index` against a gate of one model.
    #[inline]
    pub fn passes(&self, kind: ModelKind, gate: &Gate, planes: &ColorPlanes, index: usize) -> bool {
        let pixel = planes.plane(kind)[index];
        gate.passes(self.get(kind).lookup(pixel), pixel)
    }

    /// Adapts all three models to a labeled frame.
    ///
    /// See [`SkinHistogram::update`].
    pub fn update(&mut self, planes: &ColorPlanes, mask: &Mask, learning_rate: f64) -> Result<()> {
        for kind in ModelKind::ALL {
            self.get_mut(kind)
                .update(planes.plane(kind), mask, learning_rate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;

    #[test]
    fn model_slots() {
        let models = test::skin_models();
        for kind in ModelKind::ALL {
            assert_eq!(models.get(kind).dims(), kind.dims());
        }

        let hue = models.get(ModelKind::Hue).clone();
        let crcb = models.get(ModelKind::CrCb).clone();
        let rgb = models.get(ModelKind::Rgb).clone();
        let err = SkinModels::new(crcb.clone(), hue.clone(), rgb.clone()).unwrap_err();
        assert!(err.is_configuration());
        assert!(SkinModels::new(hue, crcb, rgb).is_ok());
    }

    #[test]
    fn online_update() {
        let mut models = test::skin_models().clone();
        let planes = test::planes(&[&[test::BACKGROUND, test::SKIN]]);
        let mask = Mask::from_vec(2, 1, vec![0, 255]).unwrap();
        models.update(&planes, &mask, 0.1).unwrap();
        assert!(models.probability(ModelKind::Rgb, &planes, 1) > 50);
        assert_eq!(models.probability(ModelKind::Rgb, &planes, 0), 0);
    }
}
