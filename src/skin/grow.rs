//! Potential-based region growing.

use std::collections::VecDeque;

use crate::grid::Mask;

use super::{ColorPlanes, ModelKind, SkinModels, SkinSegmenter, Thresholds};

/// Potential values of the classification tiers.
pub mod potential {
    pub const STARTER: i32 = 3;
    pub const GOOD: i32 = 2;
    pub const BAD: i32 = 1;
}

/// How strongly a pixel's color supports skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Spreads poorly; its potential decays quickly and is capped.
    Bad,
    /// Spreads with logarithmically decaying potential.
    Good,
    /// Can seed a region and passes on its full potential.
    Starter,
}

impl Tier {
    pub fn potential(self) -> i32 {
        match self {
            Tier::Bad => potential::BAD,
            Tier::Good => potential::GOOD,
            Tier::Starter => potential::STARTER,
        }
    }

    /// Computes the potential a pixel of this tier inherits from a neighbor with potential
    /// `father`.
    pub fn inherit(self, father: i32) -> i32 {
        let f = father as f32;
        match self {
            Tier::Starter => self.potential().saturating_add(father),
            Tier::Good => ((f.ln() / 4.0).min(1.0) * f * 2.0) as i32,
            Tier::Bad => ((f.ln() / 5.0).min(0.99) * f.min(20.0)) as i32,
        }
    }
}

/// Order in which grown pixels are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowOrder {
    /// Breadth first.
    #[default]
    Fifo,
    /// Depth first.
    Stack,
}

/// Options for [`RegionGrower`].
#[derive(Debug, Clone)]
pub struct GrowOptions {
    low: Thresholds,
    high: Thresholds,
    order: GrowOrder,
    require_both_seed_models: bool,
}

impl Default for GrowOptions {
    fn default() -> Self {
        Self {
            low: Thresholds::LOW,
            high: Thresholds::HIGH,
            order: GrowOrder::default(),
            require_both_seed_models: false,
        }
    }
}

impl GrowOptions {
    /// Sets the gates used to classify good and bad spreaders.
    pub fn low(mut self, thresholds: Thresholds) -> Self {
        self.low = thresholds;
        self
    }

    /// Sets the gates used to classify starters.
    pub fn high(mut self, thresholds: Thresholds) -> Self {
        self.high = thresholds;
        self
    }

    pub fn order(mut self, order: GrowOrder) -> Self {
        self.order = order;
        self
    }

    /// Requires starters to pass both the hue and the chroma gate, instead of either one.
    pub fn require_both_seed_models(mut self, require: bool) -> Self {
        self.require_both_seed_models = require;
        self
    }
}

/// Result of [`RegionGrower::grow`].
#[derive(Debug, Clone)]
pub struct Growth {
    /// Confidence mask: `55 + min(2 * potential, 200)` for every reached pixel, `0` elsewhere.
    pub mask: Mask,
    /// Number of mask writes performed.
    pub written: usize,
    /// Number of regions started from a seed pixel.
    pub seeds: usize,
}

/// Grows skin regions outward from strongly skin-colored seed pixels.
///
/// Every pixel is visited at most once. Pixels flagged in the edge map are still reached, but
/// never propagate further.
#[derive(Debug, Clone, Default)]
pub struct RegionGrower {
    options: GrowOptions,
}

impl RegionGrower {
    pub fn new(options: GrowOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GrowOptions {
        &self.options
    }

    /// Classifies pixel `index` into a spreading tier, or [`None`] if it is not skin.
    pub fn classify(&self, models: &SkinModels, planes: &ColorPlanes, index: usize) -> Option<Tier> {
        let (low, high) = (&self.options.low, &self.options.high);
        let passes = |kind, thresholds: &Thresholds| {
            models.passes(kind, thresholds.get(kind), planes, index)
        };

        let hue_high = passes(ModelKind::Hue, high);
        let crcb_high = passes(ModelKind::CrCb, high);
        let starter = if self.options.require_both_seed_models {
            hue_high && crcb_high
        } else {
            hue_high || crcb_high
        };

        if starter {
            Some(Tier::Starter)
        } else if passes(ModelKind::CrCb, low) {
            Some(Tier::Good)
        } else if passes(ModelKind::Hue, low) || passes(ModelKind::Rgb, low) {
            Some(Tier::Bad)
        } else {
            None
        }
    }

    pub fn grow(&self, models: &SkinModels, planes: &ColorPlanes, edges: &Mask) -> Growth {
        let (w, h) = planes.size();
        let mut mask = Mask::new(w, h);
        let mut visited = vec![false; w * h];
        let mut pending = VecDeque::new();
        let mut written = 0;
        let mut seeds = 0;

        let is_edge = |i: usize| edges.as_slice().get(i).map_or(false, |&e| e != 0);

        for seed in 0..w * h {
            if visited[seed] || self.classify(models, planes, seed) != Some(Tier::Starter) {
                continue;
            }
            visited[seed] = true;
            seeds += 1;
            pending.push_back((seed, potential::STARTER));

            while let Some((index, p)) = match self.options.order {
                GrowOrder::Fifo => pending.pop_front(),
                GrowOrder::Stack => pending.pop_back(),
            } {
                mask[index] = intensity(p);
                written += 1;

                if p <= 0 || is_edge(index) {
                    continue;
                }
                for next in mask.neighbors4(index) {
                    if visited[next] {
                        continue;
                    }
                    visited[next] = true;
                    if let Some(tier) = self.classify(models, planes, next) {
                        pending.push_back((next, tier.inherit(p)));
                    }
                }
            }
        }

        log::trace!("grew {seeds} regions over {written} pixels");
        Growth {
            mask,
            written,
            seeds,
        }
    }
}

fn intensity(potential: i32) -> u8 {
    (55 + potential.clamp(0, 100) * 2) as u8
}

impl SkinSegmenter for RegionGrower {
    fn segment(&self, models: &SkinModels, planes: &ColorPlanes, edges: &Mask) -> Mask {
        self.grow(models, planes, edges).mask
    }
}
