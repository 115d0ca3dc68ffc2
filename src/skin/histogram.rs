//! Dual (skin / non-skin) color histograms with a precomputed probability lookup table.

use std::{fmt::Write as _, fs, path::Path};

use crate::{
    error::{Error, Result},
    grid::{ColorImage, Mask},
};

/// Maximum number of histogram dimensions.
pub const MAX_DIMS: usize = 3;

/// Bin and range written for axes a histogram does not use.
const UNUSED_AXIS: (usize, usize) = (64, 256);

/// Quantization of one color channel into histogram bins.
///
/// The range must be `bins << k` for some `k`, so that a channel value maps to its bin with a
/// single right shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    bins: usize,
    range: usize,
    shift: u32,
}

impl Axis {
    /// Creates an axis quantizing `0..range` into `bins` bins.
    ///
    /// Returns [`Error::InvalidQuantization`] if `range` is not `bins` times a power of two.
    pub fn new(bins: usize, range: usize) -> Result<Self> {
        let invalid = || Error::InvalidQuantization { bins, range };
        if bins == 0 || range < bins || range % bins != 0 {
            return Err(invalid());
        }
        let ratio = range / bins;
        if !ratio.is_power_of_two() {
            return Err(invalid());
        }
        Ok(Self {
            bins,
            range,
            shift: ratio.trailing_zeros(),
        })
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn range(&self) -> usize {
        self.range
    }

    /// The right shift mapping a channel value to its bin.
    #[inline]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Maps a channel value to its bin.
    ///
    /// Values at or past `range` land in the last bin.
    #[inline]
    pub fn quantize(&self, value: u8) -> usize {
        (usize::from(value) >> self.shift).min(self.bins - 1)
    }
}

/// A Bayesian skin color model.
///
/// Holds a positive (skin) and a negative (non-skin) histogram over 1 to 3 color channels,
/// together with the number of training pixels that went into each. A lookup table mapping every
/// bin to a skin probability in `0..=100` is rebuilt whenever the histograms change through
/// [`normalize`], [`merge`], [`update`], [`remove_low_bins`] or loading.
///
/// The channels read from a pixel depend on the dimensionality:
///
/// - 1 dimension: channel 0 (hue of an HSV image).
/// - 2 dimensions: channels 1 and 2 (Cr and Cb of a YCrCb image).
/// - 3 dimensions: channels 0, 1 and 2 (RGB).
///
/// [`normalize`]: SkinHistogram::normalize
/// [`merge`]: SkinHistogram::merge
/// [`update`]: SkinHistogram::update
/// [`remove_low_bins`]: SkinHistogram::remove_low_bins
#[derive(Debug, Clone, PartialEq)]
pub struct SkinHistogram {
    axes: Vec<Axis>,
    positive: Vec<f64>,
    negative: Vec<f64>,
    positive_count: f64,
    negative_count: f64,
    lut: Vec<u8>,
}

impl SkinHistogram {
    /// Creates an empty model over the given axes.
    ///
    /// Returns [`Error::UnsupportedDimensions`] unless 1 to 3 axes are given.
    pub fn new(axes: &[Axis]) -> Result<Self> {
        if axes.is_empty() || axes.len() > MAX_DIMS {
            return Err(Error::UnsupportedDimensions(axes.len()));
        }
        let len = axes.iter().map(Axis::bins).product();
        Ok(Self {
            axes: axes.to_vec(),
            positive: vec![0.0; len],
            negative: vec![0.0; len],
            positive_count: 0.0,
            negative_count: 0.0,
            lut: vec![0; len],
        })
    }

    /// Creates an empty model from `(bins, range)` pairs.
    pub fn with_axes(axes: &[(usize, usize)]) -> Result<Self> {
        let axes = axes
            .iter()
            .map(|&(bins, range)| Axis::new(bins, range))
            .collect::<Result<Vec<_>>>()?;
        Self::new(&axes)
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn positive(&self) -> &[f64] {
        &self.positive
    }

    pub fn negative(&self) -> &[f64] {
        &self.negative
    }

    /// Returns the number of `(skin, non-skin)` pixels that trained this model.
    pub fn counts(&self) -> (f64, f64) {
        (self.positive_count, self.negative_count)
    }

    /// The prior probability of skin, `P(skin) = positive / (positive + negative)`.
    pub fn prior(&self) -> f64 {
        let total = self.positive_count + self.negative_count;
        if total > 0.0 {
            self.positive_count / total
        } else {
            0.0
        }
    }

    pub fn lut(&self) -> &[u8] {
        &self.lut
    }

    /// The pixel channels this model reads.
    pub fn channels(&self) -> &'static [usize] {
        match self.dims() {
            1 => &[0],
            2 => &[1, 2],
            _ => &[0, 1, 2],
        }
    }

    /// Computes the storage index of the bin a pixel falls into.
    #[inline]
    pub fn bin_index(&self, pixel: [u8; 3]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for (axis, &c) in self.axes.iter().zip(self.channels()) {
            index += axis.quantize(pixel[c]) * stride;
            stride *= axis.bins();
        }
        index
    }

    /// Looks up the skin probability of a pixel, in percent.
    #[inline]
    pub fn lookup(&self, pixel: [u8; 3]) -> u8 {
        self.lut[self.bin_index(pixel)]
    }

    /// Accumulates the pixels of `image` into the histograms.
    ///
    /// Pixels with a nonzero `mask` value count as skin. The lookup table is not rebuilt; call
    /// [`SkinHistogram::normalize`] once training is complete.
    pub fn train(&mut self, image: &ColorImage, mask: &Mask) -> Result<()> {
        image.check_same_size(mask)?;
        for (px, &m) in image.as_slice().iter().zip(mask.as_slice()) {
            let bin = self.bin_index(*px);
            if m != 0 {
                self.positive[bin] += 1.0;
                self.positive_count += 1.0;
            } else {
                self.negative[bin] += 1.0;
                self.negative_count += 1.0;
            }
        }
        Ok(())
    }

    /// Trains on a batch of `(image, mask)` pairs, skipping pairs with mismatched sizes.
    ///
    /// Returns the number of pairs used.
    pub fn train_batch<'a, I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (&'a ColorImage, &'a Mask)>,
    {
        let mut used = 0;
        for (i, (image, mask)) in pairs.into_iter().enumerate() {
            match self.train(image, mask) {
                Ok(()) => used += 1,
                Err(e) => log::warn!("skipping training pair {i}: {e}"),
            }
        }
        used
    }

    /// Scales both histograms to sum to one and rebuilds the lookup table.
    pub fn normalize(&mut self) {
        sum_to_one(&mut self.positive);
        sum_to_one(&mut self.negative);
        self.rebuild_lut();
    }

    /// Zeroes all bins below `threshold`, then renormalizes.
    pub fn remove_low_bins(&mut self, threshold: f64) {
        for v in self.positive.iter_mut().chain(self.negative.iter_mut()) {
            if *v < threshold {
                *v = 0.0;
            }
        }
        self.normalize();
    }

    /// Blends `input` into this model.
    ///
    /// With `weight < 1`, every bin and count becomes `weight * input + (1 - weight) * self`.
    /// Otherwise `input` replaces the model's data.
    pub fn merge(&mut self, input: &SkinHistogram, weight: f64) -> Result<()> {
        if input.axes != self.axes {
            return Err(Error::InvalidParameter(
                "merged histograms must share their quantization",
            ));
        }
        let blend = |old: f64, new: f64| {
            if weight < 1.0 {
                weight * new + (1.0 - weight) * old
            } else {
                new
            }
        };
        for (old, &new) in self.positive.iter_mut().zip(&input.positive) {
            *old = blend(*old, new);
        }
        for (old, &new) in self.negative.iter_mut().zip(&input.negative) {
            *old = blend(*old, new);
        }
        self.positive_count = blend(self.positive_count, input.positive_count);
        self.negative_count = blend(self.negative_count, input.negative_count);
        self.rebuild_lut();
        Ok(())
    }

    /// Adapts the model to a new labeled frame.
    ///
    /// The frame's histograms are smoothed with a 5-tap Gaussian along every axis, normalized, and
    /// merged into the model with `learning_rate` as weight. A model that has never been trained
    /// takes the frame's histograms unchanged.
    pub fn update(&mut self, image: &ColorImage, mask: &Mask, learning_rate: f64) -> Result<()> {
        let mut input = Self::new(&self.axes)?;
        input.train(image, mask)?;

        if self.positive_count + self.negative_count == 0.0 {
            *self = input;
            self.normalize();
            return Ok(());
        }

        input.blur();
        sum_to_one(&mut input.positive);
        sum_to_one(&mut input.negative);
        self.merge(&input, learning_rate)
    }

    fn blur(&mut self) {
        let kernel = gaussian_kernel::<5>(5.0);
        let mut stride = 1;
        for axis in &self.axes {
            let (len, s) = (axis.bins(), stride);
            blur_axis(&mut self.positive, len, s, &kernel);
            blur_axis(&mut self.negative, len, s, &kernel);
            stride *= len;
        }
    }

    fn rebuild_lut(&mut self) {
        let prior = self.prior();
        let pos_total = nonzero_or_one(self.positive.iter().sum());
        let neg_total = nonzero_or_one(self.negative.iter().sum());

        for ((entry, &pos), &neg) in self.lut.iter_mut().zip(&self.positive).zip(&self.negative) {
            let ls = pos / pos_total;
            let ln = neg / neg_total;
            let p = ls * prior / (ls * prior + ln * (1.0 - prior) + 1e-6);
            *entry = (p * 100.0).floor().clamp(0.0, 100.0) as u8;
        }
    }

    /// Serializes the model into its whitespace-delimited text form.
    ///
    /// The first line holds `dims positive_count negative_count` followed by `bins range` for
    /// each of the 3 possible axes. Every following line holds the positive and negative value of
    /// one bin, with the first axis varying slowest.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "{} {} {}",
            self.dims(),
            self.positive_count,
            self.negative_count
        );
        for i in 0..MAX_DIMS {
            let (bins, range) = self
                .axes
                .get(i)
                .map_or(UNUSED_AXIS, |a| (a.bins(), a.range()));
            let _ = write!(out, " {bins} {range}");
        }
        out.push('\n');

        for index in self.file_order() {
            let _ = writeln!(out, "{} {}", self.positive[index], self.negative[index]);
        }
        out
    }

    /// Parses a model from its text form, rebuilding the lookup table.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let dims = tokens.next::<usize>()?;
        let positive_count = tokens.next::<f64>()?;
        let negative_count = tokens.next::<f64>()?;

        let mut axes = Vec::with_capacity(MAX_DIMS);
        for i in 0..MAX_DIMS {
            let bins = tokens.next::<usize>()?;
            let range = tokens.next::<usize>()?;
            if i < dims {
                axes.push(Axis::new(bins, range)?);
            }
        }
        if dims == 0 || dims > MAX_DIMS {
            return Err(Error::UnsupportedDimensions(dims));
        }

        let mut hist = Self::new(&axes)?;
        hist.positive_count = positive_count;
        hist.negative_count = negative_count;
        for index in hist.file_order() {
            hist.positive[index] = tokens.next()?;
            hist.negative[index] = tokens.next()?;
        }
        tokens.finish()?;

        hist.rebuild_lut();
        Ok(hist)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_text())?;
        log::debug!("saved {}-D histogram to '{}'", self.dims(), path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let hist = Self::from_text(&fs::read_to_string(path)?)?;
        log::debug!(
            "loaded {}-D histogram from '{}' (prior {:.3})",
            hist.dims(),
            path.display(),
            hist.prior()
        );
        Ok(hist)
    }

    /// Storage indices in file order: nested loops with the first axis outermost.
    fn file_order(&self) -> Vec<usize> {
        let bins = |i: usize| self.axes.get(i).map_or(1, Axis::bins);
        let (b1, b2, b3) = (bins(0), bins(1), bins(2));
        let mut order = Vec::with_capacity(self.positive.len());
        for i in 0..b1 {
            for j in 0..b2 {
                for k in 0..b3 {
                    order.push(i + j * b1 + k * b1 * b2);
                }
            }
        }
        order
    }
}

fn nonzero_or_one(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

fn sum_to_one(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

fn gaussian_kernel<const N: usize>(sigma: f64) -> [f64; N] {
    let center = (N / 2) as f64;
    let mut kernel = [0.0; N];
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f64 - center;
        *k = (-(d * d) / (2.0 * sigma * sigma)).exp();
    }
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Mirrors an out-of-range index without repeating the edge element (`dcb|abcd|cba`).
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let period = 2 * (len - 1);
    let i = i.rem_euclid(period);
    (if i < len { i } else { period - i }) as usize
}

/// Convolves every line of `data` running along an axis of `len` bins spaced `stride` apart.
fn blur_axis(data: &mut [f64], len: usize, stride: usize, kernel: &[f64]) {
    let radius = (kernel.len() / 2) as isize;
    let mut line = vec![0.0; len];
    let outer = stride * len;
    for base in (0..data.len()).step_by(outer) {
        for offset in 0..stride {
            let start = base + offset;
            for (i, v) in line.iter_mut().enumerate() {
                *v = data[start + i * stride];
            }
            for i in 0..len {
                data[start + i * stride] = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| {
                        let src = reflect101(i as isize + k as isize - radius, len);
                        w * line[src]
                    })
                    .sum();
            }
        }
    }
}

struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
            pos: 0,
        }
    }

    fn next<T: std::str::FromStr>(&mut self) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let token = self.pos;
        self.pos += 1;
        let s = self.iter.next().ok_or_else(|| Error::Parse {
            token,
            message: "unexpected end of file".into(),
        })?;
        s.parse().map_err(|e| Error::Parse {
            token,
            message: format!("invalid value '{s}': {e}"),
        })
    }

    fn finish(mut self) -> Result<()> {
        match self.iter.next() {
            None => Ok(()),
            Some(s) => Err(Error::Parse {
                token: self.pos,
                message: format!("trailing data '{s}'"),
            }),
        }
    }
}
