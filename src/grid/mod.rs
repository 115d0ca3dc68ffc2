//! Raster storage.
//!
//! This module provides:
//!
//! - The [`Grid`] type, an owned, row-major 2D buffer with bounds-checked accessors.
//! - The [`Mask`], [`GrayImage`] and [`ColorImage`] aliases used throughout the pipeline.
//! - Conversions to and from the [`image`] crate, for loading frames and saving masks.


use std::{
    fmt,
    ops::{Index, IndexMut},
    path::Path,
};

use nalgebra::Point2;

use crate::{
    error::{Error, Result},
    rect::Rect,
};

/// A single-channel 8-bit mask. `0` is background, anything else is foreground.
pub type Mask = Grid<u8>;

/// A single-channel 8-bit intensity image.
pub type GrayImage = Grid<u8>;

/// A 3-channel 8-bit image.
///
/// The channel meaning depends on the color space the image was converted to. Frames handed to
/// the tracker are RGB.
pub type ColorImage = Grid<[u8; 3]>;

/// A 2D buffer of `T` stored in row-major order.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a grid of the given size, filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T: Clone> Grid<T> {
    /// Creates a grid of the given size with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|cell| *cell = value.clone());
    }

    /// Copies the cells inside `rect`, clipped to the grid, into a new grid.
    pub fn crop(&self, rect: Rect) -> Self {
        let rect = rect.limit(self.width, self.height);
        let (x0, y0) = (rect.x() as usize, rect.y() as usize);
        let (w, h) = (rect.width() as usize, rect.height() as usize);
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        Self {
            width: w,
            height: h,
            data,
        }
    }
}

impl<T> Grid<T> {
    /// Wraps an existing row-major buffer.
    ///
    /// Returns an error if `data` does not contain exactly `width * height` elements.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::SizeMismatch {
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns whether the signed coordinate `(x, y)` lies inside the grid.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.width as u64 && (y as u64) < self.height as u64
    }

    /// Computes the linear index of `(x, y)`, or [`None`] if it is out of bounds.
    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Computes the linear index of a signed point, or [`None`] if it is out of bounds.
    #[inline]
    pub fn index_of_point(&self, p: Point2<i32>) -> Option<usize> {
        if self.contains(p.x.into(), p.y.into()) {
            Some(p.y as usize * self.width + p.x as usize)
        } else {
            None
        }
    }

    /// Converts a linear index back into `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.data.len(),
            "index {index} out of bounds for {self:?}"
        );
        (index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.index_of(x, y).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.index_of(x, y).map(move |i| &mut self.data[i])
    }

    /// Returns the cell at a signed point, or [`None`] if it is outside the grid.
    #[inline]
    pub fn at(&self, p: Point2<i32>) -> Option<&T> {
        self.index_of_point(p).map(|i| &self.data[i])
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns row `y` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of bounds.
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds for {self:?}");
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        // `chunks_exact(0)` panics, and a zero-width grid has no rows anyway.
        self.data.chunks_exact(self.width.max(1))
    }

    /// Iterates over all cells, yielding `(x, y, &cell)`.
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % w, i / w, cell))
    }

    /// Yields the in-bounds 4-neighbors of a linear index, in the order down, right, left, up.
    pub fn neighbors4(&self, index: usize) -> impl Iterator<Item = usize> {
        let (x, y) = self.coords(index);
        let w = self.width;
        [
            (y + 1 < self.height).then(|| index + w),
            (x + 1 < w).then(|| index + 1),
            (x > 0).then(|| index - 1),
            (y > 0).then(|| index - w),
        ]
        .into_iter()
        .flatten()
    }

    /// Returns whether `other` has the same width and height.
    #[inline]
    pub fn same_size<U>(&self, other: &Grid<U>) -> bool {
        self.size() == other.size()
    }

    /// Returns [`Error::SizeMismatch`] unless `other` has the same size as `self`.
    pub fn check_same_size<U>(&self, other: &Grid<U>) -> Result<()> {
        if self.same_size(other) {
            Ok(())
        } else {
            Err(Error::SizeMismatch {
                expected: self.size(),
                actual: other.size(),
            })
        }
    }

    /// Applies `f` to every cell, producing a grid of the same size.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<const N: usize> Grid<[u8; N]> {
    /// Returns channel `c` of the pixel at `(x, y)`.
    ///
    /// Returns [`None`] if the coordinates or the channel are out of bounds.
    #[inline]
    pub fn channel(&self, x: usize, y: usize, c: usize) -> Option<u8> {
        self.get(x, y).and_then(|px| px.get(c).copied())
    }
}

impl Grid<u8> {
    /// Counts cells that are not `0`.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Loads a grayscale mask or image from the filesystem.
    ///
    /// Color images are converted to luma.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let img = image::open(path.as_ref())?.to_luma8();
        Ok(Self::from(&img))
    }

    /// Saves this grid as an 8-bit grayscale image.
    ///
    /// The format is derived from the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        image::GrayImage::from(self).save(path.as_ref())?;
        Ok(())
    }
}

impl Grid<[u8; 3]> {
    /// Loads an RGB frame from the filesystem.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let img = image::open(path.as_ref())?.to_rgb8();
        Ok(Self::from(&img))
    }
}

impl From<&image::GrayImage> for Grid<u8> {
    fn from(img: &image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }
}

impl From<&Grid<u8>> for image::GrayImage {
    fn from(grid: &Grid<u8>) -> Self {
        image::GrayImage::from_fn(grid.width as u32, grid.height as u32, |x, y| {
            image::Luma([grid[(x as usize, y as usize)]])
        })
    }
}

impl From<&image::RgbImage> for Grid<[u8; 3]> {
    fn from(img: &image::RgbImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.pixels().map(|px| px.0).collect(),
        }
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[track_caller]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        match self.index_of(x, y) {
            Some(i) => &self.data[i],
            None => panic!(
                "({x}, {y}) out of bounds for {}x{} grid",
                self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[track_caller]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        match self.index_of(x, y) {
            Some(i) => &mut self.data[i],
            None => panic!(
                "({x}, {y}) out of bounds for {}x{} grid",
                self.width, self.height
            ),
        }
    }
}

impl<T> Index<usize> for Grid<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for Grid<T> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Grid", self.width, self.height)
    }
}
