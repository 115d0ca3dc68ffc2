//! Connected-component labeling over horizontal runs.
//!
//! The labeler scans a mask once, top to bottom and left to right, assigning a provisional label
//! to every run of foreground pixels and merging it with the overlapping runs of the row above.
//! Only the runs of the previous row are kept around, in a queue bounded by the image width. A
//! second pass resolves provisional labels to dense component ids.

mod union_find;

use std::collections::VecDeque;

pub use union_find::UnionFind;

use crate::grid::{Grid, Mask};

/// Result of [`RunLabeler::label`].
#[derive(Debug, Clone)]
pub struct Labeling {
    /// Component id per pixel, `1..=count()` for foreground and `0` for background.
    pub labels: Grid<u32>,
    /// Pixel indices per component, in scan order. Entry `i` belongs to component `i + 1`.
    pub components: Vec<Vec<usize>>,
}

impl Labeling {
    /// Number of components.
    pub fn count(&self) -> usize {
        self.components.len()
    }

    /// Returns the pixel indices of component `id`, or [`None`] if there is no such component.
    pub fn component(&self, id: u32) -> Option<&[usize]> {
        let i = (id as usize).checked_sub(1)?;
        self.components.get(i).map(Vec::as_slice)
    }

    /// Pixel count of every component, indexed by `id - 1`.
    pub fn sizes(&self) -> Vec<usize> {
        self.components.iter().map(Vec::len).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    end: usize,
    label: u32,
}

/// A 4-connectivity component labeler.
///
/// The labeler owns its scratch buffers, so reusing one instance across frames avoids
/// reallocating them.
#[derive(Debug, Default)]
pub struct RunLabeler {
    forest: UnionFind,
    runs: VecDeque<Run>,
}

impl RunLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels the foreground (nonzero) pixels of `mask`.
    pub fn label(&mut self, mask: &Mask) -> Labeling {
        let (w, h) = mask.size();
        let mut provisional = Grid::<u32>::new(w, h);
        self.forest.clear();
        self.runs.clear();
        self.runs.reserve(w + 1);

        for y in 0..h {
            let row = mask.row(y);
            // runs of the previous row are at the front of the queue
            let mut previous = self.runs.len();
            let mut x = 0;
            while x < w {
                if row[x] == 0 {
                    x += 1;
                    continue;
                }
                let start = x;
                let label = self.forest.make();
                while x < w && row[x] != 0 {
                    provisional[(x, y)] = label;
                    x += 1;
                }
                let end = x - 1;

                while previous > 0 {
                    let Some(&above) = self.runs.front() else { break };
                    if above.end < start {
                        // ends before this run, so it cannot touch any later run either
                        self.runs.pop_front();
                        previous -= 1;
                        continue;
                    }
                    if above.start > end {
                        break;
                    }
                    self.forest.union(label, above.label);
                    if above.end <= end {
                        self.runs.pop_front();
                        previous -= 1;
                    } else {
                        break;
                    }
                }
                self.runs.push_back(Run { start, end, label });
            }
            self.runs.drain(..previous);
        }

        self.resolve(provisional)
    }

    fn resolve(&mut self, mut labels: Grid<u32>) -> Labeling {
        let mut dense = vec![0u32; self.forest.len() + 1];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for (i, label) in labels.as_mut_slice().iter_mut().enumerate() {
            if *label == 0 {
                continue;
            }
            let root = self.forest.find(*label) as usize;
            if dense[root] == 0 {
                components.push(Vec::new());
                dense[root] = components.len() as u32;
            }
            *label = dense[root];
            components[*label as usize - 1].push(i);
        }

        log::trace!(
            "labeled {} components from {} runs",
            components.len(),
            self.forest.len()
        );
        Labeling { labels, components }
    }

    /// Zeroes the pixels of every component with fewer than `min_size` pixels.
    ///
    /// Returns the number of components removed.
    pub fn remove_small_components(&mut self, mask: &mut Mask, min_size: usize) -> usize {
        let labeling = self.label(mask);
        let mut removed = 0;
        for pixels in labeling.components.iter().filter(|c| c.len() < min_size) {
            for &i in pixels {
                mask[i] = 0;
            }
            removed += 1;
        }
        removed
    }
}
