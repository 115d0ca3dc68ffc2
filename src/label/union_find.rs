/// A disjoint-set forest over provisional labels.
///
/// Labels are `1..=len()`; label 0 is reserved for background and is never handed out.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl Default for UnionFind {
    fn default() -> Self {
        Self::new()
    }
}

impl UnionFind {
    pub fn new() -> Self {
        Self {
            parent: vec![0],
            size: vec![0],
        }
    }

    /// Removes all labels, keeping the allocations.
    pub fn clear(&mut self) {
        self.parent.truncate(1);
        self.size.truncate(1);
    }

    /// Number of labels handed out since the last [`UnionFind::clear`].
    pub fn len(&self) -> usize {
        self.parent.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a new singleton set and returns its label.
    pub fn make(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        self.size.push(1);
        label
    }

    /// Finds the root of `label`'s set, compressing the path along the way.
    ///
    /// # Panics
    ///
    /// Panics if `label` was never handed out.
    pub fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = label;
        while cur != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Merges the sets of `a` and `b`, attaching the smaller tree below the larger one.
    ///
    /// Returns the root of the merged set.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return ra;
        }
        let (big, small) = if self.size[ra as usize] >= self.size[rb as usize] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small as usize] = big;
        self.size[big as usize] += self.size[small as usize];
        big
    }

    /// Number of provisional labels in `label`'s set.
    pub fn set_size(&mut self, label: u32) -> u32 {
        let root = self.find(label);
        self.size[root as usize]
    }
}
