/// A square grid of scalar heights with a fixed border band.
///
/// Cells within `border` of any edge are generated so that edge normals can be
/// computed, but they are not part of the visible chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    pub size: usize,
    pub border: usize,
    data: Vec<f32>,
}

impl HeightField {
    pub fn new_with(size: usize, border: usize, value: f32) -> Self {
        Self {
            size,
            border,
            data: vec![value; size * size],
        }
    }

    /// Build a field from a row-major vector (`data[y * size + x]`).
    pub fn from_vec(size: usize, border: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), size * size, "height field data must be size*size");
        Self { size, border, data }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size, "cell ({}, {}) outside {}x{}", x, y, self.size, self.size);
        y * self.size + x
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.index(x, y)]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Row-major view of every cell, border included.
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Whether a cell lies in the border band.
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x < self.border
            || y < self.border
            || x >= self.size - self.border
            || y >= self.size - self.border
    }

    /// Edge length of the visible (un-bordered) region.
    pub fn interior_size(&self) -> usize {
        self.size.saturating_sub(2 * self.border)
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let size = self.size;
        self.data.iter().enumerate().map(move |(idx, &val)| (idx % size, idx / size, val))
    }

    /// Minimum and maximum over every cell. Empty fields report `(0.0, 0.0)`.
    pub fn min_max(&self) -> (f32, f32) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        self.data.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Coordinates of the highest cell (first in row-major order on ties).
    pub fn argmax(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &v) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((idx, v)),
            }
        }
        best.map(|(idx, _)| (idx % self.size, idx / self.size))
    }
}
