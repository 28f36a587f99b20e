/// Flat 1-D height profile. Length is fixed at construction.
///
/// Every mutation goes through `add` / `remove`, which clamp the result at
/// zero, so heights are never negative at any observation point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeightProfile {
    data: Vec<f64>,
}

impl HeightProfile {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Build from raw heights. Negative inputs are clamped to zero.
    pub fn from_heights(heights: &[f64]) -> Self {
        Self {
            data: heights.iter().map(|&h| h.max(0.0)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Exchange the backing heights with a same-length scratch buffer.
    /// Relaxation writes whole sweeps this way; its transfers never exceed
    /// half a height difference, so no cell goes negative.
    pub(crate) fn swap_buffer(&mut self, buf: &mut Vec<f64>) {
        debug_assert_eq!(buf.len(), self.data.len());
        std::mem::swap(&mut self.data, buf);
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.data[i]
    }

    /// Index at a signed offset from `i`, or None outside the grid.
    #[inline]
    pub fn offset(&self, i: usize, delta: isize) -> Option<usize> {
        let j = i as isize + delta;
        (j >= 0 && (j as usize) < self.len()).then_some(j as usize)
    }

    #[inline]
    pub fn add(&mut self, i: usize, amount: f64) {
        self.data[i] = (self.data[i] + amount).max(0.0);
    }

    /// Subtract `amount`, floored at zero. Returns the mass actually removed.
    #[inline]
    pub fn remove(&mut self, i: usize, amount: f64) -> f64 {
        let before = self.data[i];
        self.data[i] = (before - amount).max(0.0);
        before - self.data[i]
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum() / self.len() as f64
        }
    }

    /// Peak height and the index of its first occurrence.
    pub fn peak(&self) -> (f64, usize) {
        self.data
            .iter()
            .enumerate()
            .fold((0.0, 0), |(best, bi), (i, &h)| {
                if h > best { (h, i) } else { (best, bi) }
            })
    }

    pub fn max_height(&self) -> f64 {
        self.peak().0
    }

    /// True when the cell or either in-range neighbour holds material.
    pub fn has_material_near(&self, i: usize) -> bool {
        [-1isize, 0, 1]
            .into_iter()
            .filter_map(|d| self.offset(i, d))
            .any(|j| self.data[j] > 0.0)
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|h| *h = 0.0);
    }
}
