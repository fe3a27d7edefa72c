//! Mixed-radix enumeration of method choices over the free levels.
//!
//! Choice vectors come out in lexicographic order with the last free level
//! varying fastest, so the `k`-th vector yielded is exactly `decode(k)`.

/// Number of assignments for the given per-level choice counts, or `None`
/// if it does not fit in a `usize`.
pub fn candidate_count(radices: &[usize]) -> Option<usize> {
    radices.iter().try_fold(1usize, |acc, &r| acc.checked_mul(r))
}

/// Choice vector at canonical position `index`.
pub fn decode(mut index: usize, radices: &[usize]) -> Vec<usize> {
    let mut choice = vec![0; radices.len()];
    for (slot, &radix) in choice.iter_mut().zip(radices).rev() {
        *slot = index % radix;
        index /= radix;
    }
    choice
}

/// Odometer over choice vectors, yielding `(index, choice)`.
#[derive(Debug, Clone)]
pub struct AssignmentOdometer {
    radices: Vec<usize>,
    current: Vec<usize>,
    index: usize,
    exhausted: bool,
}

impl AssignmentOdometer {
    /// Every radix must be non-zero; a zero radix yields nothing.
    pub fn new(radices: Vec<usize>) -> Self {
        let exhausted = radices.iter().any(|&r| r == 0);
        let current = vec![0; radices.len()];
        Self {
            radices,
            current,
            index: 0,
            exhausted,
        }
    }

    fn advance(&mut self) {
        for pos in (0..self.radices.len()).rev() {
            self.current[pos] += 1;
            if self.current[pos] < self.radices[pos] {
                return;
            }
            self.current[pos] = 0;
        }
        // Wrapped past the last digit
        self.exhausted = true;
    }
}

impl Iterator for AssignmentOdometer {
    type Item = (usize, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let item = (self.index, self.current.clone());
        self.index += 1;
        self.advance();
        Some(item)
    }
}
