//! Mixed-radix index arithmetic for factor tables.
//!
//! A factor over variables `[X0, X1, ..., Xk-1]` with cardinalities `[c0, c1, ..., ck-1]`
//! stores its values in a flat table. The assignment `(s0, s1, ..., sk-1)` is stored at
//!
//! ```text
//! index = s0 * stride0 + s1 * stride1 + ... + sk-1 * stride(k-1)
//! stride(k-1) = 1
//! stride(i)   = stride(i+1) * c(i+1)
//! ```
//!
//! That is, the table is **row-major**: the last variable varies fastest.
//! An empty scope describes a scalar with exactly one entry at index 0.
//!
//! # Example
//!
//! ```
//! use bayes_rs::index::{decode, encode, strides};
//!
//! let cards = [2, 3, 2];
//! assert_eq!(strides(&cards), vec![6, 2, 1]);
//! assert_eq!(encode(&cards, &[1, 2, 0]), 10);
//! assert_eq!(decode(&cards, 10), vec![1, 2, 0]);
//! ```

/// Number of entries in a table with the given cardinalities.
///
/// # Panics
///
/// Panics if the size does not fit into `usize`; see [`checked_table_size`].
pub fn table_size(cards: &[usize]) -> usize {
    checked_table_size(cards).unwrap_or_else(|| panic!("Table size of {:?} overflows usize", cards))
}

/// Number of entries in a table with the given cardinalities, or `None` on overflow.
pub fn checked_table_size(cards: &[usize]) -> Option<usize> {
    cards.iter().try_fold(1usize, |size, &card| size.checked_mul(card))
}

/// Row-major strides for the given cardinalities.
pub fn strides(cards: &[usize]) -> Vec<usize> {
    let mut result = vec![0; cards.len()];
    let mut stride = 1;
    for i in (0..cards.len()).rev() {
        result[i] = stride;
        stride *= cards[i];
    }
    result
}

/// Flat index of an assignment.
///
/// # Panics
///
/// Panics if the lengths differ or a state is out of range.
pub fn encode(cards: &[usize], states: &[usize]) -> usize {
    assert_eq!(cards.len(), states.len(), "Assignment length must match scope length");
    let mut index = 0;
    for (&card, &state) in cards.iter().zip(states) {
        assert!(state < card, "State {} out of range 0..{}", state, card);
        index = index * card + state;
    }
    index
}

/// Assignment stored at a flat index.
///
/// # Panics
///
/// Panics if `index` is out of range.
pub fn decode(cards: &[usize], index: usize) -> Vec<usize> {
    assert!(index < table_size(cards), "Index {} out of range", index);
    let mut states = vec![0; cards.len()];
    let mut rest = index;
    for i in (0..cards.len()).rev() {
        states[i] = rest % cards[i];
        rest /= cards[i];
    }
    states
}

/// Dot product of an assignment with a stride vector.
#[inline]
pub(crate) fn offset(states: &[usize], strides: &[usize]) -> usize {
    states.iter().zip(strides).map(|(s, k)| s * k).sum()
}

/// In-place enumeration of all assignments in table order.
///
/// Unlike [`Assignments`], the odometer reuses its digit buffer, so the hot loops of the
/// factor algebra do not allocate per entry.
///
/// ```
/// use bayes_rs::index::Odometer;
///
/// let mut odometer = Odometer::new(vec![2, 2]);
/// let mut seen = Vec::new();
/// while let Some(states) = odometer.next() {
///     seen.push(states.to_vec());
/// }
/// assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
/// ```
#[derive(Debug, Clone)]
pub struct Odometer {
    cards: Vec<usize>,
    digits: Vec<usize>,
    started: bool,
    done: bool,
}

impl Odometer {
    pub fn new(cards: Vec<usize>) -> Self {
        let done = cards.iter().any(|&c| c == 0);
        let digits = vec![0; cards.len()];
        Self {
            cards,
            digits,
            started: false,
            done,
        }
    }

    /// Advances to the next assignment and returns it, or `None` when exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&[usize]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(&self.digits);
        }
        for i in (0..self.cards.len()).rev() {
            self.digits[i] += 1;
            if self.digits[i] < self.cards[i] {
                return Some(&self.digits);
            }
            self.digits[i] = 0;
        }
        // Every digit wrapped around.
        self.done = true;
        None
    }
}

/// Iterator over all assignments in table order, yielding owned state vectors.
#[derive(Debug, Clone)]
pub struct Assignments {
    odometer: Odometer,
}

impl Assignments {
    pub fn new(cards: Vec<usize>) -> Self {
        Self {
            odometer: Odometer::new(cards),
        }
    }
}

impl Iterator for Assignments {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.odometer.next().map(<[usize]>::to_vec)
    }
}
