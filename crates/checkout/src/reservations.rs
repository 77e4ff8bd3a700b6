//! Tracking of reservations made during one placement attempt.

use domain::ProductId;

/// Lines reserved so far, in the order they were reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservations {
    lines: Vec<(ProductId, u32)>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful reservation.
    pub fn record(&mut self, product_id: ProductId, quantity: u32) {
        self.lines.push((product_id, quantity));
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns the lines in the order they must be released.
    pub fn to_release(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.lines.iter().rev().copied()
    }
}
