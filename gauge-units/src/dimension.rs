//! Dimensional analysis types
//!
//! A dimension is a vector of integer exponents, one per base unit of the
//! owning unit-system. Axes are allocated in registration order, so for the
//! built-in database the order is
//! [length, mass, time, current, temperature, amount, luminosity].
//! Trailing zero exponents are never stored, which lets vectors from systems
//! that grew at different times compare directly.

use serde::{Deserialize, Serialize};

/// Exponents of the base dimensions of a unit-system
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    exponents: Vec<i32>,
}

impl Dimension {
    /// Dimensionless quantity (all exponents zero)
    pub fn dimensionless() -> Self {
        Dimension { exponents: Vec::new() }
    }

    /// Unit exponent along a single base axis
    pub fn axis(index: usize) -> Self {
        let mut exponents = vec![0; index + 1];
        exponents[index] = 1;
        Dimension { exponents }
    }

    /// Create a dimension from exponents
    pub fn new(exponents: impl Into<Vec<i32>>) -> Self {
        Dimension { exponents: exponents.into() }.normalized()
    }

    fn normalized(mut self) -> Self {
        while self.exponents.last() == Some(&0) {
            self.exponents.pop();
        }
        self
    }

    /// Exponent of axis `index` (zero beyond the stored length)
    pub fn exponent(&self, index: usize) -> i32 {
        self.exponents.get(index).copied().unwrap_or(0)
    }

    pub fn exponents(&self) -> &[i32] {
        &self.exponents
    }

    /// Check if this is a dimensionless quantity
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Get the quantity name if it matches a common dimension of the
    /// built-in axis order
    pub fn name(&self) -> Option<&'static str> {
        let mut padded = [0i32; 7];
        if self.exponents.len() > padded.len() {
            return None;
        }
        padded[..self.exponents.len()].copy_from_slice(&self.exponents);
        match padded {
            [0, 0, 0, 0, 0, 0, 0] => Some("dimensionless"),
            [1, 0, 0, 0, 0, 0, 0] => Some("length"),
            [0, 1, 0, 0, 0, 0, 0] => Some("mass"),
            [0, 0, 1, 0, 0, 0, 0] => Some("time"),
            [0, 0, 0, 1, 0, 0, 0] => Some("current"),
            [0, 0, 0, 0, 1, 0, 0] => Some("temperature"),
            [0, 0, 0, 0, 0, 1, 0] => Some("amount"),
            [0, 0, 0, 0, 0, 0, 1] => Some("luminosity"),
            [1, 0, -1, 0, 0, 0, 0] => Some("velocity"),
            [1, 0, -2, 0, 0, 0, 0] => Some("acceleration"),
            [1, 1, -2, 0, 0, 0, 0] => Some("force"),
            [2, 1, -2, 0, 0, 0, 0] => Some("energy"),
            [2, 1, -3, 0, 0, 0, 0] => Some("power"),
            [-1, 1, -2, 0, 0, 0, 0] => Some("pressure"),
            [2, 0, 0, 0, 0, 0, 0] => Some("area"),
            [3, 0, 0, 0, 0, 0, 0] => Some("volume"),
            [0, 0, -1, 0, 0, 0, 0] => Some("frequency"),
            [0, 0, 1, 1, 0, 0, 0] => Some("charge"),
            [2, 1, -3, -1, 0, 0, 0] => Some("voltage"),
            [2, 1, -3, -2, 0, 0, 0] => Some("resistance"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LENGTH: usize = 0;
    const MASS: usize = 1;
    const TIME: usize = 2;

    #[test]
    fn test_dimensionless() {
        assert!(Dimension::dimensionless().is_dimensionless());
        assert!(!Dimension::axis(LENGTH).is_dimensionless());
        assert!(Dimension::new(vec![0, 0, 0]).is_dimensionless());
    }

    #[test]
    fn test_axis() {
        assert_eq!(Dimension::axis(TIME), Dimension::new(vec![0, 0, 1]));
        assert_eq!(Dimension::axis(TIME).exponent(TIME), 1);
        assert_eq!(Dimension::axis(TIME).exponent(9), 0);
    }

    #[test]
    fn test_names() {
        assert_eq!(Dimension::new(vec![1, 0, -1]).name(), Some("velocity"));
        assert_eq!(Dimension::new(vec![1, 1, -2]).name(), Some("force"));
        assert_eq!(Dimension::axis(MASS).name(), Some("mass"));
        assert_eq!(Dimension::new(vec![0, 0, 0, 0, 0, 0, 0, 1]).name(), None);
    }

    #[test]
    fn test_trailing_zeros_trimmed() {
        assert_eq!(Dimension::new(vec![1, 0, 0]).exponents(), &[1]);
        assert_eq!(Dimension::new(vec![0, 0]), Dimension::dimensionless());
    }
}
