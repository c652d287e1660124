//! Ordering for floats.

/// A wrapper for `f64` that implements `Ord`.
///
/// Unlike the wrappers in the `ordered_float` crate, this one just panics
/// when comparing NaNs. Coordinates are checked for finiteness when they
/// enter the engine, so every value we sort by is a real number.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CheapOrderedFloat(f64);

impl From<f64> for CheapOrderedFloat {
    fn from(x: f64) -> Self {
        CheapOrderedFloat(x)
    }
}

impl Eq for CheapOrderedFloat {}

impl PartialOrd for CheapOrderedFloat {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CheapOrderedFloat {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 < other.0 {
            std::cmp::Ordering::Less
        } else if self.0 > other.0 {
            std::cmp::Ordering::Greater
        } else if self.0 == other.0 {
            std::cmp::Ordering::Equal
        } else {
            panic!("comparing a NaN: {:?} vs {:?}", self.0, other.0)
        }
    }
}
