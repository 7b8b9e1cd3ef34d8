//! Implicit conversion costs.

use std::fmt;
use std::ops::{Add, AddAssign};

/// The cost of one implicit conversion. Costs are summed across all the
/// conversions a call performs and used to rank overload candidates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ConversionCost(pub u32);

impl ConversionCost {
    /// No conversion needed.
    pub const NONE: ConversionCost = ConversionCost(0);
    /// Wrapping a conforming type up to one of its interfaces.
    pub const CAST_TO_INTERFACE: ConversionCost = ConversionCost(50);
    /// Scalar promotion to a higher-ranked scalar type.
    pub const RANK_PROMOTION: ConversionCost = ConversionCost(150);
    /// Conversion that can lose information.
    pub const GENERAL: ConversionCost = ConversionCost(900);
    /// A conversion only available through an explicit cast. Disqualifying
    /// for implicit paths.
    pub const EXPLICIT: ConversionCost = ConversionCost(90_000);
}

impl Add for ConversionCost {
    type Output = ConversionCost;

    fn add(self, rhs: ConversionCost) -> ConversionCost {
        ConversionCost(self.0 + rhs.0)
    }
}

impl AddAssign for ConversionCost {
    fn add_assign(&mut self, rhs: ConversionCost) {
        self.0 += rhs.0;
    }
}

impl fmt::Debug for ConversionCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cost({})", self.0)
    }
}

impl fmt::Display for ConversionCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
