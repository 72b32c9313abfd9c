//! Strongly typed, zero-cost identifier wrappers.
//!
//! Two families live here:
//!
//! - **External ids** (`CrossId`, `RoadId`, `CarId`) carry the numbers used in
//!   the input files.  They are sparse and only meaningful as lookup keys.
//! - **Dense indices** (`NodeId`, `EdgeId`, `CarIdx`) are positions in the
//!   sorted entity arrays built at load time and are used for direct `Vec`
//!   indexing on hot paths.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID", equal to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Crossroad id as written in the input files.
    pub struct CrossId(u32);
}

typed_id! {
    /// Road id as written in the input files.
    pub struct RoadId(u32);
}

typed_id! {
    /// Car id as written in the input files.
    pub struct CarId(u32);
}

typed_id! {
    /// Dense index of a crossroad (graph vertex) in ascending-`CrossId` order.
    pub struct NodeId(u32);
}

typed_id! {
    /// Dense index of one directed traversal of a road.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Dense index of a car in ascending-`CarId` order.
    pub struct CarIdx(u32);
}
