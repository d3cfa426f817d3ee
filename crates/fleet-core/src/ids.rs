//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can key `BTreeMap`s and sets
//! directly.  Ordering matters: the orchestrator dispatches events in
//! ascending `VehicleId` order.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The raw integer value.
            #[inline(always)]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Identifier of a vehicle, as assigned by the vehicle store.
    pub struct VehicleId(u32);
}

typed_id! {
    /// Identifier of a package, as assigned by the package store.
    pub struct PackageId(u32);
}

typed_id! {
    /// Index of a waypoint within one delivery session.
    pub struct WaypointId(u32);
}
