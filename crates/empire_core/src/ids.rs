//! Identifier newtypes.
//!
//! Cross references between state objects are always by id (arena lookup),
//! never by pointer: a galaxy cell names its planet, a fleet names its owner.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a player.
    PlayerId
);
id_type!(
    /// Unique identifier for a planet.
    PlanetId
);
id_type!(
    /// Unique identifier for a fleet.
    FleetId
);
id_type!(
    /// Unique identifier for a trade offer. Allocated in submission order.
    TradeId
);
