//! String-backed identifier newtypes.
//!
//! Every entity the pipeline touches is addressed by an opaque string id
//! assigned by the host record store. Newtypes keep shipment, item, pallet,
//! package and content ids from being mixed up across the fan-out steps,
//! where all five travel together in the same payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from the given string value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the string value of this id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Identifier of one outbound shipment.
    ShipmentId
}

string_id! {
    /// Internal item (SKU) identifier.
    ItemId
}

string_id! {
    /// Identifier of a persisted pallet entity.
    PalletId
}

string_id! {
    /// Identifier of a physical package (carton) record.
    PackageId
}

string_id! {
    /// Identifier of a package-content line record.
    ContentId
}
