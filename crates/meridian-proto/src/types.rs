//! Identifier types used across the node.
//!
//! All identifiers are 128-bit ULIDs (lexicographically sortable, monotonic
//! within a millisecond), carried as raw bytes so they stay `Copy` and cheap
//! to hash.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; 16]);

        impl $name {
            /// Creates a fresh identifier from the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(ulid::Ulid::new().to_bytes())
            }

            /// Creates an identifier from raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes of this identifier.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", ulid::Ulid::from_bytes(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), ulid::Ulid::from_bytes(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = ProtoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid: ulid::Ulid = s
                    .parse()
                    .map_err(|_| ProtoError::InvalidId(s.to_owned()))?;
                Ok(Self(ulid.to_bytes()))
            }
        }
    };
}

define_id! {
    /// Identifies a single task submission.
    TaskId
}

define_id! {
    /// Identifies an object in the object store.
    ObjectId
}

define_id! {
    /// Identifies an actor.
    ActorId
}

define_id! {
    /// Identifies the driver process a task originated from. Used as the
    /// scope for bulk cancellation.
    DriverId
}

define_id! {
    /// Identifies a worker process registered with a local scheduler.
    WorkerId
}

define_id! {
    /// Identifies a node (a local scheduler) in the cluster.
    NodeId
}
