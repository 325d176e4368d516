//! Strong identifier types for Pactum.
//!
//! All identifiers are UUID newtypes so a party id can never be passed where a
//! contract id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
pub use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// The nil identifier (sentinel).
            pub const NIL: Self = Self(Uuid::nil());
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Identifier of a contract.
    ContractId
);
define_id!(
    /// Identifier of a party named on a contract.
    PartyId
);
define_id!(
    /// Identifier of an entry in a contract's signature audit trail.
    SignatureEventId
);
define_id!(
    /// Identifier of a law firm.
    FirmId
);
define_id!(
    /// Identifier of a registered user (individual, lawyer, or firm owner).
    UserId
);
define_id!(
    /// Identifier of a firm-scoped role.
    RoleId
);
define_id!(
    /// Identifier of a firm membership record.
    MembershipId
);

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Get current time in milliseconds.
pub fn now_millis() -> Timestamp {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
