//! Identifier types used throughout the FieldOps core.
//!
//! A record created offline carries a device-generated [`TempId`] until the
//! remote store assigns it a [`RemoteId`] on first successful insert. The two
//! are kept structurally distinct by the [`RecordId`] tagged union, so "is
//! this id temporary" is a type check, never a string-prefix convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Locally generated placeholder id for a record created offline.
///
/// UUID v4, collision-free per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    /// Generates a fresh temporary id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a temp id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a temp id from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TempId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Permanent identifier assigned by the remote record store.
///
/// Opaque to this core; the remote system chooses its own format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wraps a remote-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The identity of a record: temporary until promoted exactly once to
/// permanent, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordId {
    /// Device-generated, not yet known to the remote store.
    Temp(TempId),
    /// Remote-assigned permanent identifier.
    Remote(RemoteId),
}

impl RecordId {
    /// Returns the temp id if this record has not been promoted yet.
    #[must_use]
    pub fn as_temp(&self) -> Option<TempId> {
        match self {
            Self::Temp(t) => Some(*t),
            Self::Remote(_) => None,
        }
    }

    /// Returns the permanent id if this record has been promoted.
    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteId> {
        match self {
            Self::Temp(_) => None,
            Self::Remote(r) => Some(r),
        }
    }

    /// Whether this record still carries a temporary id.
    #[must_use]
    pub fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp(t) => write!(f, "temp:{t}"),
            Self::Remote(r) => write!(f, "{r}"),
        }
    }
}

impl From<TempId> for RecordId {
    fn from(id: TempId) -> Self {
        Self::Temp(id)
    }
}

impl From<RemoteId> for RecordId {
    fn from(id: RemoteId) -> Self {
        Self::Remote(id)
    }
}

/// Tenant scoping value supplied by the session context.
///
/// Every remote query is scoped to exactly one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a new tenant id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
