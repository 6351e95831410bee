//! Status codes and item identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status element value of a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status(pub u8);

impl Status {
    pub const SUCCESS: Status = Status(1);
    /// Provision: protocol error (malformed request)
    pub const PROTOCOL_ERROR: Status = Status(2);
    /// Sync: invalid synchronization key. Policy: unknown PolicyType
    pub const INVALID_SYNC_KEY: Status = Status(3);
    pub const UNKNOWN_POLICY_TYPE: Status = Status(3);
    /// Policy: the client sent a policy key that does not match
    pub const WRONG_POLICY_KEY: Status = Status(5);
    /// Sync Add: error in client/server conversion (e.g. oversized picture)
    pub const CONVERSION_ERROR: Status = Status(6);
    pub const OBJECT_NOT_FOUND: Status = Status(8);
    /// The folder hierarchy changed; a FolderSync is required
    pub const HIERARCHY_CHANGED: Status = Status(12);
    pub const DEVICE_NOT_PROVISIONED: Status = Status(142);
    pub const INVALID_POLICY_KEY: Status = Status(144);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned item identifier, e.g. "9:12"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(pub String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
