//! Lifecycle status of a resource.

use std::fmt;

/// Where a resource is in its lifecycle.
///
/// `Unstarted → Pending → {Resolved | Rejected}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No one has called `load` yet.
    Unstarted,
    /// The load is in flight.
    Pending,
    /// The loader produced a value.
    Resolved,
    /// The loader produced an error.
    Rejected,
}

impl Status {
    /// Returns true for `Resolved` and `Rejected`.
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Resolved | Status::Rejected)
    }

    /// Lowercase name, as used in logs and serialized stats.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unstarted => "unstarted",
            Status::Pending => "pending",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_settled() {
        assert!(!Status::Unstarted.is_settled());
        assert!(!Status::Pending.is_settled());
        assert!(Status::Resolved.is_settled());
        assert!(Status::Rejected.is_settled());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::Pending.to_string(), "pending");
        assert_eq!(format!("{}", Status::Rejected), "rejected");
    }
}
