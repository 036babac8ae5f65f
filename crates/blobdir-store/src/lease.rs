//! Lease identifiers and durations.
//!
//! A lease is an exclusive, time-bounded hold on a single remote object. The
//! store hands out a [`LeaseId`] on acquisition; every later renew or release
//! must present the same ID.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Shortest fixed lease a store accepts.
pub const MIN_LEASE_DURATION: Duration = Duration::from_secs(15);

/// Longest fixed lease a store accepts.
pub const MAX_LEASE_DURATION: Duration = Duration::from_secs(60);

/// Opaque token identifying an acquired lease.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeaseId(String);

impl LeaseId {
    /// Generate a fresh, unique lease ID.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7().to_string())
    }

    /// Wrap an ID issued by a remote store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requested lifetime of a lease.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseDuration {
    /// Held until released or broken.
    Infinite,
    /// Expires unless renewed within the given duration.
    Fixed(Duration),
}

impl LeaseDuration {
    /// Validate the duration against the accepted fixed-lease range.
    pub fn validate(self) -> StoreResult<Self> {
        match self {
            Self::Infinite => Ok(self),
            Self::Fixed(d) if (MIN_LEASE_DURATION..=MAX_LEASE_DURATION).contains(&d) => Ok(self),
            Self::Fixed(d) => Err(StoreError::InvalidLeaseDuration(d)),
        }
    }

    /// The fixed duration, if any.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::Fixed(d) => Some(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(LeaseId::generate(), LeaseId::generate());
    }

    #[test]
    fn fixed_duration_bounds() {
        assert!(LeaseDuration::Fixed(Duration::from_secs(15)).validate().is_ok());
        assert!(LeaseDuration::Fixed(Duration::from_secs(60)).validate().is_ok());
        assert!(matches!(
            LeaseDuration::Fixed(Duration::from_secs(5)).validate(),
            Err(StoreError::InvalidLeaseDuration(_))
        ));
        assert!(LeaseDuration::Fixed(Duration::from_secs(61)).validate().is_err());
        assert!(LeaseDuration::Infinite.validate().is_ok());
    }

    #[test]
    fn as_duration() {
        assert_eq!(LeaseDuration::Infinite.as_duration(), None);
        assert_eq!(
            LeaseDuration::Fixed(MIN_LEASE_DURATION).as_duration(),
            Some(MIN_LEASE_DURATION)
        );
    }
}
