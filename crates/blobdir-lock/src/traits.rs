//! The [`Lock`] trait shared by every directory variant.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LockResult;

/// Default interval between attempts in [`Lock::obtain_timeout`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// A named, exclusive lock used to serialize index writers.
///
/// Two states: free and held. `obtain` is the only transition into held and
/// reports failure as `false` rather than an error, so callers can poll.
pub trait Lock: Send + Sync + fmt::Debug {
    /// The lock name, unique within its directory.
    fn name(&self) -> &str;

    /// Try once to take the lock. Returns `true` on success.
    ///
    /// Returns `false` if this instance already holds the lock.
    fn obtain(&self) -> bool;

    /// Extend the hold. No-op when the lock is not held.
    fn renew(&self) -> LockResult<()>;

    /// Give up the hold. No-op when the lock is not held.
    fn release(&self) -> LockResult<()>;

    /// Forcibly free the lock regardless of holder. Failures are swallowed.
    fn break_lock(&self);

    /// Whether the lock is currently held by anyone.
    ///
    /// The answer is a point-in-time observation: a lock reported free may be
    /// taken by another caller before a subsequent `obtain`.
    fn is_locked(&self) -> bool;

    /// Repeatedly try to obtain the lock until `timeout` elapses.
    fn obtain_timeout(&self, timeout: Duration, poll_interval: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.obtain() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(poll_interval.min(deadline - now));
        }
    }
}
