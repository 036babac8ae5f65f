//! Index-writer locks for blobdir.
//!
//! # Architecture
//!
//! - [`LeaseLock`] holds an unbounded lease on `root prefix + lock name` in
//!   the remote store. Mutual exclusion across machines comes from the store
//!   granting at most one lease per object.
//! - [`FileLock`] is the plain-local equivalent: a marker file created with
//!   create-new semantics.
//! - [`LockRegistry`] maps lock names to one shared instance per directory,
//!   so all in-process callers see the same lease state.
//!
//! # Modules
//!
//! - [`error`] -- Error types for lock operations
//! - [`traits`] -- The [`Lock`] trait
//! - [`lease_lock`] -- Lease-backed [`LeaseLock`]
//! - [`file_lock`] -- Marker-file [`FileLock`]
//! - [`registry`] -- Per-directory [`LockRegistry`]

pub mod error;
pub mod file_lock;
pub mod lease_lock;
pub mod registry;
pub mod traits;

pub use error::{LockError, LockResult};
pub use file_lock::FileLock;
pub use lease_lock::{LeaseLock, PROBE_LEASE_DURATION};
pub use registry::LockRegistry;
pub use traits::{Lock, DEFAULT_POLL_INTERVAL};
