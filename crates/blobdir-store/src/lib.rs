//! Storage capabilities for blobdir.
//!
//! A blobdir directory sits between two stores:
//!
//! - a remote [`BlobStore`]: flat keys, per-object metadata, and leases. The
//!   store is durable and authoritative for what files exist.
//! - a [`LocalStore`]: the on-disk cache mirroring object bytes by file name.
//!
//! # Backends
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based remote store for tests and
//!   embedding, with full lease semantics
//! - [`FsLocalStore`] -- cache directory on the local filesystem
//!
//! # Design Rules
//!
//! 1. The remote store never interprets object contents.
//! 2. A leased object cannot be replaced, deleted, or re-tagged without its lease.
//! 3. Local files that are open cannot be deleted.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod lease;
pub mod local;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use lease::{LeaseDuration, LeaseId, MAX_LEASE_DURATION, MIN_LEASE_DURATION};
pub use local::FsLocalStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobProperties, BlobStore, LocalRead, LocalStore, LocalWrite, Metadata};
